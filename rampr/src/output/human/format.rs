pub(crate) fn format_rate(v: f64) -> String {
    if v.is_finite() {
        format!("{v:.1}")
    } else {
        "0".to_string()
    }
}

/// `part` as a percentage of `total`, one decimal.
pub(crate) fn format_pct(part: u64, total: u64) -> String {
    if total == 0 {
        return "0.0%".to_string();
    }
    format!("{:.1}%", (part as f64) * 100.0 / (total as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rates_and_percentages() {
        assert_eq!(format_rate(12.345), "12.3");
        assert_eq!(format_rate(f64::NAN), "0");
        assert_eq!(format_pct(1, 3), "33.3%");
        assert_eq!(format_pct(0, 0), "0.0%");
    }
}
