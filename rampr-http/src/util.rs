use super::{Error, Result};

pub(super) fn has_header(headers: &[(String, String)], name: &str) -> bool {
    headers.iter().any(|(k, _)| k.eq_ignore_ascii_case(name))
}

pub(super) fn host_header_value(parsed: &url::Url) -> Option<String> {
    let host = parsed.host_str()?;
    match parsed.port() {
        Some(port) => Some(format!("{host}:{port}")),
        None => Some(host.to_string()),
    }
}

/// Parse `raw` and reject anything the client could never send.
pub fn validate_url(raw: &str) -> Result<url::Url> {
    if raw.trim().is_empty() {
        return Err(Error::InvalidUrl(raw.to_string()));
    }

    let parsed = url::Url::parse(raw).map_err(|_| Error::InvalidUrl(raw.to_string()))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(Error::UnsupportedScheme(raw.to_string()));
    }
    if parsed.host_str().is_none() {
        return Err(Error::InvalidUrl(raw.to_string()));
    }

    Ok(parsed)
}

/// Reject header names or values that can never go on the wire.
pub fn validate_headers(headers: &[(String, String)]) -> Result<()> {
    for (name, value) in headers {
        http::header::HeaderName::from_bytes(name.as_bytes())?;
        http::header::HeaderValue::from_str(value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_url_accepts_http_and_https() {
        assert!(validate_url("http://127.0.0.1:8080/v0/randos").is_ok());
        assert!(validate_url("https://example.com").is_ok());
    }

    #[test]
    fn validate_url_rejects_garbage() {
        assert!(matches!(validate_url(""), Err(Error::InvalidUrl(_))));
        assert!(matches!(validate_url("not a url"), Err(Error::InvalidUrl(_))));
        assert!(matches!(
            validate_url("ftp://example.com/file"),
            Err(Error::UnsupportedScheme(_))
        ));
    }

    #[test]
    fn validate_headers_rejects_unsendable_names_and_values() {
        let ok = vec![("accept".to_string(), "application/json".to_string())];
        assert!(validate_headers(&ok).is_ok());

        let bad_name = vec![("bad name".to_string(), "v".to_string())];
        assert!(matches!(
            validate_headers(&bad_name),
            Err(Error::HeaderName(_))
        ));

        let bad_value = vec![("x-run".to_string(), "a\nb".to_string())];
        assert!(matches!(
            validate_headers(&bad_value),
            Err(Error::HeaderValue(_))
        ));
    }

    #[test]
    fn host_header_keeps_explicit_port() {
        let parsed = url::Url::parse("http://localhost:8080/").ok();
        assert_eq!(
            parsed.as_ref().and_then(host_header_value).as_deref(),
            Some("localhost:8080")
        );

        let parsed = url::Url::parse("http://localhost/").ok();
        assert_eq!(
            parsed.as_ref().and_then(host_header_value).as_deref(),
            Some("localhost")
        );
    }
}
