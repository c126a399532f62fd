use std::fmt;

use rampr_http::HttpResponse;

use super::outcome::ErrorKind;

/// A pure predicate over a response that classifies an iteration as passed or failed.
pub trait Check: Send + Sync {
    fn name(&self) -> &str;

    fn check(&self, response: &HttpResponse) -> bool;

    /// Error kind recorded when `check` returns false.
    fn failure_kind(&self) -> ErrorKind {
        ErrorKind::CheckFailure
    }
}

/// Passes when the response status is one of `expected`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusCheck {
    name: String,
    expected: Vec<u16>,
}

impl StatusCheck {
    pub fn new(expected: Vec<u16>) -> Self {
        let name = match expected.as_slice() {
            [one] => format!("status was {one}"),
            many => {
                let codes = many
                    .iter()
                    .map(u16::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("status in [{codes}]")
            }
        };
        Self { name, expected }
    }

    pub fn ok() -> Self {
        Self::new(vec![200])
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl Check for StatusCheck {
    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self, response: &HttpResponse) -> bool {
        self.expected.contains(&response.status)
    }

    fn failure_kind(&self) -> ErrorKind {
        ErrorKind::UnexpectedStatus
    }
}

/// Named closure check.
pub struct FnCheck<F> {
    name: String,
    f: F,
}

impl<F> FnCheck<F>
where
    F: Fn(&HttpResponse) -> bool + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> Check for FnCheck<F>
where
    F: Fn(&HttpResponse) -> bool + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self, response: &HttpResponse) -> bool {
        (self.f)(response)
    }
}

impl<F> fmt::Debug for FnCheck<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnCheck").field("name", &self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16) -> HttpResponse {
        HttpResponse {
            status,
            body: Default::default(),
            headers: Vec::new(),
        }
    }

    #[test]
    fn status_check_matches_expected_codes() {
        let check = StatusCheck::ok();
        assert_eq!(check.name(), "status was 200");
        assert!(check.check(&response(200)));
        assert!(!check.check(&response(404)));
        assert_eq!(check.failure_kind(), ErrorKind::UnexpectedStatus);

        let check = StatusCheck::new(vec![200, 204]);
        assert_eq!(check.name(), "status in [200, 204]");
        assert!(check.check(&response(204)));
    }

    #[test]
    fn fn_check_reports_check_failure() {
        let check = FnCheck::new("never", |_: &HttpResponse| false);
        assert_eq!(check.name(), "never");
        assert!(!check.check(&response(200)));
        assert_eq!(check.failure_kind(), ErrorKind::CheckFailure);
    }
}
