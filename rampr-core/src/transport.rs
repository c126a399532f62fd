use std::future::Future;

use rampr_http::{HttpClient, HttpRequest, HttpResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum TransportErrorKind {
    Timeout,
    Connection,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Timeout,
            message: message.into(),
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Connection,
            message: message.into(),
        }
    }
}

impl From<rampr_http::Error> for TransportError {
    fn from(err: rampr_http::Error) -> Self {
        let message = format!("{}: {err}", err.transport_error_kind());
        if err.is_timeout() {
            Self::timeout(message)
        } else {
            Self::connection(message)
        }
    }
}

/// Issues the workload's request against the system under test.
///
/// Implementations must be cancel-safe: the runner drops the returned future when the
/// iteration timeout fires.
pub trait Transport: Send + Sync + 'static {
    fn send(
        &self,
        request: &HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}

impl Transport for HttpClient {
    fn send(
        &self,
        request: &HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send {
        let request = request.clone();
        async move { self.request(request).await.map_err(TransportError::from) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn http_errors_map_to_transport_kinds() {
        let err = TransportError::from(rampr_http::Error::Timeout(Duration::from_millis(5)));
        assert_eq!(err.kind, TransportErrorKind::Timeout);
        assert!(err.message.starts_with("timeout: "), "{}", err.message);

        let err = TransportError::from(rampr_http::Error::InvalidUrl("nope".to_string()));
        assert_eq!(err.kind, TransportErrorKind::Connection);
        assert!(err.message.starts_with("invalid_url: "), "{}", err.message);
        assert_eq!(err.to_string(), format!("connection: {}", err.message));
    }
}
