use std::time::Duration;

use rampr_http::{Error, HttpClient, HttpRequest, HttpTransportErrorKind};
use rampr_testserver::TestServer;

#[tokio::test]
async fn get_returns_status_body_and_headers() -> anyhow::Result<()> {
    let server = TestServer::start().await?;
    let client = HttpClient::default();

    let res = client.get(&server.urls().randos).await?;
    assert_eq!(res.status, 200);
    assert_eq!(res.body_utf8(), Some(r#"{"randos":[4,8,15,16,23,42]}"#));
    assert!(res.header("content-length").is_some());

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn non_success_status_is_not_a_transport_error() -> anyhow::Result<()> {
    let server = TestServer::start().await?;
    let client = HttpClient::default();

    let res = client.get(&server.urls().status(503)).await?;
    assert_eq!(res.status, 503);
    assert_eq!(server.stats().requests_total(), 1);

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn request_timeout_surfaces_as_timeout() -> anyhow::Result<()> {
    let server = TestServer::start().await?;
    let client = HttpClient::default();

    let mut req = HttpRequest::get(server.urls().hang.clone());
    req.timeout = Some(Duration::from_millis(100));

    match client.request(req).await {
        Err(err @ Error::Timeout(_)) => {
            assert!(err.is_timeout());
            assert_eq!(err.transport_error_kind(), HttpTransportErrorKind::Timeout);
        }
        other => anyhow::bail!("expected timeout, got {other:?}"),
    }

    server.shutdown().await;
    Ok(())
}
