use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use rampr_core::{
    Engine, EngineConfig, ErrorKind, HttpClient, HttpRequest, RampProfile, Stage, TerminalState,
    WorkloadConfig,
};
use rampr_testserver::TestServer;

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

fn short_ramp() -> RampProfile {
    RampProfile::new(vec![Stage::new(ms(300), 4), Stage::new(ms(300), 0)])
}

fn config(url: String) -> EngineConfig {
    let workload = WorkloadConfig::new(HttpRequest::get(url))
        .with_pacing(ms(20))
        .with_iteration_timeout(Duration::from_secs(2));
    EngineConfig::new(short_ramp(), workload).with_tick(ms(50))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn ramp_against_real_server_counts_every_request() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;

    let report = Engine::new(
        config(server.urls().hello.clone()),
        Arc::new(HttpClient::default()),
    )?
    .run()
    .await;

    let requests = server.stats().requests_total();
    server.shutdown().await;

    let s = &report.stats;
    anyhow::ensure!(report.terminal_state == TerminalState::Finished, "{report:?}");
    anyhow::ensure!(s.count > 0);
    anyhow::ensure!(s.success_count == s.count, "{s:?}");
    anyhow::ensure!(
        s.count == requests,
        "iterations {} != server requests {requests}",
        s.count
    );
    anyhow::ensure!(s.check.name == "status was 200");
    anyhow::ensure!(s.latency.p50.is_some());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn server_errors_are_unexpected_status() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;

    let report = Engine::new(
        config(server.urls().status(500)),
        Arc::new(HttpClient::default()),
    )?
    .run()
    .await;

    server.shutdown().await;

    let s = &report.stats;
    anyhow::ensure!(report.terminal_state == TerminalState::Finished);
    anyhow::ensure!(s.count > 0);
    anyhow::ensure!(s.success_count == 0);
    anyhow::ensure!(s.errors_of(ErrorKind::UnexpectedStatus) == s.count);
    anyhow::ensure!(s.status_counts.get(&500) == Some(&s.count));
    Ok(())
}

#[tokio::test]
async fn unreachable_target_records_connection_errors() -> anyhow::Result<()> {
    // Bind and drop a listener to get a port nothing listens on.
    let addr = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        listener.local_addr()?
    };

    let report = Engine::new(
        config(format!("http://{addr}/")),
        Arc::new(HttpClient::default()),
    )?
    .run()
    .await;

    let s = &report.stats;
    anyhow::ensure!(report.terminal_state == TerminalState::Finished);
    anyhow::ensure!(s.count > 0);
    anyhow::ensure!(s.errors_of(ErrorKind::ConnectionError) == s.count, "{s:?}");
    anyhow::ensure!(s.status_counts.is_empty());
    anyhow::ensure!(s.check.passes + s.check.fails == 0);
    Ok(())
}
