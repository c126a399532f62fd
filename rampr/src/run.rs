use anyhow::Context as _;
use std::sync::Arc;

use rampr_core::{
    EngineConfig, HttpClient, HttpRequest, Method, RampProfile, Stage, StatusCheck,
    WorkloadConfig,
};
use tracing::warn;

use crate::cli::RunArgs;
use crate::config_yaml::{self, RunConfigYaml};
use crate::exit_codes::ExitCode;
use crate::output;
use crate::run_error::RunError;

pub async fn run(args: RunArgs) -> Result<ExitCode, RunError> {
    let file = match &args.config {
        Some(path) => config_yaml::load(path)
            .await
            .map_err(RunError::InvalidInput)?,
        None => RunConfigYaml::default(),
    };

    let cfg = engine_config(file, &args).map_err(RunError::InvalidInput)?;

    let engine =
        rampr_core::Engine::new(cfg, Arc::new(HttpClient::default())).map_err(engine_error)?;

    let out = output::formatter(args.output);
    out.print_header(engine.config());

    let engine = match out.progress() {
        Some(progress) => engine.with_progress(progress),
        None => engine,
    };

    let cancel = engine.cancel_handle();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling run");
            cancel.cancel();
        }
    });

    let handle = engine.start();

    let report = handle.wait().await;
    interrupt.abort();
    let report = report.map_err(engine_error)?;

    out.print_summary(&report).map_err(RunError::RuntimeError)?;

    if let Some(reason) = &report.error {
        return Err(RunError::RuntimeError(anyhow::anyhow!(
            "run aborted: {reason}"
        )));
    }

    Ok(ExitCode::from_report(&report))
}

fn engine_error(err: rampr_core::Error) -> RunError {
    if err.is_config_error() {
        RunError::InvalidInput(anyhow::Error::new(err).context("invalid run config"))
    } else {
        RunError::RuntimeError(anyhow::Error::new(err))
    }
}

/// Merge the config file with CLI overrides. Flags win; `--stage` and
/// `--expect-status` replace their file counterparts entirely.
pub(crate) fn engine_config(file: RunConfigYaml, args: &RunArgs) -> anyhow::Result<EngineConfig> {
    let profile: RampProfile = if args.stages.is_empty() {
        file.stages
            .iter()
            .map(|s| Stage::new(s.duration.into_inner(), s.target))
            .collect()
    } else {
        args.stages.iter().copied().collect()
    };

    let request_yaml = file.request.unwrap_or_default();

    let url = args
        .url
        .clone()
        .or(request_yaml.url)
        .context("no target url (set `request.url` in the config or pass --url)")?;

    let method = match request_yaml.method.as_deref() {
        Some(m) => m
            .trim()
            .to_ascii_uppercase()
            .parse::<Method>()
            .with_context(|| format!("invalid request method: {m}"))?,
        None => Method::GET,
    };

    let mut request = HttpRequest::new(method, url);
    for (name, value) in request_yaml.headers {
        request = request.with_header(name, value);
    }
    for (name, value) in &args.headers {
        request.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        request = request.with_header(name.clone(), value.clone());
    }
    if let Some(body) = request_yaml.body {
        request.body = body.into();
    }

    let check_yaml = file.check.unwrap_or_default();
    let expected = if !args.expect_status.is_empty() {
        args.expect_status.clone()
    } else if !check_yaml.status.is_empty() {
        check_yaml.status
    } else {
        vec![200]
    };
    let mut check = StatusCheck::new(expected);
    if args.expect_status.is_empty()
        && let Some(name) = check_yaml.name
    {
        check = check.with_name(name);
    }

    let mut workload = WorkloadConfig::new(request).with_check(check);
    if let Some(pacing) = args.pacing.or(file.pacing.map(|d| d.into_inner())) {
        workload = workload.with_pacing(pacing);
    }
    if let Some(timeout) = args
        .iteration_timeout
        .or(file.iteration_timeout.map(|d| d.into_inner()))
    {
        workload = workload.with_iteration_timeout(timeout);
    }

    let mut cfg = EngineConfig::new(profile, workload);
    if let Some(tick) = args.tick.or(file.tick.map(|d| d.into_inner())) {
        cfg = cfg.with_tick(tick);
    }
    if let Some(max_vus) = args.max_vus.or(file.max_vus) {
        cfg = cfg.with_max_vus(max_vus);
    }

    cfg.validate().context("invalid run config")?;
    Ok(cfg)
}
