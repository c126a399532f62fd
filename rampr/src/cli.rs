use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use rampr_core::Stage;

/// Same syntax as durations in the YAML config: humantime (`250ms`, `1m30s`) or a bare `0`.
fn parse_duration(input: &str) -> Result<Duration, String> {
    let s = input.trim();
    if s == "0" {
        return Ok(Duration::ZERO);
    }
    humantime::parse_duration(s)
        .map_err(|err| format!("invalid duration '{s}' ({err}; expected e.g. 10s, 250ms, 1m30s)"))
}

/// `DURATION:TARGET`, e.g. `30s:20`.
fn parse_stage(input: &str) -> Result<Stage, String> {
    let (duration, target) = input
        .trim()
        .rsplit_once(':')
        .ok_or_else(|| format!("invalid stage '{input}' (expected DURATION:TARGET, e.g. 30s:20)"))?;

    let duration = parse_duration(duration)?;
    if duration.is_zero() {
        return Err(format!("stage '{input}' must have a positive duration"));
    }

    let target: u64 = target
        .trim()
        .parse()
        .map_err(|_| format!("invalid stage target in '{input}' (expected an integer)"))?;

    Ok(Stage::new(duration, target))
}

/// `NAME:VALUE`, e.g. `accept:application/json`.
fn parse_header(input: &str) -> Result<(String, String), String> {
    let (name, value) = input
        .split_once(':')
        .ok_or_else(|| format!("invalid header '{input}' (expected NAME:VALUE)"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("invalid header '{input}' (empty NAME)"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable progress bar and summary.
    HumanReadable,
    /// Emit JSON progress lines (NDJSON) to stdout.
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "rampr",
    author,
    version,
    about = "Ramping virtual-user load generator",
    long_about = "rampr drives a pool of virtual users against an HTTP target, following a staged ramp profile.\n\nEach virtual user repeatedly issues the configured request, checks the response, then waits for the pacing delay.\n\nThe run ends when the ramp completes (or on Ctrl-C) and prints a report.",
    after_help = "Examples:\n  rampr init\n  rampr run rampr.yaml\n  rampr run --url http://127.0.0.1:8080/v0/randos --stage 30s:20 --stage 1m:10 --stage 15s:0\n  rampr run rampr.yaml --output json"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a ramp against a target
    #[command(
        long_about = "Run a ramp described by a YAML config file and/or CLI flags.\n\nCLI flags override values from the config file; `--stage` replaces all file stages."
    )]
    Run(RunArgs),

    /// Write a starter rampr.yaml
    Init(InitArgs),
}

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Target directory to initialize (created if missing)
    #[arg(default_value = ".")]
    pub dir: PathBuf,

    /// Overwrite existing files
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Path to a YAML run config
    pub config: Option<PathBuf>,

    /// Target URL (overrides `request.url`)
    #[arg(long)]
    pub url: Option<String>,

    /// Ramp stage (repeatable, DURATION:TARGET); replaces the config file's stages
    #[arg(long = "stage", value_name = "DURATION:TARGET", value_parser = parse_stage)]
    pub stages: Vec<Stage>,

    /// Wait after each iteration (e.g. 1s, 250ms, 0)
    #[arg(long, value_parser = parse_duration)]
    pub pacing: Option<Duration>,

    /// Hard cap on one request + check
    #[arg(long, value_parser = parse_duration)]
    pub iteration_timeout: Option<Duration>,

    /// Accepted response status (repeatable); replaces the config file's check
    #[arg(long = "expect-status", value_name = "CODE")]
    pub expect_status: Vec<u16>,

    /// Upper bound on concurrently running virtual users
    #[arg(long)]
    pub max_vus: Option<u64>,

    /// Engine tick (scheduler resolution)
    #[arg(long, value_parser = parse_duration)]
    pub tick: Option<Duration>,

    /// Extra request header (repeatable, NAME:VALUE)
    #[arg(long = "header", value_name = "NAME:VALUE", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::HumanReadable)]
    pub output: OutputFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_accepts_common_units() {
        assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
        assert_eq!(parse_duration("10s"), Ok(Duration::from_secs(10)));
        assert_eq!(parse_duration("0"), Ok(Duration::ZERO));
        assert_eq!(parse_duration("1m"), Ok(Duration::from_secs(60)));
        assert_eq!(parse_duration("2h"), Ok(Duration::from_secs(2 * 60 * 60)));
        assert_eq!(parse_duration("1m30s"), Ok(Duration::from_secs(90)));
        assert_eq!(parse_duration("1m 30s"), Ok(Duration::from_secs(90)));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("10x").is_err());
    }

    #[test]
    fn parse_stage_splits_duration_and_target() {
        assert_eq!(
            parse_stage("30s:20"),
            Ok(Stage::new(Duration::from_secs(30), 20))
        );
        assert_eq!(
            parse_stage("1m:0"),
            Ok(Stage::new(Duration::from_secs(60), 0))
        );
        assert_eq!(
            parse_stage("1m30s:5"),
            Ok(Stage::new(Duration::from_secs(90), 5))
        );
        assert!(parse_stage("30s").is_err());
        assert!(parse_stage("0s:5").is_err());
        assert!(parse_stage("30s:-1").is_err());
    }

    #[test]
    fn parse_header_requires_name() {
        assert_eq!(
            parse_header("accept: application/json"),
            Ok(("accept".to_string(), "application/json".to_string()))
        );
        assert!(parse_header(":x").is_err());
        assert!(parse_header("novalue").is_err());
    }

    #[test]
    fn cli_parses_run_overrides() {
        let parsed = Cli::try_parse_from([
            "rampr",
            "run",
            "rampr.yaml",
            "--url",
            "http://127.0.0.1:8080/v0/randos",
            "--stage",
            "30s:20",
            "--stage",
            "1m:10",
            "--pacing",
            "250ms",
            "--iteration-timeout",
            "5s",
            "--expect-status",
            "200",
            "--expect-status",
            "204",
            "--max-vus",
            "50",
            "--tick",
            "100ms",
            "--header",
            "x-run:1",
            "--output",
            "json",
        ]);

        let cli = match parsed {
            Ok(v) => v,
            Err(err) => panic!("failed to parse args: {err}"),
        };

        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.config, Some(PathBuf::from("rampr.yaml")));
                assert_eq!(args.url.as_deref(), Some("http://127.0.0.1:8080/v0/randos"));
                assert_eq!(
                    args.stages,
                    vec![
                        Stage::new(Duration::from_secs(30), 20),
                        Stage::new(Duration::from_secs(60), 10)
                    ]
                );
                assert_eq!(args.pacing, Some(Duration::from_millis(250)));
                assert_eq!(args.iteration_timeout, Some(Duration::from_secs(5)));
                assert_eq!(args.expect_status, vec![200, 204]);
                assert_eq!(args.max_vus, Some(50));
                assert_eq!(args.tick, Some(Duration::from_millis(100)));
                assert_eq!(args.headers, vec![("x-run".to_string(), "1".to_string())]);
                assert!(matches!(args.output, OutputFormat::Json));
            }
            Command::Init(_) => panic!("expected run command"),
        }
    }

    #[test]
    fn cli_parses_init_defaults() {
        let parsed = Cli::try_parse_from(["rampr", "init"]);
        let cli = match parsed {
            Ok(v) => v,
            Err(err) => panic!("failed to parse args: {err}"),
        };

        match cli.command {
            Command::Init(args) => {
                assert_eq!(args.dir, PathBuf::from("."));
                assert!(!args.force);
            }
            Command::Run(_) => panic!("expected init command"),
        }
    }
}
