use anyhow::Context as _;
use std::path::{Path, PathBuf};

use crate::cli::InitArgs;

const CONFIG_FILE: &str = "rampr.yaml";

const STARTER_CONFIG: &str = r#"# rampr run config
#
# Ramp up to 20 virtual users over 30s, down to 10 over the next minute, then to 0
# over 15s. Each virtual user GETs the url, checks for a 200, then waits 1s.
stages:
  - duration: 30s
    target: 20
  - duration: 1m
    target: 10
  - duration: 15s
    target: 0

request:
  method: GET
  url: http://host.docker.internal:8080/v0/randos
  # headers:
  #   accept: application/json

check:
  name: status was 200
  status: [200]

pacing: 1s
iterationTimeout: 60s
"#;

pub async fn init(args: InitArgs) -> anyhow::Result<PathBuf> {
    let root = &args.dir;
    tokio::fs::create_dir_all(root)
        .await
        .with_context(|| format!("failed to create dir: {}", root.display()))?;

    let path = root.join(CONFIG_FILE);
    write_file(&path, STARTER_CONFIG, args.force).await?;
    Ok(path)
}

async fn write_file(path: &Path, contents: &str, force: bool) -> anyhow::Result<()> {
    if !force
        && tokio::fs::try_exists(path)
            .await
            .with_context(|| format!("failed to check file existence: {}", path.display()))?
    {
        anyhow::bail!(
            "refusing to overwrite existing file (use --force): {}",
            path.display()
        );
    }

    tokio::fs::write(path, contents)
        .await
        .with_context(|| format!("failed to write file: {}", path.display()))?;

    Ok(())
}
