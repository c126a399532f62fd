use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

/// On-disk run config (`rampr.yaml`). Every field is optional so CLI flags can fill
/// the gaps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct RunConfigYaml {
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub stages: Vec<StageYaml>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub request: Option<RequestYaml>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub check: Option<CheckYaml>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub pacing: Option<YamlDuration>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub iteration_timeout: Option<YamlDuration>,

    #[serde(rename = "maxVUs")]
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub max_vus: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tick: Option<YamlDuration>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct StageYaml {
    pub duration: YamlDuration,
    pub target: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct RequestYaml {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub method: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub url: Option<String>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub headers: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub body: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct CheckYaml {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,

    /// Accepted statuses; empty means 200.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub status: Vec<u16>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct YamlDuration(Duration);

impl YamlDuration {
    pub(crate) fn into_inner(self) -> Duration {
        self.0
    }
}

impl From<Duration> for YamlDuration {
    fn from(value: Duration) -> Self {
        Self(value)
    }
}

impl Serialize for YamlDuration {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(self.0).to_string())
    }
}

impl<'de> Deserialize<'de> for YamlDuration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct V;

        impl<'de> serde::de::Visitor<'de> for V {
            type Value = YamlDuration;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("duration as string (e.g. 10s), integer seconds, or float seconds")
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(YamlDuration(Duration::from_secs(v)))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                if v < 0 {
                    return Err(E::custom("duration must not be negative"));
                }
                Ok(YamlDuration(Duration::from_secs(v as u64)))
            }

            fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                if !v.is_finite() || v < 0.0 {
                    return Err(E::custom("duration must be a non-negative, finite number"));
                }
                Ok(YamlDuration(Duration::from_secs_f64(v)))
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                let v = v.trim();
                if v == "0" {
                    return Ok(YamlDuration(Duration::ZERO));
                }
                let d = humantime::parse_duration(v).map_err(E::custom)?;
                Ok(YamlDuration(d))
            }

            fn visit_string<E>(self, v: String) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                self.visit_str(&v)
            }
        }

        deserializer.deserialize_any(V)
    }
}

pub(crate) fn parse(raw: &str) -> anyhow::Result<RunConfigYaml> {
    // An empty document is a valid (all-defaults) config.
    if raw.trim().is_empty() {
        return Ok(RunConfigYaml::default());
    }
    serde_yaml::from_str(raw).context("invalid run config yaml")
}

pub(crate) async fn load(path: &Path) -> anyhow::Result<RunConfigYaml> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    parse(&raw).with_context(|| format!("failed to parse config: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_document() -> anyhow::Result<()> {
        let cfg = parse(
            r#"
stages:
  - duration: 30s
    target: 20
  - { duration: 1m, target: 10 }
  - { duration: 15, target: 0 }
request:
  method: POST
  url: http://127.0.0.1:8080/v0/randos
  headers:
    content-type: application/json
  body: '{"n":1}'
check:
  name: accepted
  status: [200, 201]
pacing: 500ms
iterationTimeout: 5s
maxVUs: 100
tick: 250ms
"#,
        )?;

        let stages: Vec<(Duration, u64)> = cfg
            .stages
            .iter()
            .map(|s| (s.duration.into_inner(), s.target))
            .collect();
        assert_eq!(
            stages,
            vec![
                (Duration::from_secs(30), 20),
                (Duration::from_secs(60), 10),
                (Duration::from_secs(15), 0),
            ]
        );

        let req = cfg.request.unwrap_or_default();
        assert_eq!(req.method.as_deref(), Some("POST"));
        assert_eq!(req.url.as_deref(), Some("http://127.0.0.1:8080/v0/randos"));
        assert_eq!(
            req.headers.get("content-type").map(String::as_str),
            Some("application/json")
        );
        assert_eq!(req.body.as_deref(), Some(r#"{"n":1}"#));

        let check = cfg.check.unwrap_or_default();
        assert_eq!(check.name.as_deref(), Some("accepted"));
        assert_eq!(check.status, vec![200, 201]);

        assert_eq!(cfg.pacing, Some(Duration::from_millis(500).into()));
        assert_eq!(cfg.iteration_timeout, Some(Duration::from_secs(5).into()));
        assert_eq!(cfg.max_vus, Some(100));
        assert_eq!(cfg.tick, Some(Duration::from_millis(250).into()));
        Ok(())
    }

    #[test]
    fn empty_document_is_all_defaults() -> anyhow::Result<()> {
        let cfg = parse("")?;
        assert!(cfg.stages.is_empty());
        assert!(cfg.request.is_none());
        Ok(())
    }

    #[test]
    fn zero_pacing_is_allowed() -> anyhow::Result<()> {
        let cfg = parse("pacing: 0\n")?;
        assert_eq!(cfg.pacing, Some(YamlDuration::default()));
        let cfg = parse("pacing: '0'\n")?;
        assert_eq!(cfg.pacing, Some(YamlDuration::default()));
        Ok(())
    }

    #[test]
    fn unknown_keys_and_bad_durations_are_rejected() {
        assert!(parse("stagez: []\n").is_err());
        assert!(parse("pacing: soon\n").is_err());
        assert!(parse("stages:\n  - { duration: -1, target: 2 }\n").is_err());
    }

    #[test]
    fn durations_serialize_in_humantime_form() -> anyhow::Result<()> {
        let cfg = RunConfigYaml {
            pacing: Some(Duration::from_secs(90).into()),
            ..RunConfigYaml::default()
        };
        let out = serde_yaml::to_string(&cfg)?;
        assert!(out.contains("pacing: 1m 30s"), "{out}");
        Ok(())
    }
}
