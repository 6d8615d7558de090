use std::collections::HashSet;
use std::env;

use anyhow::Result;

use crate::labels::LabelSet;

/// Port the admission endpoint (`POST /emit`) listens on.
pub const ADMISSION_PORT: u16 = 3000;

/// Port the label authority serves its own protocol on.
pub const LABELER_PORT: u16 = 14831;

/// Address both listeners bind to.
pub const BIND_ADDR: &str = "0.0.0.0";

/// Where the label authority is reached when LABELER_URL is unset.
pub const DEFAULT_LABELER_URL: &str = "http://127.0.0.1:14831";

/// Command line used to launch the label authority alongside the relay.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelerCommand {
    pub program: String,
    pub args: Vec<String>,
}

/// Central configuration loaded from environment variables.
///
/// Built once at startup and shared read-only with every request. The
/// labeler identity and signing key are opaque here: they are handed to the
/// label authority unchanged and never inspected.
pub struct Config {
    /// Service identity (DID) of the label authority.
    pub labeler_did: String,
    /// Signing key material for the label authority.
    pub labeler_signing_key: String,
    /// Shared secret callers present as `Authorization: Bearer <key>`.
    pub emit_label_key: String,
    /// Base URL of the label authority's label creation API.
    pub labeler_url: String,
    /// Launch the label authority as a child process when set.
    pub labeler_command: Option<LabelerCommand>,
    /// Labels the relay accepts.
    pub labels: LabelSet,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// Fails if any of LABELER_DID, LABELER_SIGNING_KEY or EMIT_LABEL_KEY is
    /// missing or empty. The relay must not start without them.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup (the environment in
    /// production, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str, what: &str| -> Result<String> {
            match lookup(key) {
                Some(v) if !v.is_empty() => Ok(v),
                _ => anyhow::bail!(
                    "{key} not set ({what}). Add it to your .env file.\n\
                     See .env.example for the required variables."
                ),
            }
        };

        let labeler_did = required("LABELER_DID", "labeler service identity")?;
        let labeler_signing_key = required("LABELER_SIGNING_KEY", "labeler signing key")?;
        let emit_label_key = required("EMIT_LABEL_KEY", "emit label key")?;

        let labels = match lookup("LABELER_LABELS") {
            Some(raw) if !raw.trim().is_empty() => LabelSet::parse_list(&raw)?,
            _ => LabelSet::default(),
        };

        let labeler_command = lookup("LABELER_COMMAND")
            .filter(|c| !c.trim().is_empty())
            .map(|program| LabelerCommand {
                program: program.trim().to_string(),
                args: lookup("LABELER_ARGS")
                    .map(|a| a.split_whitespace().map(String::from).collect())
                    .unwrap_or_default(),
            });

        Ok(Self {
            labeler_did,
            labeler_signing_key,
            emit_label_key,
            labeler_url: lookup("LABELER_URL")
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| DEFAULT_LABELER_URL.to_string()),
            labeler_command,
            labels,
        })
    }
}

/// How the model server expects its API key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiKeyType {
    /// `Authorization: Bearer <key>`
    Bearer,
    /// `x-api-key: <key>`
    XApiKey,
}

/// Configuration for the reply classifier, loaded only by `classify`.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierConfig {
    /// Base URL of the chat completions server (LMSTUDIO_HOST).
    pub host: String,
    /// Path override for the chat completions endpoint.
    pub endpoint: Option<String>,
    /// Model name sent with each request.
    pub model: String,
    /// Optional API key and the header it travels in.
    pub api_key: Option<(ApiKeyType, String)>,
}

/// Model name used when LMSTUDIO_MODEL is unset.
pub const DEFAULT_MODEL: &str = "local-model";

impl ClassifierConfig {
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let Some(host) = non_empty("LMSTUDIO_HOST") else {
            anyhow::bail!(
                "LMSTUDIO_HOST not set (chat completions server). Add it to your .env file.\n\
                 See .env.example for the required variables."
            );
        };

        let api_key = match non_empty("LMSTUDIO_API_KEY") {
            Some(key) => {
                let key_type = match non_empty("LMSTUDIO_API_KEY_TYPE").as_deref() {
                    None | Some("bearer") => ApiKeyType::Bearer,
                    Some("x-api-key") => ApiKeyType::XApiKey,
                    Some(other) => anyhow::bail!(
                        "LMSTUDIO_API_KEY_TYPE must be \"bearer\" or \"x-api-key\", got {other:?}"
                    ),
                };
                Some((key_type, key))
            }
            None => None,
        };

        Ok(Self {
            host,
            endpoint: non_empty("LMSTUDIO_ENDPOINT"),
            model: non_empty("LMSTUDIO_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_key,
        })
    }
}

/// Accounts whose threads get classified (WATCHED_OPS, comma-separated DIDs).
///
/// Unset means every thread is watched.
pub fn watched_ops_from_env() -> Option<HashSet<String>> {
    parse_watched_ops(env::var("WATCHED_OPS").ok().as_deref())
}

pub fn parse_watched_ops(raw: Option<&str>) -> Option<HashSet<String>> {
    let set: HashSet<String> = raw?
        .split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(String::from)
        .collect();
    (!set.is_empty()).then_some(set)
}
