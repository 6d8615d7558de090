// Label authority launcher.
//
// When LABELER_COMMAND is configured, the relay starts the labeler itself and
// hands it the service identity and signing key through its environment.
// Both values are passed through untouched. The child is killed when the
// handle is dropped, so it never outlives the relay.

use std::future::Future;
use std::process::{ExitStatus, Stdio};

use anyhow::{Context, Result};
use tokio::process::{Child, Command};
use tracing::{error, info};

use crate::config::{Config, LabelerCommand, LABELER_PORT};

/// Environment variable names the labeler reads at startup.
pub const ENV_DID: &str = "LABELER_DID";
pub const ENV_SIGNING_KEY: &str = "LABELER_SIGNING_KEY";
pub const ENV_PORT: &str = "LABELER_PORT";

/// A running label authority child process.
pub struct LabelerProcess {
    child: Child,
}

impl LabelerProcess {
    /// Launch the configured labeler command.
    pub fn spawn(command: &LabelerCommand, did: &str, signing_key: &str) -> Result<Self> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .envs(labeler_env(did, signing_key))
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let child = cmd
            .spawn()
            .with_context(|| format!("Failed to launch labeler: {}", command.program))?;

        info!(
            program = %command.program,
            pid = ?child.id(),
            port = LABELER_PORT,
            "Label authority started"
        );

        Ok(Self { child })
    }

    /// Launch the labeler if the config asks for one.
    pub fn spawn_from_config(config: &Config) -> Result<Option<Self>> {
        config
            .labeler_command
            .as_ref()
            .map(|command| Self::spawn(command, &config.labeler_did, &config.labeler_signing_key))
            .transpose()
    }

    /// Wait for the labeler to exit.
    pub async fn wait(&mut self) -> Result<ExitStatus> {
        self.child
            .wait()
            .await
            .context("Failed to wait on labeler process")
    }

    /// Stop the labeler and reap it.
    pub async fn shutdown(mut self) -> Result<()> {
        // start_kill errors if the child already exited, which is fine here
        let _ = self.child.start_kill();
        self.child
            .wait()
            .await
            .context("Failed to reap labeler process")?;
        Ok(())
    }
}

/// Why the relay stopped serving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Operator asked for shutdown (Ctrl+C / SIGTERM).
    Signal,
    /// The relay-launched labeler went away; carries its exit status or the
    /// wait error.
    LabelerExited(String),
}

/// Wait for `signal`, or for a relay-launched labeler to exit, whichever
/// comes first. A labeler still running when the signal fires is stopped.
pub async fn supervise<F>(labeler: Option<LabelerProcess>, signal: F) -> StopReason
where
    F: Future<Output = ()>,
{
    let Some(mut labeler) = labeler else {
        signal.await;
        return StopReason::Signal;
    };

    let exited = tokio::select! {
        _ = signal => None,
        status = labeler.wait() => Some(match status {
            Ok(status) => status.to_string(),
            Err(e) => e.to_string(),
        }),
    };

    match exited {
        Some(detail) => {
            error!(detail = %detail, "Label authority exited, shutting down");
            StopReason::LabelerExited(detail)
        }
        None => {
            if let Err(e) = labeler.shutdown().await {
                error!(error = %e, "Failed to stop label authority");
            }
            StopReason::Signal
        }
    }
}

/// Environment handed to the labeler. Identity and key are opaque strings.
pub fn labeler_env(did: &str, signing_key: &str) -> Vec<(&'static str, String)> {
    vec![
        (ENV_DID, did.to_string()),
        (ENV_SIGNING_KEY, signing_key.to_string()),
        (ENV_PORT, LABELER_PORT.to_string()),
    ]
}
