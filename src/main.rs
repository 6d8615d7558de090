use std::env;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::{error, info};

use labelrelay::authority::http::HttpLabelAuthority;
use labelrelay::authority::process::{supervise, LabelerProcess, StopReason};
use labelrelay::classifier::chat::ChatClassifier;
use labelrelay::classifier::pipeline::{Outcome, Reply, ReplyPipeline};
use labelrelay::classifier::traits::ReplyClassifier;
use labelrelay::config::{
    watched_ops_from_env, ClassifierConfig, Config, ADMISSION_PORT, BIND_ADDR,
};
use labelrelay::emitter::{EmitClient, DEFAULT_RELAY_URL};
use labelrelay::web::{self, AppState};

/// labelrelay: authenticated label emission for a Bluesky labeler.
///
/// Accepts `POST /emit` requests carrying a subject URI and a label, checks
/// them against a shared key and a fixed label list, and forwards them to
/// the label authority that signs and publishes them. `classify` runs the
/// language-model side that decides which labels a reply deserves.
#[derive(Parser)]
#[command(name = "labelrelay", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the admission endpoint (default)
    Serve,

    /// Send one label to a running relay
    Emit {
        /// Subject to label (e.g. at://did:plc:abc/app.bsky.feed.post/3k1)
        #[arg(long)]
        uri: String,

        /// Label value (e.g. bad-faith, off-topic, funny)
        #[arg(long)]
        label: String,

        /// Relay base URL (defaults to RELAY_URL, then http://127.0.0.1:3000)
        #[arg(long)]
        relay_url: Option<String>,
    },

    /// Classify a reply with the language model, and emit its labels when --uri is given
    Classify {
        /// Text of the post being replied to
        #[arg(long)]
        parent: String,

        /// Text of the reply
        #[arg(long)]
        reply: String,

        /// AT-URI of the reply; without it the verdict is only printed
        #[arg(long)]
        uri: Option<String>,

        /// AT-URI of the parent, checked against WATCHED_OPS
        #[arg(long)]
        parent_uri: Option<String>,

        /// Relay base URL (defaults to RELAY_URL, then http://127.0.0.1:3000)
        #[arg(long)]
        relay_url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("labelrelay=info,tower_http=info")
            }),
        )
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve().await?,

        Commands::Emit {
            uri,
            label,
            relay_url,
        } => {
            let client = EmitClient::new(&resolve_relay_url(relay_url), &require_emit_key()?)?;
            client.emit(&uri, &label).await?;
            println!("{} {label} -> {uri}", "Emitted".green().bold());
        }

        Commands::Classify {
            parent,
            reply,
            uri,
            parent_uri,
            relay_url,
        } => classify(&parent, &reply, uri, parent_uri, relay_url).await?,
    }

    Ok(())
}

async fn serve() -> Result<()> {
    let config = Config::load()?;
    info!(
        did = %config.labeler_did,
        labeler_url = %config.labeler_url,
        labels = ?config.labels.iter().collect::<Vec<_>>(),
        "Configuration loaded"
    );

    let labeler = LabelerProcess::spawn_from_config(&config)?;
    let authority = Arc::new(HttpLabelAuthority::new(&config.labeler_url)?);
    let state = AppState::from_config(&config, authority);

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel();
    let shutdown = async move {
        let _ = stop_tx.send(supervise(labeler, shutdown_signal()).await);
    };

    web::run_server(state, BIND_ADDR, ADMISSION_PORT, shutdown).await?;

    if let Ok(StopReason::LabelerExited(detail)) = stop_rx.await {
        anyhow::bail!("Label authority exited unexpectedly ({detail})");
    }

    info!("Shutdown complete");
    Ok(())
}

async fn classify(
    parent: &str,
    reply: &str,
    uri: Option<String>,
    parent_uri: Option<String>,
    relay_url: Option<String>,
) -> Result<()> {
    let config = ClassifierConfig::load()?;
    let classifier = Arc::new(ChatClassifier::new(&config)?);

    let Some(uri) = uri else {
        // Dry run: show the verdict without emitting anything.
        let classification = classifier.classify(parent, reply).await?;
        let labels = classification.labels();
        if labels.is_empty() {
            println!("{}", "No labels".dimmed());
        } else {
            println!("{} {}", "Labels:".bold(), labels.join(", "));
        }
        return Ok(());
    };

    let emitter = Arc::new(EmitClient::new(&resolve_relay_url(relay_url), &require_emit_key()?)?);
    let pipeline = ReplyPipeline::new(classifier, emitter, watched_ops_from_env());
    let outcome = pipeline
        .process(&Reply {
            uri: uri.clone(),
            parent_uri,
            parent_text: parent.to_string(),
            text: reply.to_string(),
        })
        .await?;

    match outcome {
        Outcome::NotWatched => println!("{}", "Parent author is not watched, skipped".dimmed()),
        Outcome::NoText => println!("{}", "Reply has no text, skipped".dimmed()),
        Outcome::Labeled(labels) if labels.is_empty() => {
            println!("{} {uri}", "No labels for".dimmed())
        }
        Outcome::Labeled(labels) => {
            println!("{} {} -> {uri}", "Emitted".green().bold(), labels.join(", "))
        }
    }
    Ok(())
}

fn require_emit_key() -> Result<String> {
    let key = env::var("EMIT_LABEL_KEY").unwrap_or_default();
    if key.is_empty() {
        anyhow::bail!(
            "EMIT_LABEL_KEY not set. Add it to your .env file.\n\
             See .env.example for the required variables."
        );
    }
    Ok(key)
}

fn resolve_relay_url(flag: Option<String>) -> String {
    flag.or_else(|| env::var("RELAY_URL").ok())
        .unwrap_or_else(|| DEFAULT_RELAY_URL.to_string())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
