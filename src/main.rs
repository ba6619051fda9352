//! courtside binary entrypoint: replays an officiating script against a live
//! session and prints the feed as JSON lines.

use std::{env, fs, path::PathBuf, sync::Arc};

use anyhow::{Context, bail};
use courtside::{
    config::EngineConfig,
    error::ReportError,
    services::{
        feed_events::feed_stream,
        registry::SessionRegistry,
        replay::{ReplayScript, replay},
        result_reporter::{FinalResult, ResultSink},
    },
};
use futures::{StreamExt, future::BoxFuture};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable naming the script when no argument is given.
const SCRIPT_PATH_ENV: &str = "COURTSIDE_SCRIPT";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let path = script_path()?;
    let contents = fs::read_to_string(&path)
        .with_context(|| format!("reading script {}", path.display()))?;
    let script = ReplayScript::from_json(&contents)
        .with_context(|| format!("parsing script {}", path.display()))?;

    let config = EngineConfig::load();
    let registry = SessionRegistry::new(config).with_result_sink(Arc::new(LogSink));
    let session = registry
        .create_from_input(script.session)
        .context("creating session")?;
    info!(session_id = %session.id(), steps = script.steps.len(), "replaying script");

    let mut feed = feed_stream(&session).await;
    let printer = tokio::spawn(async move {
        while let Some(event) = feed.next().await {
            match event.to_line() {
                Ok(line) => println!("{line}"),
                Err(err) => warn!(event = event.event, error = %err, "failed to render feed line"),
            }
        }
    });

    let report = replay(&session, &script.steps).await;
    info!(
        applied = report.applied,
        no_ops = report.no_ops,
        rejected = report.rejected.len(),
        "replay complete"
    );

    registry
        .remove(session.id())
        .context("unregistering session")?;
    drop(session);
    printer.await.context("feed printer task")?;
    registry.shutdown().await;

    Ok(())
}

/// Script path from the first argument, or [`SCRIPT_PATH_ENV`].
fn script_path() -> anyhow::Result<PathBuf> {
    if let Some(arg) = env::args_os().nth(1) {
        return Ok(PathBuf::from(arg));
    }
    match env::var_os(SCRIPT_PATH_ENV) {
        Some(path) if !path.is_empty() => Ok(PathBuf::from(path)),
        _ => bail!("usage: courtside <script.json> (or set {SCRIPT_PATH_ENV})"),
    }
}

/// Result sink that records final results in the log.
struct LogSink;

impl ResultSink for LogSink {
    fn submit(&self, result: FinalResult) -> BoxFuture<'static, Result<(), ReportError>> {
        Box::pin(async move {
            let payload = serde_json::to_string(&result)
                .map_err(|err| ReportError::Rejected(err.to_string()))?;
            info!(session_id = %result.session_id, winner = ?result.winner(), %payload, "final result");
            Ok(())
        })
    }
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
