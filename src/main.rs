// Search daemon: mirrors the source store into a text index and answers queries.
//
// Queries arrive one per line on stdin; each answer is a JSON array of
// references on stdout, or an object carrying the error. SIGINT or SIGTERM
// stops the coordinator and removes the index; a second signal exits at once.

use anyhow::{Context, Result};
use std::io::BufRead;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, watch};
use tracing_subscriber::EnvFilter;

use kodegen_tools_searchd::{
    IndexEngine, OrderCounter, PostgresStore, QueryCoordinator, QueryHandle, SchemaDescriptor,
    SearchConfig,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let mut signals = ShutdownSignals::new().context("Failed to install signal handlers")?;

    let config = SearchConfig::from_env().context("Failed to load configuration")?;
    let schema = SchemaDescriptor::load(config.schema_file(), &mut OrderCounter::new())
        .context("Failed to load schema descriptor")?;

    let store = PostgresStore::new(config.database());
    let mut engine = IndexEngine::new(&config, &schema, store);
    engine
        .initial_build()
        .await
        .context("Initial index build failed")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (coordinator, handle) = QueryCoordinator::new(engine, &config, shutdown_rx);
    let task = coordinator.spawn();

    // Keeps refreshing after stdin closes; only a signal stops the daemon.
    let serving = tokio::spawn(async move {
        if let Err(e) = serve_stdin(handle).await {
            tracing::error!(error = %e, "Query input failed");
        }
    });

    let signal = signals.recv().await;
    tracing::info!(signal, "Shutting down");
    serving.abort();

    tokio::spawn(async move {
        let signal = signals.recv().await;
        tracing::warn!(signal, "Second signal, exiting without cleanup");
        std::process::exit(1);
    });

    let _ = shutdown_tx.send(true);
    let mut engine = task.await.context("Query coordinator task panicked")?;
    engine.close().await.context("Failed to close index")?;
    Ok(())
}

/// Answer newline-delimited queries until stdin closes
async fn serve_stdin(handle: QueryHandle) -> Result<()> {
    // Blocking stdin reads stay off the runtime.
    let (line_tx, mut lines) = mpsc::channel::<String>(16);
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if line_tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.recv().await {
        let text = line.trim();
        if text.is_empty() {
            continue;
        }

        let output = match handle.submit(text).await {
            Ok(references) => serde_json::to_string(&references)?,
            Err(e) => serde_json::json!({ "error": e.to_string() }).to_string(),
        };
        stdout.write_all(output.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    tracing::info!(stats = ?handle.stats(), "Input closed");
    Ok(())
}

/// Interrupt and terminate listeners, registered as soon as this is built
struct ShutdownSignals {
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl ShutdownSignals {
    fn new() -> std::io::Result<Self> {
        Ok(Self {
            #[cfg(unix)]
            terminate: tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?,
        })
    }

    /// Wait for the next SIGINT or SIGTERM and name it
    async fn recv(&mut self) -> &'static str {
        #[cfg(unix)]
        {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    if let Err(e) = result {
                        tracing::error!(error = %e, "Interrupt listener failed");
                    }
                    "interrupt"
                }
                _ = self.terminate.recv() => "terminate",
            }
        }
        #[cfg(not(unix))]
        {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Interrupt listener failed");
            }
            "interrupt"
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_terminate_signal_is_observed() {
        let mut signals = ShutdownSignals::new().unwrap();

        let status = std::process::Command::new("kill")
            .args(["-TERM", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());

        let signal = tokio::time::timeout(Duration::from_secs(5), signals.recv())
            .await
            .expect("SIGTERM not delivered");
        assert_eq!(signal, "terminate");
    }
}
