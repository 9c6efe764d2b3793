//! The bot itself: authenticate, subscribe, reply until told to stop.

use std::future::Future;
use std::sync::Arc;

use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::dispatch::run_dispatch;
use crate::error::{Error, Result};
use crate::twitter::{authenticate, StreamFilterParams};
use crate::workflow::ReplyWorkflow;

/// Run until Ctrl+C or SIGTERM.
pub async fn run(config: Config) -> Result<()> {
    run_until(config, shutdown_signal()).await
}

/// Run until `shutdown` resolves or a fatal error occurs.
///
/// Startup failures (credentials, stream) return before any event is
/// handled. On shutdown the current event is finished, the stream reader
/// is stopped and `Ok` is returned.
pub async fn run_until<F>(config: Config, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    info!("Starting caze bot...");

    let client = authenticate(&config.credentials, config.endpoints.clone())
        .await
        .map_err(log_fatal)?;
    let client = Arc::new(client);

    let params = StreamFilterParams {
        track: config.track.clone(),
        stall_warnings: config.stall_warnings,
    };
    let mut stream = client.filter_stream(&params).await.map_err(log_fatal)?;
    let messages = stream
        .take_messages()
        .ok_or_else(|| Error::StreamOpen("stream messages already taken".to_string()))?;

    let cancel = CancellationToken::new();
    let workflow = ReplyWorkflow::from_config(client.clone(), &config);
    let mut worker = tokio::spawn(run_dispatch(
        messages,
        workflow,
        config.on_event_error,
        cancel.clone(),
    ));

    let joined = tokio::select! {
        biased;
        joined = &mut worker => joined,
        _ = shutdown => {
            info!("Shutdown requested, finishing current event");
            cancel.cancel();
            (&mut worker).await
        }
    };

    stream.stop().await;
    info!("Stopping caze bot...");

    match joined? {
        Ok(summary) => {
            info!(
                received = summary.received,
                replied = summary.replied,
                failed = summary.failed,
                "Caze bot stopped"
            );
            Ok(())
        }
        Err(err) => Err(log_fatal(err)),
    }
}

fn log_fatal(err: Error) -> Error {
    error!("{}: {}", err.context(), err);
    err
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("Failed to listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
