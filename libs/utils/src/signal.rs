//! References: https://stackoverflow.com/questions/77585473/rust-tokio-how-to-handle-more-signals-than-just-sigint-i-e-sigquit

use tracing::{error, info};

#[cfg(unix)]
async fn wait_for_signal_impl() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut signal_terminate = signal(SignalKind::terminate())?;
    let mut signal_interrupt = signal(SignalKind::interrupt())?;

    Ok(tokio::select! {
        _ = signal_terminate.recv() => "SIGTERM",
        _ = signal_interrupt.recv() => "SIGINT",
    })
}

#[cfg(windows)]
async fn wait_for_signal_impl() -> std::io::Result<&'static str> {
    use tokio::signal::windows;

    let mut signal_c = windows::ctrl_c()?;
    let mut signal_close = windows::ctrl_close()?;

    Ok(tokio::select! {
        _ = signal_c.recv() => "CTRL_C",
        _ = signal_close.recv() => "CTRL_CLOSE",
    })
}

/// Resolves once the process is asked to stop (SIGTERM / SIGINT / Ctrl-C).
///
/// If the handlers cannot be installed the future never resolves, so the
/// server keeps running instead of stopping at once.
pub async fn shutdown_signal() {
    match wait_for_signal_impl().await {
        Ok(name) => info!("Received {}, shutting down", name),
        Err(e) => {
            error!("Failed to install signal handler: {}", e);
            std::future::pending::<()>().await
        }
    }
}
