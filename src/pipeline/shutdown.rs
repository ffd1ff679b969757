//! OS signal handling for the pipeline runtime.
//!
//! On Unix the runtime stops on `SIGINT`, `SIGTERM` (systemd/Kubernetes),
//! or `SIGQUIT`. Elsewhere only Ctrl-C is wired up.

/// Completes when a termination signal arrives.
///
/// Each call installs independent listeners; `Err` means registration
/// itself failed.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        _ = sigint.recv() => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

/// Completes when a termination signal arrives.
#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
