//! # OS termination signals.
//!
//! [`wait_for_shutdown_signal`] completes when the process is asked to stop and
//! reports which signal did it, so the node can log why it is leaving.
//!
//! | Platform | Signals                                  |
//! |----------|------------------------------------------|
//! | Unix     | `SIGINT`, `SIGTERM`, `SIGQUIT`, Ctrl-C   |
//! | other    | Ctrl-C                                   |

/// Waits for a termination signal and returns its name.
///
/// Each call installs its own listeners; fails if they cannot be registered.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    let name = tokio::select! {
        _ = sigint.recv() => "SIGINT",
        _ = sigterm.recv() => "SIGTERM",
        _ = sigquit.recv() => "SIGQUIT",
        res = tokio::signal::ctrl_c() => {
            res?;
            "ctrl_c"
        }
    };
    Ok(name)
}

/// Waits for a termination signal and returns its name.
#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl_c")
}
