//! Subcommand implementations.

pub mod bundle;
pub mod deploy;
pub mod status;
pub mod upload;

use tokio_util::sync::CancellationToken;

/// Returns a token that trips on Ctrl-C, so a pipeline stops between
/// stages instead of dying mid-request.
pub(crate) fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });
    cancel
}
