pub mod connection_status;
pub mod layout;
pub mod notice;
pub mod whitelist;

use tracing::{error, info, warn};

use crate::controller::{ErrorKind, WhitelistError};

/// Log a failed user action. Nothing here reaches the page; the controller
/// publishes the wrong-network notice itself.
pub fn report(action: &str, err: &WhitelistError) {
    match err.kind() {
        ErrorKind::WalletRejection => info!(action, error = %err, "wallet request declined"),
        ErrorKind::WrongNetwork | ErrorKind::Busy => warn!(action, error = %err, "action aborted"),
        ErrorKind::RpcOrContract => error!(action, error = %err, "action failed"),
    }
}
