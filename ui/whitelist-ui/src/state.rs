//! Shared state for the whitelist UI, and the pure mapping from that state to
//! what the page shows.

use std::sync::Arc;

use crate::controller::WhitelistController;
use crate::wallet::HttpWallet;

/// State owned by the controller and mirrored into a Dioxus `Signal`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UiState {
    pub wallet_connected: bool,
    pub joined_whitelist: bool,
    pub tx_pending: bool,
    pub whitelisted_count: u64,
}

/// The four mutually exclusive variants of the primary action area.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum View {
    /// Wallet not connected yet.
    Connect,
    /// Connected and already on the whitelist.
    Member,
    /// Join transaction submitted, waiting for confirmation.
    Pending,
    /// Connected, not a member, nothing in flight.
    Join,
}

/// Membership is checked before the pending flag.
pub fn render(state: &UiState) -> View {
    if !state.wallet_connected {
        View::Connect
    } else if state.joined_whitelist {
        View::Member
    } else if state.tx_pending {
        View::Pending
    } else {
        View::Join
    }
}

/// Wallet link as shown in the top bar.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionStatus {
    pub fn new(state: &UiState, connecting: bool) -> Self {
        if state.wallet_connected {
            Self::Connected
        } else if connecting {
            Self::Connecting
        } else {
            Self::Disconnected
        }
    }
}

/// A blocking message the user has to dismiss.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub message: String,
}

/// Controller handle shared through Dioxus context.
pub type SharedController = Arc<WhitelistController<HttpWallet>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_is_total_and_prioritized() {
        for bits in 0u8..8 {
            let state = UiState {
                wallet_connected: bits & 1 != 0,
                joined_whitelist: bits & 2 != 0,
                tx_pending: bits & 4 != 0,
                whitelisted_count: 0,
            };
            let expected = match (state.wallet_connected, state.joined_whitelist, state.tx_pending) {
                (false, _, _) => View::Connect,
                (true, true, _) => View::Member,
                (true, false, true) => View::Pending,
                (true, false, false) => View::Join,
            };
            assert_eq!(render(&state), expected, "{state:?}");
        }
    }

    #[test]
    fn test_render_ignores_count() {
        let state = UiState {
            wallet_connected: true,
            whitelisted_count: 3,
            ..UiState::default()
        };
        assert_eq!(render(&state), View::Join);
        assert_eq!(render(&UiState { whitelisted_count: 99, ..state }), View::Join);
    }

    #[test]
    fn test_connection_status() {
        let mut state = UiState::default();
        assert_eq!(ConnectionStatus::new(&state, false), ConnectionStatus::Disconnected);
        assert_eq!(ConnectionStatus::new(&state, true), ConnectionStatus::Connecting);
        state.wallet_connected = true;
        assert_eq!(ConnectionStatus::new(&state, true), ConnectionStatus::Connected);
    }
}
