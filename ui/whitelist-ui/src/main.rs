#![allow(non_snake_case)]

mod components;
mod config;
mod contract;
mod controller;
mod state;
mod wallet;

use std::sync::Arc;

use anyhow::Context;
use dioxus::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::AppConfig;
use controller::WhitelistController;
use state::{Notice, SharedController};
use wallet::HttpWallet;

const STYLE: &str = include_str!("../assets/style.css");
const DEFAULT_LOG_FILTER: &str = "info,whitelist_ui=debug";

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let config = AppConfig::load().context("loading configuration")?;
    info!(
        wallet = %config.wallet_url,
        contract = %config.contract_address,
        chain_id = config.required_chain_id,
        "starting whitelist ui"
    );

    let wallet = HttpWallet::new(&config.wallet_url).context("building wallet client")?;
    let controller: SharedController = Arc::new(WhitelistController::new(wallet, &config));

    dioxus::LaunchBuilder::new()
        .with_context(controller)
        .launch(App);
    Ok(())
}

#[component]
fn App() -> Element {
    let controller = use_context::<SharedController>();
    let ui = use_context_provider(|| Signal::new(controller.state()));
    let notice = use_context_provider(|| Signal::new(None::<Notice>));

    // Mirror controller state into the signals the components read
    {
        let controller = controller.clone();
        use_future(move || {
            let mut rx = controller.subscribe();
            let mut ui = ui;
            async move {
                loop {
                    ui.set(*rx.borrow_and_update());
                    if rx.changed().await.is_err() {
                        break;
                    }
                }
            }
        });
    }
    {
        let controller = controller.clone();
        use_future(move || {
            let mut rx = controller.subscribe_notices();
            let mut notice = notice;
            async move {
                while rx.changed().await.is_ok() {
                    notice.set(rx.borrow_and_update().clone());
                }
            }
        });
    }

    // Startup routine: connect once when the window opens
    use_hook(move || {
        spawn(async move {
            if let Err(e) = controller.connect().await {
                components::report("connect", &e);
            }
        })
    });

    rsx! {
        document::Style { {STYLE} }
        components::layout::Layout {}
        components::notice::NoticeModal {}
    }
}
