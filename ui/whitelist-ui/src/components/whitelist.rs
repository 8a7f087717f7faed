use dioxus::prelude::*;

use super::report;
use crate::state::{render, SharedController, UiState, View};

#[component]
pub fn WhitelistPage() -> Element {
    let controller = use_context::<SharedController>();
    let ui = use_context::<Signal<UiState>>();
    let state = *ui.read();

    let on_connect = {
        let controller = controller.clone();
        move |_| {
            let controller = controller.clone();
            spawn(async move {
                if let Err(e) = controller.connect().await {
                    report("connect", &e);
                }
            });
        }
    };

    let on_join = move |_| {
        let controller = controller.clone();
        spawn(async move {
            if let Err(e) = controller.join_whitelist().await {
                report("join", &e);
            }
        });
    };

    rsx! {
        div { class: "page",
            h1 { "Early Access Whitelist" }
            p { class: "subtitle", "Get on the list before the collection mints." }
            p { class: "count", "{count_label(state.whitelisted_count)}" }

            match render(&state) {
                View::Connect => rsx! {
                    button { class: "btn btn-primary", onclick: on_connect, "Connect your wallet" }
                },
                View::Member => rsx! {
                    p { class: "success-text", "Thanks for joining the Whitelist!" }
                },
                View::Pending => rsx! {
                    button { class: "btn btn-primary", disabled: true,
                        span { class: "spinner" }
                        "Loading..."
                    }
                },
                View::Join => rsx! {
                    button { class: "btn btn-primary", onclick: on_join, "Join the Whitelist" }
                },
            }
        }
    }
}

fn count_label(count: u64) -> String {
    match count {
        1 => "1 address has already joined the Whitelist".to_string(),
        n => format!("{n} addresses have already joined the Whitelist"),
    }
}
