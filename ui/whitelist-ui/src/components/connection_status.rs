use dioxus::prelude::*;

use crate::state::{ConnectionStatus, SharedController, UiState};

#[component]
pub fn ConnectionStatusIndicator() -> Element {
    let controller = use_context::<SharedController>();
    let ui = use_context::<Signal<UiState>>();
    let connecting = use_signal(|| false);

    // Every connect path goes through the controller, which counts them
    {
        let controller = controller.clone();
        use_future(move || {
            let mut rx = controller.subscribe_connecting();
            let mut connecting = connecting;
            async move {
                loop {
                    connecting.set(*rx.borrow_and_update() > 0);
                    if rx.changed().await.is_err() {
                        break;
                    }
                }
            }
        });
    }

    let status = ConnectionStatus::new(&ui.read(), *connecting.read());

    let (dot_class, label) = match status {
        ConnectionStatus::Disconnected => ("dot disconnected", "Disconnected"),
        ConnectionStatus::Connecting => ("dot connecting", "Connecting"),
        ConnectionStatus::Connected => ("dot connected", "Connected"),
    };

    let connect = move |_| {
        let controller = controller.clone();
        spawn(async move {
            if let Err(e) = controller.connect().await {
                super::report("connect", &e);
            }
        });
    };

    rsx! {
        div { class: "conn-indicator",
            span { class: dot_class }
            span { class: "conn-label", "{label}" }
            if status != ConnectionStatus::Connected {
                button {
                    class: "conn-btn conn-btn-connect",
                    disabled: status == ConnectionStatus::Connecting,
                    onclick: connect,
                    "Connect"
                }
            }
        }
    }
}
