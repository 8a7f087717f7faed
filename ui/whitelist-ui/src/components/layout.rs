use dioxus::prelude::*;

use super::connection_status::ConnectionStatusIndicator;
use super::whitelist::WhitelistPage;
use crate::state::SharedController;

#[component]
pub fn Layout() -> Element {
    rsx! {
        div { class: "app-container",
            TopBar {}
            div { class: "main-content",
                WhitelistPage {}
            }
            Footer {}
        }
    }
}

#[component]
fn TopBar() -> Element {
    rsx! {
        header { class: "topbar",
            div { class: "topbar-left",
                span { class: "brand-icon", "◈" }
                span { class: "brand-text", "Whitelist" }
            }
            div { class: "topbar-right",
                ConnectionStatusIndicator {}
            }
        }
    }
}

#[component]
fn Footer() -> Element {
    let controller = use_context::<SharedController>();
    let address = controller.contract_address().to_string();

    rsx! {
        footer { class: "footer",
            span { class: "footer-text", "Whitelist contract " }
            span { class: "mono", title: "{address}", "{truncate_address(&address)}" }
        }
    }
}

fn truncate_address(address: &str) -> String {
    if address.len() > 12 {
        format!("{}...{}", &address[..6], &address[address.len() - 4..])
    } else {
        address.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_address() {
        assert_eq!(
            truncate_address("0x8b0f5a2d4c3e6f7a9b1c2d3e4f5a6b7c8d9e0f1a"),
            "0x8b0f...0f1a"
        );
        assert_eq!(truncate_address("0x1234"), "0x1234");
    }
}
