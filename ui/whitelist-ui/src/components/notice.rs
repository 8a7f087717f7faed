use dioxus::prelude::*;

use crate::state::Notice;

/// Blocks the page until the user dismisses the current notice.
#[component]
pub fn NoticeModal() -> Element {
    let mut notice = use_context::<Signal<Option<Notice>>>();
    let current = notice.read().clone();

    match current {
        Some(n) => rsx! {
            div { class: "modal-backdrop",
                div { class: "modal", role: "alertdialog",
                    h2 { class: "modal-title", "{n.title}" }
                    p { class: "modal-body", "{n.message}" }
                    button {
                        class: "btn btn-primary",
                        onclick: move |_| notice.set(None),
                        "OK"
                    }
                }
            }
        },
        None => rsx! {},
    }
}
