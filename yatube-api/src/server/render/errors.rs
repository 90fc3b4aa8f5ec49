use crate::server::{render::layout, urls};
use axum::http::StatusCode;
use maud::{Markup, html};

pub fn not_found_page() -> Markup {
    let body = html! {
        h1 { "Page not found" }
        p { "There is nothing here. " a href=(urls::index()) { "Back to the start page" } }
    };

    layout("Page not found", None, &body)
}

pub fn error_page(status: StatusCode) -> Markup {
    let reason = status.canonical_reason().unwrap_or("Error");
    let body = html! {
        h1 { (status.as_u16()) " " (reason) }
        p { "The request could not be completed." }
    };

    layout(reason, None, &body)
}
