//! Server-rendered HTML pages.
//!
//! Every function here turns already-fetched values into [`Markup`]; none of them touch the
//! store. Dynamic values are escaped by `maud`.

pub mod about;
pub mod accounts;
mod components;
pub mod errors;
pub mod posts;

use crate::server::urls;
use maud::{DOCTYPE, Markup, PreEscaped, html};
use yatube_common::model::user::User;

const SITE_NAME: &str = "Yatube";

const PAGE_CSS: &str = r"
*{box-sizing:border-box}
body{margin:0;font-family:-apple-system,BlinkMacSystemFont,'Segoe UI',Roboto,sans-serif;line-height:1.5;color:#212529;background:#f8f9fa}
header{background:#fff;border-bottom:1px solid #dee2e6}
header nav{max-width:960px;margin:0 auto;display:flex;gap:1rem;align-items:center;padding:.75rem 1rem}
header .brand{font-weight:700;color:#dc3545;margin-right:auto;text-decoration:none}
main{max-width:960px;margin:0 auto;padding:1.5rem 1rem}
a{color:#0d6efd}
.post{background:#fff;border:1px solid #dee2e6;border-radius:6px;padding:1rem;margin-bottom:1rem}
.post .meta{color:#6c757d;font-size:.9rem;margin:0}
.post .text{white-space:pre-wrap;word-break:break-word}
.post img{max-width:100%;height:auto}
.comments article{border-top:1px solid #dee2e6;padding:.5rem 0}
.pagination{display:flex;gap:.5rem;list-style:none;padding:0}
.pagination .current{font-weight:700}
form p{margin:.5rem 0}
form label{display:block;font-weight:600}
textarea{width:100%;min-height:8rem}
.errorlist{color:#dc3545;list-style:none;padding:0;margin:.25rem 0}
.profile-header{display:flex;gap:1rem;align-items:baseline}
footer{text-align:center;color:#6c757d;padding:2rem 0}
";

/// Wraps a page body in the document shared by all pages.
pub fn layout(title: &str, viewer: Option<&User>, body: &Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) " | " (SITE_NAME) }
                style { (PreEscaped(PAGE_CSS)) }
            }
            body {
                header {
                    nav {
                        a.brand href=(urls::index()) { (SITE_NAME) }
                        a href=(urls::index()) { "Home" }
                        a href=(urls::about_author()) { "About the author" }
                        a href=(urls::about_tech()) { "Technologies" }
                        @if let Some(viewer) = viewer {
                            a href=(urls::follow_index()) { "Following" }
                            a href=(urls::create()) { "New post" }
                            a href=(urls::profile(&viewer.username)) { (viewer.username) }
                            a href=(urls::logout()) { "Log out" }
                        } @else {
                            a href=(urls::login(None)) { "Log in" }
                            a href=(urls::signup()) { "Sign up" }
                        }
                    }
                }
                main { (body) }
                footer { "© " (SITE_NAME) }
            }
        }
    }
}
