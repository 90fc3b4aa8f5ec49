use crate::server::render::layout;
use maud::{Markup, html};
use yatube_common::model::user::User;

pub fn author_page(viewer: Option<&User>) -> Markup {
    let body = html! {
        h1 { "About the author" }
        p {
            "Yatube is a small blogging platform: write posts, collect them in groups, "
            "comment on what others write and follow the authors you like."
        }
    };

    layout("About the author", viewer, &body)
}

pub fn tech_page(viewer: Option<&User>) -> Markup {
    let body = html! {
        h1 { "Technologies" }
        ul {
            li { "Rust with axum for routing and request handling" }
            li { "SQLite through sqlx for storage" }
            li { "maud for server-rendered pages" }
            li { "moka for caching the front page" }
        }
    };

    layout("Technologies", viewer, &body)
}
