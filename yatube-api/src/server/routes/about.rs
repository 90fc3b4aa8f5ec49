use crate::server::{ServerRouter, auth::AuthenticatedUser, render::about};
use axum::{Router, response::Html};
use axum_extra::routing::{RouterExt, TypedPath};

pub fn routes() -> ServerRouter {
    Router::new().typed_get(author).typed_get(tech)
}

#[derive(TypedPath)]
#[typed_path("/about/author/")]
struct AuthorPath;

async fn author(_: AuthorPath, viewer: Option<AuthenticatedUser>) -> Html<String> {
    Html(about::author_page(viewer.as_ref().map(AuthenticatedUser::user)).into_string())
}

#[derive(TypedPath)]
#[typed_path("/about/tech/")]
struct TechPath;

async fn tech(_: TechPath, viewer: Option<AuthenticatedUser>) -> Html<String> {
    Html(about::tech_page(viewer.as_ref().map(AuthenticatedUser::user)).into_string())
}
