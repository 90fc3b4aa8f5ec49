use crate::server::{Result, ServerRouter};
use axum::Router;
use yatube_common::{
    model::post::Post,
    pagination::{Page, Paginator},
};
use yatube_db::client::{DbClient, PostFilter};

mod about;
mod accounts;
mod follow;
mod groups;
mod posts;
mod profiles;

pub fn routes() -> ServerRouter {
    Router::new()
        .merge(posts::routes())
        .merge(groups::routes())
        .merge(profiles::routes())
        .merge(follow::routes())
        .merge(accounts::routes())
        .merge(about::routes())
}

/// Counts the listing, then fetches just the requested page of it.
async fn fetch_page(
    db: &DbClient,
    paginator: Paginator,
    filter: PostFilter,
    requested: Option<&str>,
) -> Result<Page<Post>> {
    let count = db.count_posts(filter).await?;
    let window = paginator.window(requested, count);
    let posts = db.fetch_posts(filter, window.limit, window.offset).await?;

    Ok(window.into_page(posts))
}
