use crate::server::{
    Result, ServerError, ServerRouter, Settings,
    auth::AuthenticatedUser,
    form::{PageQuery, Query},
    found,
    render::posts,
    routes::{fetch_page, profiles::fetch_profile_user},
    urls,
};
use axum::{
    Router,
    extract::State,
    response::{Html, Response},
};
use axum_extra::routing::{RouterExt, TypedPath};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};
use yatube_common::model::follow::Follow;
use yatube_db::client::{DbClient, PostFilter};

pub fn routes() -> ServerRouter {
    Router::new()
        .typed_get(follow_index)
        .typed_get(profile_follow)
        .typed_post(profile_follow)
        .typed_get(profile_unfollow)
        .typed_post(profile_unfollow)
}

#[derive(TypedPath)]
#[typed_path("/follow/")]
struct FollowIndexPath;

async fn follow_index(
    _: FollowIndexPath,
    State(db): State<Arc<DbClient>>,
    State(settings): State<Settings>,
    user: AuthenticatedUser,
    Query(PageQuery { page }): Query<PageQuery>,
) -> Result<Html<String>> {
    let page = fetch_page(
        &db,
        settings.paginator,
        PostFilter::FollowedBy(user.user_id()),
        page.as_deref(),
    )
    .await?;

    Ok(Html(posts::follow_page(user.user(), &page).into_string()))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/profile/{username}/follow/", rejection(ServerError))]
struct FollowPath {
    username: String,
}

async fn profile_follow(
    FollowPath { username }: FollowPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Response> {
    let author = fetch_profile_user(&db, username).await?;

    match Follow::between(user.user_id(), author.id) {
        Some(follow) => {
            if db.create_follow(follow).await? {
                info!(user = %user.user().username, author = %author.username, "Followed author");
            } else {
                debug!(user = %user.user().username, author = %author.username, "Already following");
            }
        }
        None => debug!(user = %author.username, "Ignoring self-follow"),
    }

    Ok(found(&urls::profile(&author.username)))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/profile/{username}/unfollow/", rejection(ServerError))]
struct UnfollowPath {
    username: String,
}

async fn profile_unfollow(
    UnfollowPath { username }: UnfollowPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Response> {
    let author = fetch_profile_user(&db, username).await?;

    if db.delete_follow(user.user_id(), author.id).await? {
        info!(user = %user.user().username, author = %author.username, "Unfollowed author");
    }

    Ok(found(&urls::profile(&author.username)))
}
