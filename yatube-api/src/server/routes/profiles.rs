use crate::server::{
    Result, ServerError, ServerRouter, Settings,
    auth::AuthenticatedUser,
    form::{PageQuery, Query},
    render::posts,
    routes::fetch_page,
};
use axum::{Router, extract::State, response::Html};
use axum_extra::routing::{RouterExt, TypedPath};
use serde::Deserialize;
use std::sync::Arc;
use yatube_common::model::user::{User, Username};
use yatube_db::client::{DbClient, PostFilter};

pub fn routes() -> ServerRouter {
    Router::new().typed_get(profile)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/profile/{username}/", rejection(ServerError))]
struct ProfilePath {
    username: String,
}

/// Looks up the user a `/profile/{username}/...` route is about.
pub(super) async fn fetch_profile_user(db: &DbClient, username: String) -> Result<User> {
    let user = match Username::new(username.clone()) {
        Ok(username) => db.fetch_user_by_username(&username).await?,
        Err(_) => None,
    };

    user.ok_or(ServerError::UserByUsernameNotFound(username))
}

async fn profile(
    ProfilePath { username }: ProfilePath,
    State(db): State<Arc<DbClient>>,
    State(settings): State<Settings>,
    viewer: Option<AuthenticatedUser>,
    Query(PageQuery { page }): Query<PageQuery>,
) -> Result<Html<String>> {
    let author = fetch_profile_user(&db, username).await?;

    let following = match &viewer {
        Some(viewer) => db.is_following(viewer.user_id(), author.id).await?,
        None => false,
    };

    let page = fetch_page(
        &db,
        settings.paginator,
        PostFilter::Author(author.id),
        page.as_deref(),
    )
    .await?;

    let viewer = viewer.as_ref().map(AuthenticatedUser::user);
    Ok(Html(
        posts::profile_page(viewer, &author, &page, following).into_string(),
    ))
}
