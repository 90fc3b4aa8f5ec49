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
use yatube_common::model::group::GroupSlug;
use yatube_db::client::{DbClient, PostFilter};

pub fn routes() -> ServerRouter {
    Router::new().typed_get(group_posts)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/group/{slug}/", rejection(ServerError))]
struct GroupPath {
    slug: String,
}

async fn group_posts(
    GroupPath { slug }: GroupPath,
    State(db): State<Arc<DbClient>>,
    State(settings): State<Settings>,
    viewer: Option<AuthenticatedUser>,
    Query(PageQuery { page }): Query<PageQuery>,
) -> Result<Html<String>> {
    let group = match GroupSlug::new(slug.clone()) {
        Ok(slug) => db.fetch_group_by_slug(&slug).await?,
        Err(_) => None,
    };
    let group = group.ok_or(ServerError::GroupBySlugNotFound(slug))?;

    let page = fetch_page(
        &db,
        settings.paginator,
        PostFilter::Group(group.id),
        page.as_deref(),
    )
    .await?;

    let viewer = viewer.as_ref().map(AuthenticatedUser::user);
    Ok(Html(posts::group_page(viewer, &group, &page).into_string()))
}
