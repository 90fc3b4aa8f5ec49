use crate::server::{
    Result, ServerError, ServerRouter, Settings,
    auth::AuthenticatedUser,
    cache::IndexCache,
    form::{Form, PageQuery, PostSubmission, Query},
    found,
    media::MediaStore,
    render::posts::{self, PostFormTarget},
    routes::fetch_page,
    urls,
};
use axum::{
    Router,
    extract::State,
    http::Uri,
    response::{Html, IntoResponse, Response},
};
use axum_extra::routing::{RouterExt, TypedPath};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};
use yatube_common::{
    form::{CommentForm, FormErrors, PostForm},
    model::{
        Id,
        comment::CreateComment,
        post::{Post, PostContent, PostMarker},
        user::User,
    },
};
use yatube_db::client::{DbClient, PostFilter};

pub fn routes() -> ServerRouter {
    Router::new()
        .typed_get(index)
        .typed_get(post_detail)
        .typed_get(create_form)
        .typed_post(create_post)
        .typed_get(edit_form)
        .typed_post(edit_post)
        .typed_get(comment_form)
        .typed_post(add_comment)
}

#[derive(TypedPath)]
#[typed_path("/")]
struct IndexPath;

async fn index(
    _: IndexPath,
    State(db): State<Arc<DbClient>>,
    State(cache): State<IndexCache>,
    State(settings): State<Settings>,
    viewer: Option<AuthenticatedUser>,
    uri: Uri,
    Query(PageQuery { page }): Query<PageQuery>,
) -> Result<Html<String>> {
    let viewer = viewer.as_ref().map(AuthenticatedUser::user);
    let key = IndexCache::key(viewer.map(|viewer| viewer.id), &uri);

    let html = cache
        .get_or_render(key, async {
            let page = fetch_page(&db, settings.paginator, PostFilter::All, page.as_deref()).await?;
            Ok::<_, ServerError>(posts::index_page(viewer, &page).into_string())
        })
        .await?;

    Ok(Html(html.to_string()))
}

async fn fetch_post(db: &DbClient, post_id: Id<PostMarker>) -> Result<Post> {
    db.fetch_post(post_id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(post_id))
}

async fn render_post_detail(
    db: &DbClient,
    viewer: Option<&User>,
    post: &Post,
    comment_form: &CommentForm,
    errors: &FormErrors,
) -> Result<Html<String>> {
    let comments = db.fetch_comments(post.id).await?;
    let author_post_count = db.count_posts(PostFilter::Author(post.author.id)).await?;

    let page = posts::post_detail_page(
        viewer,
        post,
        author_post_count,
        &comments,
        comment_form,
        errors,
    );
    Ok(Html(page.into_string()))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{post_id}/", rejection(ServerError))]
struct PostDetailPath {
    post_id: Id<PostMarker>,
}

async fn post_detail(
    PostDetailPath { post_id }: PostDetailPath,
    State(db): State<Arc<DbClient>>,
    viewer: Option<AuthenticatedUser>,
) -> Result<Html<String>> {
    let post = fetch_post(&db, post_id).await?;

    render_post_detail(
        &db,
        viewer.as_ref().map(AuthenticatedUser::user),
        &post,
        &CommentForm::default(),
        &FormErrors::default(),
    )
    .await
}

#[derive(TypedPath)]
#[typed_path("/create/")]
struct CreatePath;

async fn create_form(
    _: CreatePath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Html<String>> {
    let groups = db.fetch_groups().await?;

    let page = posts::post_form_page(
        user.user(),
        PostFormTarget::Create,
        &PostForm::default(),
        &groups,
        &FormErrors::default(),
    );
    Ok(Html(page.into_string()))
}

async fn create_post(
    _: CreatePath,
    State(db): State<Arc<DbClient>>,
    State(media): State<Arc<MediaStore>>,
    user: AuthenticatedUser,
    PostSubmission(form): PostSubmission,
) -> Result<Response> {
    let groups = db.fetch_groups().await?;

    let valid = match form.validate(&groups) {
        Ok(valid) => valid,
        Err(errors) => {
            debug!(user = %user.user().username, "Rejected invalid new post");
            let page =
                posts::post_form_page(user.user(), PostFormTarget::Create, &form, &groups, &errors);
            return Ok(Html(page.into_string()).into_response());
        }
    };

    let author = user.user_id();
    let post_id = media
        .save_with(valid.image.as_ref(), |image| async move {
            let content = PostContent {
                text: valid.text,
                group: valid.group,
                image,
            };
            Ok::<_, ServerError>(db.create_post(author, &content).await?)
        })
        .await?;
    info!(post = %post_id, author = %user.user().username, "Created post");

    Ok(found(&urls::profile(&user.user().username)))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{post_id}/edit/", rejection(ServerError))]
struct EditPath {
    post_id: Id<PostMarker>,
}

async fn edit_form(
    EditPath { post_id }: EditPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Response> {
    let post = fetch_post(&db, post_id).await?;
    if let Err(err) = post.authorize_edit(user.user_id()) {
        debug!(error = %err, "Redirecting non-author away from edit form");
        return Ok(found(&urls::post_detail(post_id)));
    }

    let groups = db.fetch_groups().await?;
    let form = PostForm {
        text: post.text.clone(),
        group: post
            .group
            .as_ref()
            .map(|group| group.id.to_string())
            .unwrap_or_default(),
        image: None,
    };

    let page = posts::post_form_page(
        user.user(),
        PostFormTarget::Edit(post_id),
        &form,
        &groups,
        &FormErrors::default(),
    );
    Ok(Html(page.into_string()).into_response())
}

async fn edit_post(
    EditPath { post_id }: EditPath,
    State(db): State<Arc<DbClient>>,
    State(media): State<Arc<MediaStore>>,
    user: AuthenticatedUser,
    PostSubmission(form): PostSubmission,
) -> Result<Response> {
    let post = fetch_post(&db, post_id).await?;
    if let Err(err) = post.authorize_edit(user.user_id()) {
        debug!(error = %err, "Ignoring edit by non-author");
        return Ok(found(&urls::post_detail(post_id)));
    }

    let groups = db.fetch_groups().await?;
    let valid = match form.validate(&groups) {
        Ok(valid) => valid,
        Err(errors) => {
            let page = posts::post_form_page(
                user.user(),
                PostFormTarget::Edit(post_id),
                &form,
                &groups,
                &errors,
            );
            return Ok(Html(page.into_string()).into_response());
        }
    };

    media
        .save_with(valid.image.as_ref(), |image| async move {
            // Without a new upload the post keeps its image.
            let content = PostContent {
                text: valid.text,
                group: valid.group,
                image: image.or(post.image),
            };
            Ok::<_, ServerError>(db.update_post(post_id, &content).await?)
        })
        .await?;
    info!(post = %post_id, author = %user.user().username, "Edited post");

    Ok(found(&urls::post_detail(post_id)))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{post_id}/comment/", rejection(ServerError))]
struct CommentPath {
    post_id: Id<PostMarker>,
}

/// Comments are written on the detail page.
async fn comment_form(
    CommentPath { post_id }: CommentPath,
    State(db): State<Arc<DbClient>>,
    _: AuthenticatedUser,
) -> Result<Response> {
    fetch_post(&db, post_id).await?;
    Ok(found(&urls::post_detail(post_id)))
}

async fn add_comment(
    CommentPath { post_id }: CommentPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Form(form): Form<CommentForm>,
) -> Result<Response> {
    let post = fetch_post(&db, post_id).await?;

    let text = match form.validate() {
        Ok(text) => text,
        Err(errors) => {
            let page = render_post_detail(&db, Some(user.user()), &post, &form, &errors).await?;
            return Ok(page.into_response());
        }
    };

    let comment_id = db
        .create_comment(&CreateComment {
            post: post_id,
            author: user.user_id(),
            text,
        })
        .await?;
    info!(comment = %comment_id, post = %post_id, author = %user.user().username, "Added comment");

    Ok(found(&urls::post_detail(post_id)))
}
