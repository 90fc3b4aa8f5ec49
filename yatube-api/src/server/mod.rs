use crate::config::Env;
use axum::{
    Router,
    extract::{
        FromRef, Request,
        multipart::{MultipartError, MultipartRejection},
        rejection::{FormRejection, PathRejection, QueryRejection},
    },
    http::{StatusCode, Uri, header},
    response::{Html, IntoResponse, Response},
};
use cache::IndexCache;
use media::MediaStore;
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{debug, error};
use yatube_common::{
    model::{
        Id,
        auth::{AuthTokenHashError, PasswordHashError},
        post::PostMarker,
    },
    pagination::Paginator,
    util::PositiveDuration,
};
use yatube_db::client::{DbClient, DbError};

pub mod auth;
pub mod cache;
mod form;
pub mod media;
mod render;
mod routes;
mod urls;

pub type ServerRouter = Router<ServerState>;

#[derive(Clone, Debug, FromRef)]
pub struct ServerState {
    pub db_client: Arc<DbClient>,
    pub index_cache: IndexCache,
    pub media: Arc<MediaStore>,
    pub settings: Settings,
}

/// Request-handling knobs taken from the environment.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct Settings {
    pub paginator: Paginator,
    pub session_ttl: Option<PositiveDuration>,
}

impl ServerState {
    #[must_use]
    pub fn new(db_client: DbClient, env: &Env) -> Self {
        Self {
            db_client: Arc::new(db_client),
            index_cache: IndexCache::new(Duration::from_secs(env.index_cache_seconds)),
            media: Arc::new(MediaStore::new(env.media_root.clone())),
            settings: Settings {
                paginator: Paginator::new(env.posts_count),
                session_ttl: PositiveDuration::from_seconds(env.session_ttl_seconds),
            },
        }
    }
}

/// The whole site, ready to be served.
pub fn app(state: ServerState) -> Router {
    let media_root = state.media.root().to_owned();

    routes::routes()
        .fallback(fallback)
        .nest_service(urls::MEDIA_URL, ServeDir::new(media_root))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Query string rejected: {0}")]
    QueryRejection(#[from] QueryRejection),
    #[error("Submitted form rejected: {0}")]
    FormRejection(#[from] FormRejection),
    #[error("Multipart form rejected: {0}")]
    MultipartRejection(#[from] MultipartRejection),
    #[error("Reading multipart form failed: {0}")]
    Multipart(#[from] MultipartError),
    #[error("Login required to access {0}")]
    LoginRequired(String),
    #[error("The auth token could not be hashed: {0}")]
    AuthTokenHash(#[from] AuthTokenHashError),
    #[error(transparent)]
    PasswordHash(#[from] PasswordHashError),
    #[error(transparent)]
    Database(#[from] DbError),
    #[error("Storing media failed: {0}")]
    Media(#[from] std::io::Error),
    #[error("Post with id {0} was not found.")]
    PostByIdNotFound(Id<PostMarker>),
    #[error("Group with slug {0} was not found.")]
    GroupBySlugNotFound(String),
    #[error("User with username {0} was not found.")]
    UserByUsernameNotFound(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_)
            | ServerError::PathRejection(_)
            | ServerError::PostByIdNotFound(_)
            | ServerError::GroupBySlugNotFound(_)
            | ServerError::UserByUsernameNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::LoginRequired(_) => StatusCode::FOUND,
            ServerError::QueryRejection(_)
            | ServerError::FormRejection(_)
            | ServerError::MultipartRejection(_)
            | ServerError::Multipart(_) => StatusCode::BAD_REQUEST,
            ServerError::AuthTokenHash(_)
            | ServerError::PasswordHash(_)
            | ServerError::Database(_)
            | ServerError::Media(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        if let ServerError::LoginRequired(next) = &self {
            debug!(%next, "Redirecting to login");
            return found(&urls::login(Some(next)));
        }

        if status.is_server_error() {
            error!(error = %self, %status, "Replying with error");
        } else {
            debug!(error = %self, %status, "Replying with error");
        }

        let page = if status == StatusCode::NOT_FOUND {
            render::errors::not_found_page()
        } else {
            render::errors::error_page(status)
        };
        (status, Html(page.into_string())).into_response()
    }
}

/// `302 Found` pointing at `location`.
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_owned())]).into_response()
}
