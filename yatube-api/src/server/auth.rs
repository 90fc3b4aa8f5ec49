use crate::server::{ServerError, urls};
use axum::{
    extract::{FromRef, FromRequestParts, OptionalFromRequestParts},
    http::{HeaderMap, request::Parts},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use headers::{Authorization, HeaderMapExt, authorization::Bearer};
use std::sync::Arc;
use time::UtcDateTime;
use tracing::debug;
use yatube_common::{
    model::{
        Id,
        auth::{AuthToken, AuthTokenHash, Authentication},
        user::{User, UserMarker},
    },
    util::PositiveDuration,
};
use yatube_db::client::DbClient;

pub const SESSION_COOKIE: &str = "sessionid";

/// The user a request was made by, resolved from the session cookie or a bearer token.
///
/// Routes that take this extractor require a login: without valid credentials they redirect
/// to the login page. Routes that merely want to know who is looking take
/// `Option<AuthenticatedUser>` instead.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct AuthenticatedUser {
    user: User,
}

impl AuthenticatedUser {
    #[must_use]
    pub fn user(&self) -> &User {
        &self.user
    }

    #[must_use]
    pub fn user_id(&self) -> Id<UserMarker> {
        self.user.id
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<DbClient>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let db = Arc::<DbClient>::from_ref(state);

        match authenticate(&parts.headers, &db).await? {
            Some(user) => Ok(user),
            None => {
                let next = parts
                    .uri
                    .path_and_query()
                    .map_or(urls::index(), |path| path.as_str().to_owned());
                Err(ServerError::LoginRequired(next))
            }
        }
    }
}

impl<S> OptionalFromRequestParts<S> for AuthenticatedUser
where
    Arc<DbClient>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        let db = Arc::<DbClient>::from_ref(state);
        authenticate(&parts.headers, &db).await
    }
}

/// Raw token sent with the request. The cookie wins over the header.
fn request_token(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        return Some(cookie.value().to_owned());
    }

    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|authorization| authorization.token().to_owned())
}

fn parse_token(headers: &HeaderMap) -> Option<AuthToken> {
    let raw = request_token(headers)?;

    match raw.parse::<AuthToken>() {
        Ok(token) => Some(token),
        Err(err) => {
            debug!(error = %err, "Ignoring malformed auth token");
            None
        }
    }
}

/// `None` for anonymous requests and for unknown or expired tokens.
async fn authenticate(
    headers: &HeaderMap,
    db: &DbClient,
) -> Result<Option<AuthenticatedUser>, ServerError> {
    let Some(request_token) = parse_token(headers) else {
        return Ok(None);
    };

    let token_hash = request_token.hash()?;
    let Some(authentication) = db.fetch_auth(&token_hash).await? else {
        debug!(user = %request_token.user_id, "Unknown auth token");
        return Ok(None);
    };

    if authentication.user != request_token.user_id
        || authentication.is_expired_at(UtcDateTime::now())
    {
        debug!(user = %authentication.user, "Rejecting expired or mismatched auth token");
        return Ok(None);
    }

    let user = db.fetch_user(authentication.user).await?;
    Ok(user.map(|user| AuthenticatedUser { user }))
}

/// Stores a fresh token for `user` and returns it. Only its hash is kept.
pub async fn start_session(
    db: &DbClient,
    user: Id<UserMarker>,
    expires_after: Option<PositiveDuration>,
) -> Result<AuthToken, ServerError> {
    let token = AuthToken::generate_random(user);

    db.create_auth(&Authentication {
        user,
        token_hash: token.hash()?,
        created_at: UtcDateTime::now(),
        expires_after,
    })
    .await?;

    Ok(token)
}

/// Forgets the token the request carries, if any.
pub async fn end_session(headers: &HeaderMap, db: &DbClient) -> Result<(), ServerError> {
    if let Some(token) = parse_token(headers) {
        let token_hash: AuthTokenHash = token.hash()?;
        db.delete_auth(&token_hash).await?;
    }

    Ok(())
}

#[must_use]
pub fn session_cookie(token: &AuthToken, expires_after: Option<PositiveDuration>) -> Cookie<'static> {
    let mut cookie = Cookie::build((SESSION_COOKIE, token.as_token_str()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);

    if let Some(expires_after) = expires_after {
        cookie = cookie.max_age(expires_after.get());
    }

    cookie.build()
}

#[must_use]
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, "")).path("/").build()
}
