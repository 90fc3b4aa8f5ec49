use crate::server::{
    Result, ServerRouter, Settings,
    auth::{end_session, removal_cookie, session_cookie, start_session},
    form::{Form, Query},
    found,
    render::accounts,
    urls,
};
use axum::{
    Router,
    extract::State,
    http::HeaderMap,
    response::{Html, IntoResponse, Response},
};
use axum_extra::{
    extract::CookieJar,
    routing::{RouterExt, TypedPath},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};
use yatube_common::{
    form::{FormErrors, LoginForm, SignupForm, USERNAME_TAKEN},
    model::{
        auth::hash_password,
        user::{CreateUser, User, Username},
    },
};
use yatube_db::client::DbClient;

pub fn routes() -> ServerRouter {
    Router::new()
        .typed_get(signup_form)
        .typed_post(signup)
        .typed_get(login_form)
        .typed_post(login)
        .typed_get(logout)
        .typed_post(logout)
}

/// Issues a session for `user` and sends the browser on to `location`.
async fn log_in(
    db: &DbClient,
    settings: Settings,
    jar: CookieJar,
    user: &User,
    location: &str,
) -> Result<Response> {
    let token = start_session(db, user.id, settings.session_ttl).await?;
    info!(user = %user.username, "Logged in");

    let jar = jar.add(session_cookie(&token, settings.session_ttl));
    Ok((jar, found(location)).into_response())
}

#[derive(TypedPath)]
#[typed_path("/auth/signup/")]
struct SignupPath;

async fn signup_form(_: SignupPath) -> Html<String> {
    Html(accounts::signup_page("", &FormErrors::default()).into_string())
}

async fn signup(
    _: SignupPath,
    State(db): State<Arc<DbClient>>,
    State(settings): State<Settings>,
    jar: CookieJar,
    Form(form): Form<SignupForm>,
) -> Result<Response> {
    let taken = match Username::new(form.username.trim().to_owned()) {
        Ok(username) => db.fetch_user_by_username(&username).await?.is_some(),
        Err(_) => false,
    };

    let signup_page =
        |errors: &FormErrors| Html(accounts::signup_page(&form.username, errors).into_string());

    let valid = match form.validate(|_| taken) {
        Ok(valid) => valid,
        Err(errors) => return Ok(signup_page(&errors).into_response()),
    };

    let password_hash = hash_password(&valid.password)?;
    let created = db
        .create_user(&CreateUser {
            username: valid.username,
            password_hash,
        })
        .await?;

    // Someone else may have claimed the name since it was checked.
    let Some(user) = created else {
        let mut errors = FormErrors::default();
        errors.add("username", USERNAME_TAKEN);
        return Ok(signup_page(&errors).into_response());
    };
    info!(user = %user.username, "Signed up");

    log_in(&db, settings, jar, &user, &urls::index()).await
}

#[derive(TypedPath)]
#[typed_path("/auth/login/")]
struct LoginPath;

#[derive(Deserialize)]
struct LoginQuery {
    next: Option<String>,
}

async fn login_form(_: LoginPath, Query(LoginQuery { next }): Query<LoginQuery>) -> Html<String> {
    Html(accounts::login_page("", next.as_deref(), &FormErrors::default()).into_string())
}

async fn login(
    _: LoginPath,
    State(db): State<Arc<DbClient>>,
    State(settings): State<Settings>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let login_page = |errors: &FormErrors| {
        Html(accounts::login_page(&form.username, form.next.as_deref(), errors).into_string())
            .into_response()
    };

    let username = match form.username() {
        Ok(username) => username,
        Err(errors) => return Ok(login_page(&errors)),
    };

    let credentials = db.fetch_credentials(&username).await?;
    let checked = form.check_password(credentials.as_ref().map(|(_, hash)| hash.as_str()));

    match (checked, credentials) {
        (Ok(()), Some((user, _))) => {
            let next = urls::safe_next(form.next.as_deref());
            log_in(&db, settings, jar, &user, &next).await
        }
        (checked, _) => {
            debug!(user = %username, "Rejected login");
            Ok(login_page(&checked.err().unwrap_or_default()))
        }
    }
}

#[derive(TypedPath)]
#[typed_path("/auth/logout/")]
struct LogoutPath;

async fn logout(
    _: LogoutPath,
    State(db): State<Arc<DbClient>>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<(CookieJar, Html<String>)> {
    end_session(&headers, &db).await?;
    debug!("Logged out");

    let jar = jar.remove(removal_cookie());
    Ok((jar, Html(accounts::logged_out_page().into_string())))
}
