//! Links between pages. Every route's path is spelled out once here and in its `TypedPath`.

use yatube_common::model::{Id, group::GroupSlug, post::PostMarker, user::Username};

pub const MEDIA_URL: &str = "/media";

#[must_use]
pub fn index() -> String {
    "/".to_owned()
}

#[must_use]
pub fn page(path: &str, number: u32) -> String {
    format!("{path}?page={number}")
}

#[must_use]
pub fn group(slug: &GroupSlug) -> String {
    format!("/group/{}/", urlencoding::encode(slug.get()))
}

#[must_use]
pub fn profile(username: &Username) -> String {
    format!("/profile/{}/", urlencoding::encode(username.get()))
}

#[must_use]
pub fn follow(username: &Username) -> String {
    format!("/profile/{}/follow/", urlencoding::encode(username.get()))
}

#[must_use]
pub fn unfollow(username: &Username) -> String {
    format!("/profile/{}/unfollow/", urlencoding::encode(username.get()))
}

#[must_use]
pub fn post_detail(post: Id<PostMarker>) -> String {
    format!("/posts/{post}/")
}

#[must_use]
pub fn post_edit(post: Id<PostMarker>) -> String {
    format!("/posts/{post}/edit/")
}

#[must_use]
pub fn add_comment(post: Id<PostMarker>) -> String {
    format!("/posts/{post}/comment/")
}

#[must_use]
pub fn create() -> String {
    "/create/".to_owned()
}

#[must_use]
pub fn follow_index() -> String {
    "/follow/".to_owned()
}

#[must_use]
pub fn login(next: Option<&str>) -> String {
    match next {
        Some(next) => format!("/auth/login/?next={}", urlencoding::encode(next)),
        None => "/auth/login/".to_owned(),
    }
}

#[must_use]
pub fn signup() -> String {
    "/auth/signup/".to_owned()
}

#[must_use]
pub fn logout() -> String {
    "/auth/logout/".to_owned()
}

#[must_use]
pub fn about_author() -> String {
    "/about/author/".to_owned()
}

#[must_use]
pub fn about_tech() -> String {
    "/about/tech/".to_owned()
}

#[must_use]
pub fn media(path: &str) -> String {
    format!("{MEDIA_URL}/{path}")
}

/// Where to go after logging in. Anything but a path on this site means the index.
#[must_use]
pub fn safe_next(next: Option<&str>) -> String {
    match next {
        Some(next) if next.starts_with('/') && !next.starts_with("//") && !next.contains('\\') => {
            next.to_owned()
        }
        _ => index(),
    }
}
