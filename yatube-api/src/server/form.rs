use crate::server::ServerError;
use axum::{
    extract::{FromRequest, FromRequestParts, Multipart, Request},
    http::header,
};
use serde::Deserialize;
use yatube_common::form::{ImageUpload, PostForm};

/// Urlencoded form body.
#[derive(FromRequest, Debug, Clone, Copy, Default)]
#[from_request(via(axum::Form), rejection(ServerError))]
pub struct Form<T>(pub T);

#[derive(FromRequestParts, Debug, Clone, Copy, Default)]
#[from_request(via(axum::extract::Query), rejection(ServerError))]
pub struct Query<T>(pub T);

/// `?page=` of the paginated listings. Kept raw, bad values fall back to a valid page.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

/// The post form, sent either as `multipart/form-data` (with an image) or urlencoded.
///
/// Fields the form does not know, such as an `author`, are dropped.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct PostSubmission(pub PostForm);

#[derive(Deserialize)]
struct UrlencodedPost {
    #[serde(default)]
    text: String,
    #[serde(default)]
    group: String,
}

impl<S: Send + Sync> FromRequest<S> for PostSubmission {
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("multipart/form-data"));

        if !is_multipart {
            let Form(UrlencodedPost { text, group }) =
                Form::<UrlencodedPost>::from_request(req, state).await?;
            return Ok(Self(PostForm {
                text,
                group,
                image: None,
            }));
        }

        let mut multipart = Multipart::from_request(req, state).await?;
        let mut form = PostForm::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_owned();
            match name.as_str() {
                "text" => form.text = field.text().await?,
                "group" => form.group = field.text().await?,
                "image" => {
                    let file_name = field.file_name().unwrap_or_default().to_owned();
                    let bytes = field.bytes().await?;
                    form.image = Some(ImageUpload {
                        file_name,
                        bytes: bytes.to_vec(),
                    });
                }
                _ => {}
            }
        }

        Ok(Self(form))
    }
}
