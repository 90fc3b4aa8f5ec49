//! Validation of browser form submissions.
//!
//! Raw submissions keep whatever the browser sent so an invalid form can be rendered again
//! with the user's input; validation turns them into the typed values the store accepts.

use crate::model::{
    Id,
    auth::verify_password,
    group::{Group, GroupMarker},
    user::Username,
};
use image::ImageFormat;
use serde::Deserialize;
use std::collections::BTreeMap;

pub const PASSWORD_MIN_LEN: usize = 8;

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_CHOICE: &str = "Select a valid choice. That choice is not one of the available choices.";
pub const INVALID_IMAGE: &str = "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";
pub const INVALID_USERNAME: &str = "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.";
pub const USERNAME_TAKEN: &str = "A user with that username already exists.";
pub const PASSWORD_TOO_SHORT: &str = "This password is too short. It must contain at least 8 characters.";
pub const PASSWORD_MISMATCH: &str = "The two password fields didn't match.";
pub const INVALID_LOGIN: &str = "Please enter a correct username and password.";

/// Key under which errors not tied to a single field are collected.
pub const NON_FIELD_ERRORS: &str = "__all__";

/// Error messages per field name.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct FormErrors(BTreeMap<&'static str, Vec<String>>);

impl FormErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    #[must_use]
    pub fn field(&self, field: &str) -> &[String] {
        self.0.get(field).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn into_result<T>(self, value: impl FnOnce() -> T) -> Result<T, Self> {
        if self.is_empty() { Ok(value()) } else { Err(self) }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum ImageKind {
    Gif,
    Png,
    Jpeg,
    Webp,
}

impl ImageKind {
    /// Recognizes the format of an upload and checks that the whole image decodes.
    ///
    /// A file that merely starts like an image is rejected.
    #[must_use]
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        let format = image::guess_format(bytes).ok()?;
        let kind = match format {
            ImageFormat::Gif => Self::Gif,
            ImageFormat::Png => Self::Png,
            ImageFormat::Jpeg => Self::Jpeg,
            ImageFormat::WebP => Self::Webp,
            _ => return None,
        };

        image::load_from_memory_with_format(bytes, format).ok()?;
        Some(kind)
    }

    /// File extension images of this kind are stored with.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Gif => "gif",
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Webp => "webp",
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct ImageUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct ValidImage {
    pub file_name: String,
    pub kind: ImageKind,
    pub bytes: Vec<u8>,
}

/// Post form as submitted.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct PostForm {
    pub text: String,
    /// Raw value of the group select. Empty means no group.
    pub group: String,
    pub image: Option<ImageUpload>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct ValidPost {
    pub text: String,
    pub group: Option<Id<GroupMarker>>,
    pub image: Option<ValidImage>,
}

impl PostForm {
    /// `groups` are the choices the group select offers.
    pub fn validate(&self, groups: &[Group]) -> Result<ValidPost, FormErrors> {
        let mut errors = FormErrors::default();

        let text = self.text.trim();
        if text.is_empty() {
            errors.add("text", REQUIRED);
        }

        let group_value = self.group.trim();
        let group = if group_value.is_empty() {
            None
        } else {
            let chosen = group_value
                .parse::<Id<GroupMarker>>()
                .ok()
                .filter(|id| groups.iter().any(|group| group.id == *id));
            if chosen.is_none() {
                errors.add("group", INVALID_CHOICE);
            }
            chosen
        };

        let image = match &self.image {
            Some(upload) if upload.bytes.is_empty() && upload.file_name.is_empty() => None,
            Some(upload) => match ImageKind::detect(&upload.bytes) {
                Some(kind) => Some(ValidImage {
                    file_name: upload.file_name.clone(),
                    kind,
                    bytes: upload.bytes.clone(),
                }),
                None => {
                    errors.add("image", INVALID_IMAGE);
                    None
                }
            },
            None => None,
        };

        errors.into_result(|| ValidPost {
            text: text.to_owned(),
            group,
            image,
        })
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub text: String,
}

impl CommentForm {
    pub fn validate(&self) -> Result<String, FormErrors> {
        let mut errors = FormErrors::default();

        let text = self.text.trim();
        if text.is_empty() {
            errors.add("text", REQUIRED);
        }

        errors.into_result(|| text.to_owned())
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password1: String,
    #[serde(default)]
    pub password2: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct ValidSignup {
    pub username: Username,
    pub password: String,
}

impl SignupForm {
    /// `username_taken` is asked only for a well-formed username.
    pub fn validate(
        &self,
        username_taken: impl Fn(&Username) -> bool,
    ) -> Result<ValidSignup, FormErrors> {
        let mut errors = FormErrors::default();

        let username = match self.username.trim() {
            "" => {
                errors.add("username", REQUIRED);
                None
            }
            raw => match Username::new(raw.to_owned()) {
                Ok(username) if username_taken(&username) => {
                    errors.add("username", USERNAME_TAKEN);
                    None
                }
                Ok(username) => Some(username),
                Err(_) => {
                    errors.add("username", INVALID_USERNAME);
                    None
                }
            },
        };

        if self.password1.is_empty() {
            errors.add("password1", REQUIRED);
        } else if self.password1.chars().count() < PASSWORD_MIN_LEN {
            errors.add("password1", PASSWORD_TOO_SHORT);
        }

        if self.password2.is_empty() {
            errors.add("password2", REQUIRED);
        } else if self.password1 != self.password2 {
            errors.add("password2", PASSWORD_MISMATCH);
        }

        match username {
            Some(username) if errors.is_empty() => Ok(ValidSignup {
                username,
                password: self.password1.clone(),
            }),
            _ => Err(errors),
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

impl LoginForm {
    /// Checks the required fields before the store is consulted.
    pub fn username(&self) -> Result<Username, FormErrors> {
        let mut errors = FormErrors::default();

        if self.username.trim().is_empty() {
            errors.add("username", REQUIRED);
        }
        if self.password.is_empty() {
            errors.add("password", REQUIRED);
        }
        if !errors.is_empty() {
            return Err(errors);
        }

        Username::new(self.username.trim().to_owned()).map_err(|_| invalid_login())
    }

    /// `stored_hash` is `None` when no such user exists.
    pub fn check_password(&self, stored_hash: Option<&str>) -> Result<(), FormErrors> {
        match stored_hash {
            Some(hash) if verify_password(&self.password, hash) => Ok(()),
            _ => Err(invalid_login()),
        }
    }
}

fn invalid_login() -> FormErrors {
    let mut errors = FormErrors::default();
    errors.add(NON_FIELD_ERRORS, INVALID_LOGIN);
    errors
}

#[cfg(test)]
mod tests {
    use crate::form::{
        CommentForm, FormErrors, INVALID_CHOICE, INVALID_IMAGE, INVALID_LOGIN, ImageKind,
        ImageUpload, LoginForm, NON_FIELD_ERRORS, PASSWORD_MISMATCH, PASSWORD_TOO_SHORT,
        PostForm, REQUIRED, SignupForm, USERNAME_TAKEN,
    };
    use crate::model::{
        Id,
        auth::hash_password,
        group::{Group, GroupSlug},
    };
    use image::{DynamicImage, ImageOutputFormat};
    use std::io::Cursor;

    const SMALL_GIF: &[u8] = b"GIF89a\x02\x00\x01\x00\x80\x00\x00\x00\x00\x00\xFF\xFF\xFF\x21\xF9\x04\x00\x00\x00\x00\x00\x2C\x00\x00\x00\x00\x02\x00\x01\x00\x00\x02\x02\x0C\x0A\x00\x3B";

    fn groups() -> Vec<Group> {
        vec![Group {
            id: Id::new(3),
            title: "Test group".to_owned(),
            slug: GroupSlug::new("test-slug".to_owned()).unwrap(),
            description: String::new(),
        }]
    }

    fn encoded(format: ImageOutputFormat) -> Vec<u8> {
        let mut bytes = Vec::new();
        DynamicImage::new_rgb8(2, 1)
            .write_to(&mut Cursor::new(&mut bytes), format)
            .unwrap();
        bytes
    }

    #[test]
    fn detects_images() {
        assert_eq!(ImageKind::detect(SMALL_GIF), Some(ImageKind::Gif));
        assert_eq!(
            ImageKind::detect(&encoded(ImageOutputFormat::Png)),
            Some(ImageKind::Png)
        );
        assert_eq!(
            ImageKind::detect(&encoded(ImageOutputFormat::Jpeg(90))),
            Some(ImageKind::Jpeg)
        );
        assert_eq!(ImageKind::detect(b"plain text"), None);
        assert_eq!(ImageKind::detect(b""), None);
    }

    #[test]
    fn image_headers_alone_are_not_images() {
        assert_eq!(
            ImageKind::detect(b"GIF89a<script>alert(document.cookie)</script>"),
            None
        );
        assert_eq!(ImageKind::detect(b"\x89PNG\r\n\x1a\n\0\0"), None);
        assert_eq!(ImageKind::detect(b"\xFF\xD8\xFF\xE0"), None);

        let png = encoded(ImageOutputFormat::Png);
        assert_eq!(ImageKind::detect(&png[..png.len() / 2]), None);
    }

    #[test]
    fn corrupt_upload_is_an_invalid_image() {
        let form = PostForm {
            text: "text".to_owned(),
            group: String::new(),
            image: Some(ImageUpload {
                file_name: "small.gif".to_owned(),
                bytes: SMALL_GIF[..20].to_vec(),
            }),
        };

        assert_eq!(
            form.validate(&groups()).unwrap_err().field("image"),
            [INVALID_IMAGE]
        );
    }

    #[test]
    fn valid_post() {
        let form = PostForm {
            text: "  Текст поста ".to_owned(),
            group: "3".to_owned(),
            image: Some(ImageUpload {
                file_name: "small.gif".to_owned(),
                bytes: SMALL_GIF.to_vec(),
            }),
        };

        let post = form.validate(&groups()).unwrap();
        assert_eq!(post.text, "Текст поста");
        assert_eq!(post.group, Some(Id::new(3)));
        assert_eq!(post.image.map(|image| image.kind), Some(ImageKind::Gif));
    }

    #[test]
    fn post_without_group_or_image() {
        let form = PostForm {
            text: "text".to_owned(),
            ..PostForm::default()
        };

        let post = form.validate(&groups()).unwrap();
        assert_eq!(post.group, None);
        assert_eq!(post.image, None);
    }

    #[test]
    fn invalid_post_collects_every_error() {
        let form = PostForm {
            text: "   ".to_owned(),
            group: "42".to_owned(),
            image: Some(ImageUpload {
                file_name: "notes.txt".to_owned(),
                bytes: b"not an image".to_vec(),
            }),
        };

        let errors = form.validate(&groups()).unwrap_err();
        assert_eq!(errors.field("text"), [REQUIRED]);
        assert_eq!(errors.field("group"), [INVALID_CHOICE]);
        assert_eq!(errors.field("image"), [INVALID_IMAGE]);
        assert!(errors.field("author").is_empty());
    }

    #[test]
    fn garbled_group_is_an_invalid_choice() {
        let form = PostForm {
            text: "text".to_owned(),
            group: "test-slug".to_owned(),
            image: None,
        };

        assert_eq!(
            form.validate(&groups()).unwrap_err().field("group"),
            [INVALID_CHOICE]
        );
    }

    #[test]
    fn comment_requires_text() {
        assert_eq!(
            CommentForm {
                text: " nice ".to_owned()
            }
            .validate(),
            Ok("nice".to_owned())
        );
        assert_eq!(
            CommentForm::default().validate().unwrap_err().field("text"),
            [REQUIRED]
        );
    }

    #[test]
    fn signup() {
        let form = SignupForm {
            username: "NoName".to_owned(),
            password1: "long enough".to_owned(),
            password2: "long enough".to_owned(),
        };
        let signup = form.validate(|_| false).unwrap();
        assert_eq!(signup.username.get(), "NoName");

        assert_eq!(
            form.validate(|_| true).unwrap_err().field("username"),
            [USERNAME_TAKEN]
        );

        let errors = SignupForm {
            username: "NoName".to_owned(),
            password1: "short".to_owned(),
            password2: "other".to_owned(),
        }
        .validate(|_| false)
        .unwrap_err();
        assert_eq!(errors.field("password1"), [PASSWORD_TOO_SHORT]);
        assert_eq!(errors.field("password2"), [PASSWORD_MISMATCH]);

        let errors = SignupForm::default().validate(|_| false).unwrap_err();
        assert_eq!(errors.field("username"), [REQUIRED]);
        assert_eq!(errors.field("password1"), [REQUIRED]);
        assert_eq!(errors.field("password2"), [REQUIRED]);
    }

    #[test]
    fn login() {
        let stored = hash_password("long enough").unwrap();
        let form = LoginForm {
            username: "NoName".to_owned(),
            password: "long enough".to_owned(),
            next: None,
        };

        assert_eq!(form.username().unwrap().get(), "NoName");
        assert!(form.check_password(Some(&stored)).is_ok());

        let wrong = LoginForm {
            password: "wrong password".to_owned(),
            ..form.clone()
        };
        assert_eq!(
            wrong.check_password(Some(&stored)).unwrap_err().field(NON_FIELD_ERRORS),
            [INVALID_LOGIN]
        );
        assert!(form.check_password(None).is_err());

        let errors: FormErrors = LoginForm::default().username().unwrap_err();
        assert_eq!(errors.field("username"), [REQUIRED]);
        assert_eq!(errors.field("password"), [REQUIRED]);
    }
}
