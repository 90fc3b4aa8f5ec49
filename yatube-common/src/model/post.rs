use crate::model::{
    Id,
    group::{Group, GroupMarker},
    user::{User, UserMarker},
};
use std::fmt::{Display, Formatter};
use thiserror::Error;
use time::UtcDateTime;

/// Characters of the text shown when a post is displayed in short form.
pub const POST_SUMMARY_LEN: usize = 15;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Post {
    pub id: Id<PostMarker>,
    pub author: User,
    pub text: String,
    pub pub_date: UtcDateTime,
    pub group: Option<Group>,
    /// Path of the image relative to the media root.
    pub image: Option<String>,
}

/// Everything about a post its author may change.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct PostContent {
    pub text: String,
    pub group: Option<Id<GroupMarker>>,
    pub image: Option<String>,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
#[error("User {user} is not the author of post {post}")]
pub struct NotPostAuthorError {
    pub post: Id<PostMarker>,
    pub user: Id<UserMarker>,
}

impl Post {
    #[must_use]
    pub fn summary(&self) -> &str {
        match self.text.char_indices().nth(POST_SUMMARY_LEN) {
            Some((end, _)) => &self.text[..end],
            None => &self.text,
        }
    }

    /// Only the author may edit a post.
    pub fn authorize_edit(&self, user: Id<UserMarker>) -> Result<(), NotPostAuthorError> {
        if self.author.id == user {
            Ok(())
        } else {
            Err(NotPostAuthorError {
                post: self.id,
                user,
            })
        }
    }
}

impl Display for Post {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.summary())
    }
}
