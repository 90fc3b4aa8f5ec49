use crate::model::{Id, user::UserMarker};

/// `user` subscribes to the posts of `author`.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct Follow {
    pub user: Id<UserMarker>,
    pub author: Id<UserMarker>,
}

impl Follow {
    /// `None` when both sides are the same user.
    #[must_use]
    pub fn between(user: Id<UserMarker>, author: Id<UserMarker>) -> Option<Self> {
        (user != author).then_some(Self { user, author })
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{Id, follow::Follow};

    #[test]
    fn no_self_follow() {
        assert_eq!(Follow::between(Id::new(1), Id::new(1)), None);
        assert_eq!(
            Follow::between(Id::new(1), Id::new(2)),
            Some(Follow {
                user: Id::new(1),
                author: Id::new(2)
            })
        );
    }
}
