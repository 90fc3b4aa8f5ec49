use crate::record::{
    AuthenticationRecord, CommentRecord, CredentialsRecord, FullPostRecord, GroupRecord,
    UserRecord,
};
use sqlx::{
    SqlitePool,
    migrate::MigrateError,
    query, query_as, query_scalar,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::str::FromStr;
use thiserror::Error;
use time::{PrimitiveDateTime, UtcDateTime};
use tracing::{debug, info};
use yatube_common::model::{
    Id, ModelValidationError,
    auth::{AuthTokenHash, Authentication},
    comment::{Comment, CommentMarker, CreateComment},
    follow::Follow,
    group::{CreateGroup, Group, GroupMarker, GroupSlug},
    post::{Post, PostContent, PostMarker},
    user::{CreateUser, User, UserMarker, Username},
};

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error("Running migrations failed: {0}")]
    Migrate(#[from] MigrateError),
}

/// Which posts a listing shows.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum PostFilter {
    All,
    Group(Id<GroupMarker>),
    Author(Id<UserMarker>),
    /// Posts by every author the user follows.
    FollowedBy(Id<UserMarker>),
}

impl PostFilter {
    fn condition(self) -> &'static str {
        match self {
            PostFilter::All => "",
            PostFilter::Group(_) => "WHERE posts.group_id = ?",
            PostFilter::Author(_) => "WHERE posts.author_id = ?",
            PostFilter::FollowedBy(_) => {
                "WHERE posts.author_id IN (
                    SELECT follows.author_id FROM follows WHERE follows.user_id = ?
                )"
            }
        }
    }

    fn parameter(self) -> Option<i64> {
        match self {
            PostFilter::All => None,
            PostFilter::Group(id) => Some(id.get()),
            PostFilter::Author(id) | PostFilter::FollowedBy(id) => Some(id.get()),
        }
    }
}

const FULL_POST_SELECT: &str = "
    SELECT
        posts.post_id,
        posts.text,
        posts.pub_date,
        posts.image,
        users.user_id AS author_id,
        users.username,
        post_groups.group_id,
        post_groups.title AS group_title,
        post_groups.slug AS group_slug,
        post_groups.description AS group_description
    FROM
        posts
        JOIN users ON users.user_id = posts.author_id
        LEFT JOIN post_groups ON post_groups.group_id = posts.group_id
";

fn now() -> PrimitiveDateTime {
    let now = UtcDateTime::now();
    PrimitiveDateTime::new(now.date(), now.time())
}

#[derive(Clone, Debug)]
pub struct DbClient {
    pool: SqlitePool,
}

impl DbClient {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens the database at `url` and brings its schema up to date.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.foreign_keys(true);

        // Every connection to an in-memory database sees its own empty database, and the
        // database is gone once its only connection closes.
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options.connect_with(options).await?;

        let client = Self::new(pool);
        client.migrate().await?;

        Ok(client)
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database schema is up to date");

        Ok(())
    }

    pub async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(
            "
            SELECT users.user_id, users.username
            FROM users
            WHERE users.user_id = ?
            ",
        )
        .bind(user_id.get())
        .fetch_optional(&self.pool)
        .await?;

        let user = record.map(User::try_from).transpose()?;
        Ok(user)
    }

    pub async fn fetch_user_by_username(&self, username: &Username) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(
            "
            SELECT users.user_id, users.username
            FROM users
            WHERE users.username = ?
            ",
        )
        .bind(username.get())
        .fetch_optional(&self.pool)
        .await?;

        let user = record.map(User::try_from).transpose()?;
        Ok(user)
    }

    /// The user together with their stored password hash.
    pub async fn fetch_credentials(&self, username: &Username) -> Result<Option<(User, String)>> {
        let record = query_as::<_, CredentialsRecord>(
            "
            SELECT users.user_id, users.username, users.password_hash
            FROM users
            WHERE users.username = ?
            ",
        )
        .bind(username.get())
        .fetch_optional(&self.pool)
        .await?;

        record
            .map(|record| -> Result<_> {
                let user = User {
                    id: record.user_id.into(),
                    username: Username::new(record.username).map_err(ModelValidationError::from)?,
                };
                Ok((user, record.password_hash))
            })
            .transpose()
    }

    /// `None` if the username is already taken.
    pub async fn create_user(&self, user: &CreateUser) -> Result<Option<User>> {
        let inserted = query_scalar::<_, i64>(
            "
            INSERT INTO users (username, password_hash)
            VALUES (?, ?)
            RETURNING user_id
            ",
        )
        .bind(user.username.get())
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await;

        match inserted {
            Ok(user_id) => Ok(Some(User {
                id: user_id.into(),
                username: user.username.clone(),
            })),
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// `None` if a group with this slug already exists.
    pub async fn create_group(&self, group: &CreateGroup) -> Result<Option<Group>> {
        let inserted = query_scalar::<_, i64>(
            "
            INSERT INTO post_groups (title, slug, description)
            VALUES (?, ?, ?)
            RETURNING group_id
            ",
        )
        .bind(&group.title)
        .bind(group.slug.get())
        .bind(&group.description)
        .fetch_one(&self.pool)
        .await;

        match inserted {
            Ok(group_id) => Ok(Some(Group {
                id: group_id.into(),
                title: group.title.clone(),
                slug: group.slug.clone(),
                description: group.description.clone(),
            })),
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                debug!(slug = %group.slug, "Group already exists");
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn fetch_group_by_slug(&self, slug: &GroupSlug) -> Result<Option<Group>> {
        let record = query_as::<_, GroupRecord>(
            "
            SELECT post_groups.group_id, post_groups.title, post_groups.slug, post_groups.description
            FROM post_groups
            WHERE post_groups.slug = ?
            ",
        )
        .bind(slug.get())
        .fetch_optional(&self.pool)
        .await?;

        let group = record.map(Group::try_from).transpose()?;
        Ok(group)
    }

    pub async fn fetch_groups(&self) -> Result<Vec<Group>> {
        let records = query_as::<_, GroupRecord>(
            "
            SELECT post_groups.group_id, post_groups.title, post_groups.slug, post_groups.description
            FROM post_groups
            ORDER BY post_groups.title, post_groups.group_id
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        let groups = records
            .into_iter()
            .map(Group::try_from)
            .collect::<Result<_, _>>()?;
        Ok(groups)
    }

    pub async fn count_posts(&self, filter: PostFilter) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM posts {}", filter.condition());

        let mut count_query = query_scalar::<_, i64>(&sql);
        if let Some(parameter) = filter.parameter() {
            count_query = count_query.bind(parameter);
        }

        let count = count_query.fetch_one(&self.pool).await?;
        Ok(count.cast_unsigned())
    }

    /// Posts matching `filter`, newest first.
    pub async fn fetch_posts(&self, filter: PostFilter, limit: u32, offset: u64) -> Result<Vec<Post>> {
        let sql = format!(
            "{FULL_POST_SELECT} {} ORDER BY posts.pub_date DESC, posts.post_id DESC LIMIT ? OFFSET ?",
            filter.condition()
        );

        let mut posts_query = query_as::<_, FullPostRecord>(&sql);
        if let Some(parameter) = filter.parameter() {
            posts_query = posts_query.bind(parameter);
        }

        let records = posts_query
            .bind(i64::from(limit))
            .bind(offset.cast_signed())
            .fetch_all(&self.pool)
            .await?;

        let posts = records
            .into_iter()
            .map(Post::try_from)
            .collect::<Result<_, _>>()?;
        Ok(posts)
    }

    pub async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let sql = format!("{FULL_POST_SELECT} WHERE posts.post_id = ?");

        let record = query_as::<_, FullPostRecord>(&sql)
            .bind(post_id.get())
            .fetch_optional(&self.pool)
            .await?;

        let post = record.map(Post::try_from).transpose()?;
        Ok(post)
    }

    pub async fn create_post(
        &self,
        author: Id<UserMarker>,
        content: &PostContent,
    ) -> Result<Id<PostMarker>> {
        let post_id = query_scalar::<_, i64>(
            "
            INSERT INTO posts (text, pub_date, author_id, group_id, image)
            VALUES (?, ?, ?, ?, ?)
            RETURNING post_id
            ",
        )
        .bind(&content.text)
        .bind(now())
        .bind(author.get())
        .bind(content.group.map(Id::get))
        .bind(content.image.as_deref())
        .fetch_one(&self.pool)
        .await?;

        Ok(post_id.into())
    }

    /// Replaces the editable content. The author never changes.
    pub async fn update_post(&self, post_id: Id<PostMarker>, content: &PostContent) -> Result<()> {
        query(
            "
            UPDATE posts
            SET text = ?, group_id = ?, image = ?
            WHERE post_id = ?
            ",
        )
        .bind(&content.text)
        .bind(content.group.map(Id::get))
        .bind(content.image.as_deref())
        .bind(post_id.get())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn count_comments(&self, post_id: Id<PostMarker>) -> Result<u64> {
        let count = query_scalar::<_, i64>("SELECT COUNT(*) FROM comments WHERE post_id = ?")
            .bind(post_id.get())
            .fetch_one(&self.pool)
            .await?;

        Ok(count.cast_unsigned())
    }

    /// Comments on a post, oldest first.
    pub async fn fetch_comments(&self, post_id: Id<PostMarker>) -> Result<Vec<Comment>> {
        let records = query_as::<_, CommentRecord>(
            "
            SELECT
                comments.comment_id,
                comments.post_id,
                users.user_id AS author_id,
                users.username,
                comments.text,
                comments.created
            FROM
                comments
                JOIN users ON users.user_id = comments.author_id
            WHERE
                comments.post_id = ?
            ORDER BY comments.created, comments.comment_id
            ",
        )
        .bind(post_id.get())
        .fetch_all(&self.pool)
        .await?;

        let comments = records
            .into_iter()
            .map(Comment::try_from)
            .collect::<Result<_, _>>()?;
        Ok(comments)
    }

    pub async fn create_comment(&self, comment: &CreateComment) -> Result<Id<CommentMarker>> {
        let comment_id = query_scalar::<_, i64>(
            "
            INSERT INTO comments (post_id, author_id, text, created)
            VALUES (?, ?, ?, ?)
            RETURNING comment_id
            ",
        )
        .bind(comment.post.get())
        .bind(comment.author.get())
        .bind(&comment.text)
        .bind(now())
        .fetch_one(&self.pool)
        .await?;

        Ok(comment_id.into())
    }

    pub async fn is_following(&self, user: Id<UserMarker>, author: Id<UserMarker>) -> Result<bool> {
        let exists = query_scalar::<_, i64>(
            "SELECT EXISTS (SELECT 1 FROM follows WHERE user_id = ? AND author_id = ?)",
        )
        .bind(user.get())
        .bind(author.get())
        .fetch_one(&self.pool)
        .await?;

        Ok(exists != 0)
    }

    /// `false` if the follow already existed.
    pub async fn create_follow(&self, follow: Follow) -> Result<bool> {
        let result = query(
            "
            INSERT INTO follows (user_id, author_id)
            VALUES (?, ?)
            ON CONFLICT (user_id, author_id) DO NOTHING
            ",
        )
        .bind(follow.user.get())
        .bind(follow.author.get())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// `false` if there was nothing to delete.
    pub async fn delete_follow(&self, user: Id<UserMarker>, author: Id<UserMarker>) -> Result<bool> {
        let result = query("DELETE FROM follows WHERE user_id = ? AND author_id = ?")
            .bind(user.get())
            .bind(author.get())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn count_follows(&self) -> Result<u64> {
        let count = query_scalar::<_, i64>("SELECT COUNT(*) FROM follows")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.cast_unsigned())
    }

    pub async fn create_auth(&self, authentication: &Authentication) -> Result<()> {
        let created_at = PrimitiveDateTime::new(
            authentication.created_at.date(),
            authentication.created_at.time(),
        );

        query(
            "
            INSERT INTO auth_tokens (token_hash, user_id, created_at, expires_after_seconds)
            VALUES (?, ?, ?, ?)
            ",
        )
        .bind(authentication.token_hash.0.as_slice())
        .bind(authentication.user.get())
        .bind(created_at)
        .bind(
            authentication
                .expires_after
                .map(|expires_after| expires_after.whole_seconds()),
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn fetch_auth(&self, token_hash: &AuthTokenHash) -> Result<Option<Authentication>> {
        let record = query_as::<_, AuthenticationRecord>(
            "
            SELECT user_id, token_hash, created_at, expires_after_seconds
            FROM auth_tokens
            WHERE token_hash = ?
            ",
        )
        .bind(token_hash.0.as_slice())
        .fetch_optional(&self.pool)
        .await?;

        let authentication = record.map(Authentication::try_from).transpose()?;
        Ok(authentication)
    }

    pub async fn delete_auth(&self, token_hash: &AuthTokenHash) -> Result<()> {
        query("DELETE FROM auth_tokens WHERE token_hash = ?")
            .bind(token_hash.0.as_slice())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::client::{DbClient, PostFilter};
    use yatube_common::model::{
        Id,
        auth::{AuthToken, Authentication},
        comment::CreateComment,
        follow::Follow,
        group::{CreateGroup, Group, GroupSlug},
        post::PostContent,
        user::{CreateUser, User, Username},
    };
    use time::UtcDateTime;
    use yatube_common::util::PositiveDuration;

    async fn client() -> DbClient {
        DbClient::connect("sqlite::memory:").await.unwrap()
    }

    async fn user(db: &DbClient, username: &str) -> User {
        db.create_user(&CreateUser {
            username: Username::new(username.to_owned()).unwrap(),
            password_hash: String::new(),
        })
        .await
        .unwrap()
        .unwrap()
    }

    async fn group(db: &DbClient, slug: &str) -> Group {
        db.create_group(&CreateGroup {
            title: format!("Group {slug}"),
            slug: GroupSlug::new(slug.to_owned()).unwrap(),
            description: String::new(),
        })
        .await
        .unwrap()
        .unwrap()
    }

    fn text(text: &str) -> PostContent {
        PostContent {
            text: text.to_owned(),
            ..PostContent::default()
        }
    }

    #[tokio::test]
    async fn usernames_are_unique() {
        let db = client().await;
        let first = user(&db, "NoName").await;

        let duplicate = db
            .create_user(&CreateUser {
                username: first.username.clone(),
                password_hash: String::new(),
            })
            .await
            .unwrap();
        assert_eq!(duplicate, None);

        assert_eq!(
            db.fetch_user_by_username(&first.username).await.unwrap(),
            Some(first.clone())
        );
        assert_eq!(db.fetch_user(first.id).await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn group_slugs_are_unique() {
        let db = client().await;
        let created = group(&db, "test-slug").await;

        let duplicate = db
            .create_group(&CreateGroup {
                title: "Other".to_owned(),
                slug: created.slug.clone(),
                description: String::new(),
            })
            .await
            .unwrap();
        assert_eq!(duplicate, None);
        assert_eq!(
            db.fetch_group_by_slug(&created.slug).await.unwrap(),
            Some(created)
        );
    }

    #[tokio::test]
    async fn listings_are_newest_first_and_filtered() {
        let db = client().await;
        let author = user(&db, "author").await;
        let other = user(&db, "other").await;
        let group = group(&db, "test-slug").await;

        for i in 0..3 {
            db.create_post(
                author.id,
                &PostContent {
                    text: format!("grouped {i}"),
                    group: Some(group.id),
                    image: None,
                },
            )
            .await
            .unwrap();
        }
        db.create_post(other.id, &text("ungrouped")).await.unwrap();

        assert_eq!(db.count_posts(PostFilter::All).await.unwrap(), 4);
        assert_eq!(db.count_posts(PostFilter::Group(group.id)).await.unwrap(), 3);
        assert_eq!(db.count_posts(PostFilter::Author(other.id)).await.unwrap(), 1);

        let all = db.fetch_posts(PostFilter::All, 10, 0).await.unwrap();
        let texts: Vec<_> = all.iter().map(|post| post.text.as_str()).collect();
        assert_eq!(texts, ["ungrouped", "grouped 2", "grouped 1", "grouped 0"]);
        assert_eq!(all[1].group.as_ref(), Some(&group));
        assert_eq!(all[0].group, None);

        let second_page = db
            .fetch_posts(PostFilter::Group(group.id), 2, 2)
            .await
            .unwrap();
        assert_eq!(second_page.len(), 1);
        assert_eq!(second_page[0].text, "grouped 0");
    }

    #[tokio::test]
    async fn feed_of_followed_authors() {
        let db = client().await;
        let reader = user(&db, "reader").await;
        let followed = user(&db, "followed").await;
        let ignored = user(&db, "ignored").await;

        db.create_post(followed.id, &text("followed post")).await.unwrap();
        db.create_post(ignored.id, &text("ignored post")).await.unwrap();

        let feed = PostFilter::FollowedBy(reader.id);
        assert_eq!(db.count_posts(feed).await.unwrap(), 0);

        assert!(
            db.create_follow(Follow::between(reader.id, followed.id).unwrap())
                .await
                .unwrap()
        );
        let posts = db.fetch_posts(feed, 10, 0).await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].author, followed);
    }

    #[tokio::test]
    async fn follows_are_unique_and_never_self() {
        let db = client().await;
        let reader = user(&db, "reader").await;
        let author = user(&db, "author").await;
        let follow = Follow::between(reader.id, author.id).unwrap();

        assert!(db.create_follow(follow).await.unwrap());
        assert!(!db.create_follow(follow).await.unwrap());
        assert_eq!(db.count_follows().await.unwrap(), 1);
        assert!(db.is_following(reader.id, author.id).await.unwrap());
        assert!(!db.is_following(author.id, reader.id).await.unwrap());

        let self_follow = Follow {
            user: reader.id,
            author: reader.id,
        };
        assert!(db.create_follow(self_follow).await.is_err());

        assert!(db.delete_follow(reader.id, author.id).await.unwrap());
        assert!(!db.delete_follow(reader.id, author.id).await.unwrap());
        assert_eq!(db.count_follows().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn edits_keep_the_author() {
        let db = client().await;
        let author = user(&db, "author").await;
        let group = group(&db, "test-slug").await;
        let post_id = db.create_post(author.id, &text("before")).await.unwrap();

        db.update_post(
            post_id,
            &PostContent {
                text: "after".to_owned(),
                group: Some(group.id),
                image: Some("posts/small.gif".to_owned()),
            },
        )
        .await
        .unwrap();

        let post = db.fetch_post(post_id).await.unwrap().unwrap();
        assert_eq!(post.text, "after");
        assert_eq!(post.author, author);
        assert_eq!(post.group, Some(group));
        assert_eq!(post.image.as_deref(), Some("posts/small.gif"));

        assert_eq!(db.fetch_post(Id::new(post_id.get() + 1)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn comments_oldest_first() {
        let db = client().await;
        let author = user(&db, "author").await;
        let post_id = db.create_post(author.id, &text("post")).await.unwrap();

        for text in ["first", "second"] {
            db.create_comment(&CreateComment {
                post: post_id,
                author: author.id,
                text: text.to_owned(),
            })
            .await
            .unwrap();
        }

        let comments = db.fetch_comments(post_id).await.unwrap();
        let texts: Vec<_> = comments.iter().map(|comment| comment.text.as_str()).collect();
        assert_eq!(texts, ["first", "second"]);
        assert_eq!(comments[0].author, author);
        assert_eq!(db.count_comments(post_id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn auth_tokens() {
        let db = client().await;
        let user = user(&db, "NoName").await;
        let token = AuthToken::generate_random(user.id);
        let token_hash = token.hash().unwrap();

        db.create_auth(&Authentication {
            user: user.id,
            token_hash: token_hash.clone(),
            created_at: UtcDateTime::now(),
            expires_after: PositiveDuration::from_seconds(60),
        })
        .await
        .unwrap();

        let stored = db.fetch_auth(&token_hash).await.unwrap().unwrap();
        assert_eq!(stored.user, user.id);
        assert_eq!(stored.expires_after, PositiveDuration::from_seconds(60));

        db.delete_auth(&token_hash).await.unwrap();
        assert_eq!(db.fetch_auth(&token_hash).await.unwrap(), None);
    }
}
