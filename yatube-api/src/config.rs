use serde::Deserialize;
use std::{
    net::{IpAddr, Ipv4Addr},
    num::NonZeroU32,
    path::PathBuf,
};
use yatube_common::pagination::DEFAULT_PER_PAGE;

/// Settings read from the environment, e.g. `SERVER_PORT=8000`.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
pub struct Env {
    #[serde(default = "default_server_address")]
    pub server_address: IpAddr,
    #[serde(default = "default_server_port")]
    pub server_port: u16,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_media_root")]
    pub media_root: PathBuf,
    /// Posts per listing page.
    #[serde(default = "default_posts_count")]
    pub posts_count: NonZeroU32,
    #[serde(default = "default_index_cache_seconds")]
    pub index_cache_seconds: u64,
    /// Zero or less keeps sessions forever.
    #[serde(default = "default_session_ttl_seconds")]
    pub session_ttl_seconds: i64,
    /// JSON array of groups created at start-up.
    pub groups_fixture: Option<PathBuf>,
}

fn default_server_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

fn default_server_port() -> u16 {
    8000
}

fn default_database_url() -> String {
    "sqlite:yatube.db?mode=rwc".to_owned()
}

fn default_media_root() -> PathBuf {
    PathBuf::from("media")
}

fn default_posts_count() -> NonZeroU32 {
    DEFAULT_PER_PAGE
}

fn default_index_cache_seconds() -> u64 {
    20
}

fn default_session_ttl_seconds() -> i64 {
    1_209_600
}

#[cfg(test)]
mod tests {
    use crate::config::Env;
    use std::path::PathBuf;

    #[test]
    fn defaults_fill_missing_variables() {
        let env: Env = envy::from_iter([("SERVER_PORT".to_owned(), "9000".to_owned())]).unwrap();

        assert_eq!(env.server_port, 9000);
        assert_eq!(env.posts_count.get(), 10);
        assert_eq!(env.index_cache_seconds, 20);
        assert_eq!(env.media_root, PathBuf::from("media"));
        assert_eq!(env.groups_fixture, None);
    }

    #[test]
    fn overrides() {
        let env: Env = envy::from_iter([
            ("POSTS_COUNT".to_owned(), "5".to_owned()),
            ("GROUPS_FIXTURE".to_owned(), "groups.json".to_owned()),
            ("DATABASE_URL".to_owned(), "sqlite::memory:".to_owned()),
        ])
        .unwrap();

        assert_eq!(env.posts_count.get(), 5);
        assert_eq!(env.groups_fixture, Some(PathBuf::from("groups.json")));
        assert_eq!(env.database_url, "sqlite::memory:");
    }

    #[test]
    fn page_size_must_be_positive() {
        let env = envy::from_iter::<_, Env>([("POSTS_COUNT".to_owned(), "0".to_owned())]);
        assert!(env.is_err());
    }
}
