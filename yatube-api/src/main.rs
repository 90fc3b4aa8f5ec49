use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use yatube_api::{
    config::Env,
    server::{self, ServerState},
};
use yatube_common::model::group::CreateGroup;
use yatube_db::client::{DbClient, DbError};

#[derive(Debug, Error)]
enum InitError {
    #[error("Error parsing .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("Error parsing environment: {0}")]
    Envy(#[from] envy::Error),
    #[error("Error setting up database: {0}")]
    Database(#[from] DbError),
    #[error("Error reading groups fixture {0}: {1}")]
    FixtureRead(PathBuf, std::io::Error),
    #[error("Error parsing groups fixture {0}: {1}")]
    FixtureParse(PathBuf, serde_json::Error),
    #[error("Error binding tcp listener: {0}")]
    TcpBind(std::io::Error),
    #[error("Error serving server: {0}")]
    TcpServe(std::io::Error),
}

fn install_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "yatube_api=debug,\
                yatube_db=debug,\
                tower_http=debug,axum::rejection=trace,sqlx=warn"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn get_env() -> Result<Env, InitError> {
    if let Err(e) = dotenvy::dotenv() {
        if e.not_found() {
            debug!("No .dotenv file found");
        } else {
            return Err(e.into());
        }
    }

    envy::from_env().map_err(InitError::from)
}

/// Creates the fixture's groups. Slugs that already exist are left alone.
async fn load_groups(db: &DbClient, path: &Path) -> Result<(), InitError> {
    let contents = tokio::fs::read(path)
        .await
        .map_err(|err| InitError::FixtureRead(path.to_owned(), err))?;
    let groups: Vec<CreateGroup> = serde_json::from_slice(&contents)
        .map_err(|err| InitError::FixtureParse(path.to_owned(), err))?;

    for group in &groups {
        match db.create_group(group).await? {
            Some(created) => info!(slug = %created.slug.get(), "Created group"),
            None => debug!(slug = %group.slug.get(), "Group already exists"),
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Listening for shutdown signal failed");
    }
    info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<(), InitError> {
    install_tracing();
    let env = get_env()?;

    let db_client = DbClient::connect(&env.database_url).await?;
    if let Some(fixture) = &env.groups_fixture {
        load_groups(&db_client, fixture).await?;
    }

    let app = server::app(ServerState::new(db_client, &env));

    let server_address = SocketAddr::new(env.server_address, env.server_port);
    let listener = tokio::net::TcpListener::bind(server_address)
        .await
        .map_err(InitError::TcpBind)?;
    info!(%server_address, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(InitError::TcpServe)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::{InitError, load_groups};
    use std::{io::Write, path::Path};
    use tempfile::NamedTempFile;
    use yatube_common::model::group::GroupSlug;
    use yatube_db::client::DbClient;

    fn fixture(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    async fn slug_exists(db: &DbClient, slug: &str) -> bool {
        let slug = GroupSlug::new(slug.to_owned()).unwrap();
        db.fetch_group_by_slug(&slug).await.unwrap().is_some()
    }

    #[tokio::test]
    async fn loading_twice_keeps_one_group_per_slug() {
        let db = DbClient::connect("sqlite::memory:").await.unwrap();
        let file = fixture(
            r#"[
                {"title": "Cats", "slug": "cats", "description": "All about cats"},
                {"title": "Dogs", "slug": "dogs"}
            ]"#,
        );

        load_groups(&db, file.path()).await.unwrap();
        load_groups(&db, file.path()).await.unwrap();

        let groups = db.fetch_groups().await.unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].title, "Cats");
        assert_eq!(groups[0].description, "All about cats");
        assert!(slug_exists(&db, "dogs").await);
    }

    #[tokio::test]
    async fn invalid_groups_are_rejected() {
        let db = DbClient::connect("sqlite::memory:").await.unwrap();
        let long_title = "x".repeat(201);

        for contents in [
            r#"[{"title": "Spaces", "slug": "not a slug"}]"#.to_owned(),
            format!(r#"[{{"title": "{long_title}", "slug": "long"}}]"#),
            "not json".to_owned(),
        ] {
            let file = fixture(&contents);
            let result = load_groups(&db, file.path()).await;
            assert!(matches!(result, Err(InitError::FixtureParse(..))), "{contents}");
        }
        assert!(db.fetch_groups().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_fixture_file() {
        let db = DbClient::connect("sqlite::memory:").await.unwrap();

        let result = load_groups(&db, Path::new("/nonexistent/groups.json")).await;
        assert!(matches!(result, Err(InitError::FixtureRead(..))));
    }
}
