//! Uploaded images on disk, served back under `/media`.

use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, warn};
use yatube_common::form::ValidImage;

/// Directory inside the media root that post images are stored in.
pub const POST_IMAGE_DIR: &str = "posts";

const MAX_NAME_ATTEMPTS: usize = 8;

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes the image and returns its path relative to the media root, e.g. `posts/cat.gif`.
    ///
    /// Existing files are never overwritten: a clashing name gets a random suffix.
    pub async fn save(&self, image: &ValidImage) -> io::Result<String> {
        let dir = self.root.join(POST_IMAGE_DIR);
        fs::create_dir_all(&dir).await?;

        let stem = file_stem(&image.file_name);
        let extension = image.kind.extension();

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let name = if attempt == 0 {
                format!("{stem}.{extension}")
            } else {
                let suffix: u32 = rand::random();
                format!("{stem}_{suffix:08x}.{extension}")
            };

            let mut file = match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(dir.join(&name))
                .await
            {
                Ok(file) => file,
                Err(err) if err.kind() == ErrorKind::AlreadyExists => continue,
                Err(err) => return Err(err),
            };

            let relative = format!("{POST_IMAGE_DIR}/{name}");
            if let Err(err) = write_contents(&mut file, &image.bytes).await {
                drop(file);
                self.remove(&relative).await;
                return Err(err);
            }

            debug!(path = %relative, size = image.bytes.len(), "Stored uploaded image");
            return Ok(relative);
        }

        Err(io::Error::new(
            ErrorKind::AlreadyExists,
            "no free file name for uploaded image",
        ))
    }

    /// Stores `image` (if any) and hands its path to `write`.
    ///
    /// When `write` fails the stored file is removed again, so no file outlives a failed
    /// database write.
    pub async fn save_with<T, E, F, Fut>(&self, image: Option<&ValidImage>, write: F) -> Result<T, E>
    where
        E: From<io::Error>,
        F: FnOnce(Option<String>) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let stored = match image {
            Some(image) => Some(self.save(image).await?),
            None => None,
        };

        let result = write(stored.clone()).await;
        if let (Err(_), Some(path)) = (&result, &stored) {
            self.remove(path).await;
        }

        result
    }

    /// Deletes a stored file given its path relative to the media root.
    pub async fn remove(&self, relative: &str) {
        match fs::remove_file(self.root.join(relative)).await {
            Ok(()) => debug!(path = %relative, "Removed stored image"),
            Err(err) => warn!(path = %relative, "Error removing stored image: {err}"),
        }
    }
}

async fn write_contents(file: &mut fs::File, bytes: &[u8]) -> io::Result<()> {
    file.write_all(bytes).await?;
    file.flush().await
}

/// Reduces an uploaded file name to a safe stem. The client's extension is discarded.
fn file_stem(file_name: &str) -> String {
    // Browsers on Windows may send the full client path.
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or_default();

    let stem = match base.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => base,
    };

    let stem: String = stem
        .chars()
        .map(|c| match c {
            c if c.is_ascii_alphanumeric() || c == '-' || c == '_' => c,
            _ => '_',
        })
        .take(100)
        .collect();

    if stem.trim_matches('_').is_empty() {
        "image".to_owned()
    } else {
        stem
    }
}

#[cfg(test)]
mod tests {
    use crate::server::media::{MediaStore, file_stem};
    use std::io;
    use yatube_common::form::{ImageKind, ValidImage};

    fn gif(file_name: &str) -> ValidImage {
        ValidImage {
            file_name: file_name.to_owned(),
            kind: ImageKind::Gif,
            bytes: b"GIF89a\x01\x00\x01\x00".to_vec(),
        }
    }

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(file_stem("small.gif"), "small");
        assert_eq!(file_stem("C:\\Users\\me\\My Cat.JPG"), "My_Cat");
        assert_eq!(file_stem("../../etc/passwd"), "passwd");
        assert_eq!(file_stem("page.tar.html"), "page_tar");
        assert_eq!(file_stem(".html"), "_html");
        assert_eq!(file_stem(""), "image");
        assert_eq!(file_stem("%%%.png"), "image");
    }

    #[tokio::test]
    async fn extension_follows_image_kind() {
        let root = tempfile::tempdir().unwrap();
        let store = MediaStore::new(root.path().to_owned());

        assert_eq!(store.save(&gif("evil.html")).await.unwrap(), "posts/evil.gif");
        assert_eq!(store.save(&gif("photo.png")).await.unwrap(), "posts/photo.gif");
        assert_eq!(store.save(&gif("noext")).await.unwrap(), "posts/noext.gif");

        let jpeg = ValidImage {
            kind: ImageKind::Jpeg,
            ..gif("holiday.JPEG")
        };
        assert_eq!(store.save(&jpeg).await.unwrap(), "posts/holiday.jpg");

        assert!(!root.path().join("posts/evil.html").exists());
    }

    #[tokio::test]
    async fn clashing_names_get_a_suffix() {
        let root = tempfile::tempdir().unwrap();
        let store = MediaStore::new(root.path().to_owned());

        let first = store.save(&gif("small.gif")).await.unwrap();
        let second = store.save(&gif("small.gif")).await.unwrap();

        assert_eq!(first, "posts/small.gif");
        assert_ne!(first, second);
        assert!(second.starts_with("posts/small_"));
        assert!(second.ends_with(".gif"));

        let stored = std::fs::read(root.path().join(&second)).unwrap();
        assert_eq!(stored, gif("small.gif").bytes);
    }

    #[tokio::test]
    async fn failed_write_removes_stored_image() {
        let root = tempfile::tempdir().unwrap();
        let store = MediaStore::new(root.path().to_owned());

        let result: io::Result<()> = store
            .save_with(Some(&gif("small.gif")), |path| async move {
                assert_eq!(path.as_deref(), Some("posts/small.gif"));
                Err(io::Error::other("database unavailable"))
            })
            .await;

        assert!(result.is_err());
        assert!(!root.path().join("posts/small.gif").exists());
    }

    #[tokio::test]
    async fn successful_write_keeps_stored_image() {
        let root = tempfile::tempdir().unwrap();
        let store = MediaStore::new(root.path().to_owned());

        let saved = store
            .save_with(Some(&gif("small.gif")), |path| async move {
                Ok::<_, io::Error>(path)
            })
            .await
            .unwrap();

        assert_eq!(saved.as_deref(), Some("posts/small.gif"));
        assert!(root.path().join("posts/small.gif").exists());

        let nothing = store
            .save_with(None, |path| async move { Ok::<_, io::Error>(path) })
            .await
            .unwrap();
        assert_eq!(nothing, None);
    }
}
