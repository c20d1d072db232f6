use crate::error::AppError;
use crate::models::{Album, PhotoEntry};
use crate::naming;
use crate::service::PhotoService;
use crate::transfer::{self, BatchReport};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};

pub type DownloadReport = BatchReport<PhotoEntry, PathBuf, AppError>;

/// Local copy of one remote album.
#[derive(Debug)]
pub struct MaterializedAlbum {
    /// Directory actually used, which differs from `base/title` after a
    /// collision.
    pub path: PathBuf,
    pub report: DownloadReport,
}

pub async fn materialize(
    service: &Arc<dyn PhotoService>,
    user: &str,
    album: &Album,
    destination_base: &Path,
) -> Result<MaterializedAlbum, AppError> {
    let album_path = naming::resolve(destination_base, &naming::sanitize_component(&album.title));

    tokio::fs::create_dir_all(&album_path)
        .await
        .map_err(|e| AppError::filesystem(&album_path, e))?;
    log::info!("Created album directory {:?} for album '{}'", album_path, album.title);

    let photos = service.list_photos(user, &album.id).await?;
    log::debug!("Album '{}' has {} photos", album.title, photos.len());

    let report = transfer::transfer(photos, |entry: &PhotoEntry| {
        let service = Arc::clone(service);
        let album_path = album_path.clone();
        let entry = entry.clone();

        async move { download_photo(service.as_ref(), &album_path, &entry).await }
    })
    .await;

    Ok(MaterializedAlbum {
        path: album_path,
        report,
    })
}

async fn download_photo(service: &dyn PhotoService, album_path: &Path, entry: &PhotoEntry) -> Result<PathBuf, AppError> {
    let bytes = service.download_photo(&entry.content_url).await?;

    let file_name = naming::with_inferred_extension(&naming::sanitize_component(&entry.title), &entry.content_type);
    let photo_path = naming::resolve(album_path, &file_name);

    println!("Downloading {} to {}", entry.title, photo_path.display());

    let file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&photo_path)
        .await
        .map_err(|e| AppError::filesystem(&photo_path, e))?;

    write_or_remove(file, &photo_path, &bytes).await?;
    log::trace!("Wrote {} bytes to {:?}", bytes.len(), photo_path);

    Ok(photo_path)
}

/// Writes `bytes` to the freshly created `path`, removing it again when the
/// write fails so no truncated photo is left behind.
async fn write_or_remove<W>(mut file: W, path: &Path, bytes: &[u8]) -> Result<(), AppError>
where
    W: AsyncWrite + Unpin,
{
    let written = match file.write_all(bytes).await {
        Ok(()) => file.flush().await,
        Err(e) => Err(e),
    };

    if let Err(e) = written {
        drop(file);

        if let Err(remove) = tokio::fs::remove_file(path).await {
            log::warn!("Failed to remove partial download {:?}: {}", path, remove);
        }

        return Err(AppError::filesystem(path, e));
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::{album, photo, MockService, ScratchDir};
    use crate::transfer::TransferOutcome;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    /// Accepts a few bytes, then fails like a full disk.
    struct FullDisk {
        room: usize,
    }

    impl AsyncWrite for FullDisk {
        fn poll_write(mut self: Pin<&mut Self>, _: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
            if self.room == 0 {
                return Poll::Ready(Err(io::Error::new(io::ErrorKind::Other, "no space left on device")));
            }

            let n = buf.len().min(self.room);
            self.room -= n;
            Poll::Ready(Ok(n))
        }

        fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn albums_with_equal_titles_get_distinct_directories() {
        let scratch = ScratchDir::new("materialize-trip");
        let service: Arc<dyn PhotoService> = Arc::new(
            MockService::default()
                .with_album(album("1", "Trip"), vec![(photo("p1", "beach.jpg", "image/jpeg"), Some("one"))])
                .with_album(album("2", "Trip"), vec![(photo("p2", "beach.jpg", "image/jpeg"), Some("two"))]),
        );
        let albums = service.list_albums("default").await.unwrap();

        let first = materialize(&service, "default", &albums[0], scratch.path()).await.unwrap();
        let second = materialize(&service, "default", &albums[1], scratch.path()).await.unwrap();

        assert_eq!(first.path, scratch.path().join("Trip"));
        assert_eq!(second.path, scratch.path().join("Trip-1"));
        assert_eq!(std::fs::read_to_string(first.path.join("beach.jpg")).unwrap(), "one");
        assert_eq!(std::fs::read_to_string(second.path.join("beach.jpg")).unwrap(), "two");
    }

    #[tokio::test]
    async fn photos_with_equal_titles_and_missing_extensions() {
        let scratch = ScratchDir::new("materialize-photos");
        let service: Arc<dyn PhotoService> = Arc::new(MockService::default().with_album(
            album("1", "Party"),
            vec![
                (photo("p1", "cake", "image/png"), Some("first")),
                (photo("p2", "cake", "image/png"), Some("second")),
                (photo("p3", "cake.png", "image/png"), Some("third")),
            ],
        ));
        let albums = service.list_albums("default").await.unwrap();

        let result = materialize(&service, "default", &albums[0], scratch.path()).await.unwrap();

        let written: Vec<PathBuf> = result
            .report
            .outcomes()
            .iter()
            .map(|outcome| match outcome {
                TransferOutcome::Succeeded { output, .. } => output.clone(),
                TransferOutcome::Failed { error, .. } => panic!("unexpected failure: {}", error),
            })
            .collect();

        assert_eq!(
            written,
            vec![
                result.path.join("cake.png"),
                result.path.join("cake.png-1"),
                result.path.join("cake.png-2"),
            ]
        );
        assert_eq!(std::fs::read_to_string(result.path.join("cake.png-1")).unwrap(), "second");
    }

    #[tokio::test]
    async fn failed_download_does_not_stop_the_album() {
        let scratch = ScratchDir::new("materialize-partial");
        let service: Arc<dyn PhotoService> = Arc::new(MockService::default().with_album(
            album("1", "Zoo"),
            vec![
                (photo("p1", "lion.jpg", "image/jpeg"), Some("lion")),
                (photo("p2", "tiger.jpg", "image/jpeg"), None),
                (photo("p3", "bear.jpg", "image/jpeg"), Some("bear")),
            ],
        ));
        let albums = service.list_albums("default").await.unwrap();

        let result = materialize(&service, "default", &albums[0], scratch.path()).await.unwrap();

        assert_eq!(result.report.len(), 3);
        assert!(!result.report.outcomes()[1].is_success());
        assert!(result.path.join("lion.jpg").exists());
        assert!(!result.path.join("tiger.jpg").exists());
        assert!(result.path.join("bear.jpg").exists());
    }

    #[tokio::test]
    async fn failed_write_leaves_no_partial_file() {
        let scratch = ScratchDir::new("materialize-full-disk");
        let path = scratch.path().join("beach.jpg");
        std::fs::write(&path, b"be").unwrap();

        let result = write_or_remove(FullDisk { room: 2 }, &path, b"beach bytes").await;

        assert!(matches!(result, Err(AppError::Filesystem { .. })));
        assert!(!path.exists());
        assert_eq!(naming::resolve(scratch.path(), "beach.jpg"), path);
    }

    #[tokio::test]
    async fn completed_write_keeps_the_file() {
        let scratch = ScratchDir::new("materialize-write");
        let path = scratch.path().join("beach.jpg");
        let file = tokio::fs::File::create(&path).await.unwrap();

        write_or_remove(file, &path, b"beach bytes").await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"beach bytes");
    }

    #[tokio::test]
    async fn unwritable_base_is_a_filesystem_error() {
        let scratch = ScratchDir::new("materialize-unwritable");
        let blocker = scratch.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let service: Arc<dyn PhotoService> = Arc::new(MockService::default().with_album(album("1", "Trip"), vec![]));
        let albums = service.list_albums("default").await.unwrap();

        let result = materialize(&service, "default", &albums[0], &blocker.join("nested")).await;

        assert!(matches!(result, Err(AppError::Filesystem { .. })));
    }
}
