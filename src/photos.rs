use crate::error::{AppError, AuthError};
use crate::matching::TitleMatcher;
use crate::materialize::{self, MaterializedAlbum};
use crate::models::{Access, Album, NewAlbum, PhotoEntry};
use crate::prompt::{Confirmation, DeletePolicy, Prompter};
use crate::service::PhotoService;
use crate::session::{LoginRequest, Session};
use crate::transfer::{self, BatchReport};
use chrono::{Local, NaiveDate, TimeZone};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const ALBUM_DATE_FORMAT: &str = "%m/%d/%Y";

pub type UploadReport = BatchReport<PathBuf, PhotoEntry, AppError>;

#[derive(Debug, Clone, Default)]
pub struct PhotosOptions {
    pub prompt_for_tags: bool,
    pub prompt_for_delete: bool,
    pub allowed_extensions: HashSet<String>,
    /// Treat album titles given to listings as regular expressions.
    pub use_regex: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CreateAlbum {
    pub title: String,
    pub summary: String,
    /// `MM/DD/YYYY`
    pub date: Option<String>,
    pub access: Access,
    pub photos: Vec<PathBuf>,
    pub tags: String,
}

/// Result of materializing one album out of a download run.
#[derive(Debug)]
pub struct AlbumDownload {
    pub album: Album,
    pub result: Result<MaterializedAlbum, AppError>,
}

pub struct PhotosClient {
    service: Arc<dyn PhotoService>,
    prompter: Box<dyn Prompter>,
    options: PhotosOptions,
    session: Session,
}

impl PhotosClient {
    pub fn new(service: Arc<dyn PhotoService>, prompter: Box<dyn Prompter>, options: PhotosOptions) -> Self {
        Self {
            service,
            prompter,
            options,
            session: Session::default(),
        }
    }

    pub async fn login(&mut self, request: &LoginRequest) -> Result<(), AuthError> {
        self.session.login(self.service.as_ref(), request).await
    }

    /// Email of the logged in account.
    pub fn account(&self) -> Option<&str> {
        self.session.email()
    }

    /// Albums of `user`, only those whose title matches `title` when given.
    pub async fn get_albums(&self, user: &str, title: Option<&str>) -> Result<Vec<Album>, AppError> {
        self.session.require()?;

        let matcher = title
            .map(|title| TitleMatcher::new(title, self.options.use_regex))
            .transpose()?;
        let albums = self.service.list_albums(user).await?;
        log::debug!("User {} has {} albums", user, albums.len());

        Ok(match matcher {
            Some(matcher) => albums.into_iter().filter(|a| matcher.matches(&a.title)).collect(),
            None => albums,
        })
    }

    pub async fn create_album(&mut self, request: CreateAlbum) -> Result<(Album, Option<UploadReport>), AppError> {
        self.session.require()?;

        let timestamp = match request.date.as_deref() {
            Some(date) if !date.trim().is_empty() => Some(album_timestamp(date)?),
            _ => None,
        };

        let album = self
            .service
            .create_album(NewAlbum {
                title: request.title,
                summary: request.summary,
                access: request.access,
                timestamp,
            })
            .await?;
        log::info!("Created album '{}' ({})", album.title, album.id);

        let report = if request.photos.is_empty() {
            None
        } else {
            Some(self.insert_photos(&album, &request.photos, &request.tags).await?)
        };

        Ok((album, report))
    }

    /// Uploads every photo into `album`, one at a time.
    pub async fn insert_photos(&mut self, album: &Album, photos: &[PathBuf], tags: &str) -> Result<UploadReport, AppError> {
        self.session.require()?;

        let files = crate::uploads::collect_uploads(photos, &self.options.allowed_extensions)?;
        let prompt_for_tags = tags.is_empty() && self.options.prompt_for_tags;
        let service = &self.service;
        let prompter = &mut self.prompter;

        let report = transfer::transfer(files, |file: &PathBuf| {
            let keywords = if prompt_for_tags {
                prompter.ask(&format!("Enter tags for photo {}: ", file.display()))
            } else {
                tags.to_owned()
            };

            println!("Loading file {} to album {}", file.display(), album.title);

            let service = Arc::clone(service);
            let album_id = album.id.clone();
            let file = file.clone();

            async move {
                service
                    .upload_photo(&album_id, &file, &keywords)
                    .await
                    .map_err(AppError::from)
            }
        })
        .await;

        for (file, error) in report.failures() {
            println!("Failed to upload {}. ({})", file.display(), error);
        }

        Ok(report)
    }

    /// Uploads into every album titled `title`.
    pub async fn post_photos(
        &mut self,
        user: &str,
        title: &str,
        photos: &[PathBuf],
        tags: &str,
    ) -> Result<Vec<(Album, UploadReport)>, AppError> {
        let albums = self.get_albums(user, Some(title)).await?;

        if albums.is_empty() {
            println!("No albums with title {}", title);
        }

        let mut reports = Vec::with_capacity(albums.len());

        for album in albums {
            let report = self.insert_photos(&album, photos, tags).await?;
            reports.push((album, report));
        }

        Ok(reports)
    }

    /// Deletes the albums titled `title` that get confirmed.
    pub async fn delete_albums(&mut self, title: &str, delete_default: bool) -> Result<Vec<(Album, Confirmation)>, AppError> {
        let albums = self.get_albums("default", Some(title)).await?;

        if albums.is_empty() {
            println!("No albums with title {}", title);
        }

        let policy = DeletePolicy {
            prompt: self.options.prompt_for_delete,
            default_confirm: delete_default,
        };
        let mut decisions = Vec::with_capacity(albums.len());

        for album in albums {
            let question = format!("Are you SURE you want to delete album {}?", album.title);
            let decision = Confirmation::Pending.decide(policy, &question, self.prompter.as_mut());

            if decision == Confirmation::Confirmed {
                self.service.delete_album(&album.id).await?;
                log::info!("Deleted album '{}' ({})", album.title, album.id);
            } else {
                log::debug!("Keeping album '{}' ({})", album.title, album.id);
            }

            decisions.push((album, decision));
        }

        Ok(decisions)
    }

    /// Copies the matching albums into `base_path/<album title>`.
    ///
    /// A failing album is recorded and the remaining ones still download.
    pub async fn download_albums(&self, base_path: &Path, user: &str, title: Option<&str>) -> Result<Vec<AlbumDownload>, AppError> {
        let albums = self.get_albums(user, title).await?;

        if albums.is_empty() {
            match title {
                Some(title) => println!("No albums with title {}", title),
                None => println!("No albums found for user {}", user),
            }
        }

        let mut downloads = Vec::with_capacity(albums.len());

        for album in albums {
            let result = materialize::materialize(&self.service, user, &album, base_path).await;

            if let Err(e) = &result {
                log::error!("Failed to download album '{}': {}", album.title, e);
            }

            downloads.push(AlbumDownload { album, result });
        }

        Ok(downloads)
    }
}

/// Milliseconds since the epoch of local midnight on `date` (`MM/DD/YYYY`).
pub fn album_timestamp(date: &str) -> Result<i64, AppError> {
    let invalid = || AppError::InvalidDate(date.to_owned(), "MM/DD/YYYY");

    let day = NaiveDate::parse_from_str(date.trim(), ALBUM_DATE_FORMAT).map_err(|_| invalid())?;
    let midnight = day.and_hms_opt(0, 0, 0).ok_or_else(invalid)?;

    Local
        .from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.timestamp_millis())
        .ok_or_else(invalid)
}
