use crate::error::{AuthError, RemoteServiceError};
use crate::models::{Album, Credentials, Event, NewAlbum, PhotoEntry};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::path::Path;

#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> Result<(), AuthError>;
}

#[async_trait]
pub trait PhotoService: Authenticator {
    async fn list_albums(&self, user: &str) -> Result<Vec<Album>, RemoteServiceError>;
    async fn list_photos(&self, user: &str, album_id: &str) -> Result<Vec<PhotoEntry>, RemoteServiceError>;
    async fn create_album(&self, album: NewAlbum) -> Result<Album, RemoteServiceError>;
    async fn delete_album(&self, album_id: &str) -> Result<(), RemoteServiceError>;
    async fn upload_photo(&self, album_id: &str, path: &Path, tags: &str) -> Result<PhotoEntry, RemoteServiceError>;
    async fn download_photo(&self, content_url: &str) -> Result<Vec<u8>, RemoteServiceError>;
}

/// Filter sent along with an event listing.
///
/// `start_min` is inclusive and `start_max` exclusive. `text` is matched
/// against event titles and content.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventQuery {
    pub text: Option<String>,
    pub start_min: Option<NaiveDate>,
    pub start_max: Option<NaiveDate>,
}

#[async_trait]
pub trait CalendarService: Authenticator {
    async fn quick_add_event(&self, text: &str) -> Result<Event, RemoteServiceError>;
    async fn list_events(&self, query: &EventQuery) -> Result<Vec<Event>, RemoteServiceError>;
    async fn delete_event(&self, event_id: &str) -> Result<(), RemoteServiceError>;
}
