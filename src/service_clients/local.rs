use crate::config::AppConfig;
use crate::error::{AuthError, RemoteServiceError};
use crate::models::{Album, Credentials, Event, NewAlbum, PhotoEntry};
use crate::service::{Authenticator, CalendarService, EventQuery, PhotoService};
use async_trait::async_trait;
use chrono::{Duration, Local, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use url::Url;

const ACCOUNT_FILE: &str = "account.json";
const MAX_FAILED_LOGINS: u32 = 3;

/// Photo and calendar store kept in a local directory.
pub struct LocalStore {
    root: PathBuf,
    max_upload_bytes: u64,
    session: Mutex<Option<String>>,
    failed_logins: AtomicU32,
}

impl LocalStore {
    pub fn new(config: &AppConfig) -> Result<Self, std::io::Error> {
        Self::open(&config.store_directory, config.max_upload_bytes)
    }

    pub fn open(root: impl AsRef<Path>, max_upload_bytes: u64) -> Result<Self, std::io::Error> {
        let root = root.as_ref();
        log::debug!("Opening local store at {:?}", root);

        std::fs::create_dir_all(root.join("blobs"))?;
        std::fs::create_dir_all(root.join("users"))?;

        Ok(Self {
            root: root.to_path_buf(),
            max_upload_bytes,
            session: Mutex::new(None),
            failed_logins: AtomicU32::new(0),
        })
    }

    fn session_email(&self) -> Option<String> {
        self.session.lock().ok().and_then(|s| s.clone())
    }

    /// Directory of `user`. `default` is the logged in account.
    fn user_dir(&self, user: &str) -> Result<PathBuf, RemoteServiceError> {
        let email = self.session_email().ok_or(RemoteServiceError::Unauthorized)?;
        let user = if user == "default" { email.as_str() } else { user };

        if user.is_empty() || user.contains(|c: char| c == '/' || c == '\\') || user == "." || user == ".." {
            return Err(RemoteServiceError::NotFound(format!("user {}", user)));
        }

        Ok(self.root.join("users").join(user))
    }

    fn own_dir(&self) -> Result<PathBuf, RemoteServiceError> {
        self.user_dir("default")
    }

    fn album_dir(user_dir: &Path, album_id: &str) -> PathBuf {
        user_dir.join("albums").join(album_id)
    }

    fn blob_path(&self, hash: &str) -> PathBuf {
        self.root.join("blobs").join(hash)
    }
}

async fn read_manifest<T>(path: &Path) -> Result<Vec<T>, RemoteServiceError>
where
    T: DeserializeOwned,
{
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

async fn write_manifest<T>(path: &Path, entries: &[T]) -> Result<(), RemoteServiceError>
where
    T: Serialize,
{
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let bytes = serde_json::to_vec_pretty(entries)?;
    tokio::fs::write(path, bytes).await?;

    log::trace!("Wrote manifest {:?}", path);
    Ok(())
}

fn next_id<'a>(ids: impl Iterator<Item = &'a String>) -> String {
    let highest = ids.filter_map(|id| id.parse::<u64>().ok()).max().unwrap_or(0);

    (highest + 1).to_string()
}

fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[async_trait]
impl Authenticator for LocalStore {
    async fn login(&self, credentials: &Credentials) -> Result<(), AuthError> {
        let account_path = self.root.join(ACCOUNT_FILE);

        let registered = match tokio::fs::read(&account_path).await {
            Ok(bytes) => serde_json::from_slice::<Credentials>(&bytes).map_err(|e| AuthError::MalformedCredentials {
                path: account_path.clone(),
                reason: e.to_string(),
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No account registered in store. Registering {}", credentials.email);
                let bytes = serde_json::to_vec_pretty(credentials).map_err(|e| AuthError::MalformedCredentials {
                    path: account_path.clone(),
                    reason: e.to_string(),
                })?;
                tokio::fs::write(&account_path, bytes).await.map_err(|e| AuthError::MalformedCredentials {
                    path: account_path.clone(),
                    reason: e.to_string(),
                })?;
                credentials.clone()
            }
            Err(e) => {
                return Err(AuthError::MalformedCredentials {
                    path: account_path,
                    reason: e.to_string(),
                })
            }
        };

        if self.failed_logins.load(Ordering::SeqCst) >= MAX_FAILED_LOGINS {
            return Err(AuthError::CaptchaRequired);
        }

        if &registered != credentials {
            let failed = self.failed_logins.fetch_add(1, Ordering::SeqCst) + 1;
            log::warn!("Failed login {} for {}", failed, credentials.email);

            return if failed >= MAX_FAILED_LOGINS {
                Err(AuthError::CaptchaRequired)
            } else {
                Err(AuthError::BadAuthentication(credentials.email.clone()))
            };
        }

        self.failed_logins.store(0, Ordering::SeqCst);

        if let Ok(mut session) = self.session.lock() {
            *session = Some(credentials.email.clone());
        }

        Ok(())
    }
}

#[async_trait]
impl PhotoService for LocalStore {
    async fn list_albums(&self, user: &str) -> Result<Vec<Album>, RemoteServiceError> {
        let user_dir = self.user_dir(user)?;

        read_manifest(&user_dir.join("albums.json")).await
    }

    async fn list_photos(&self, user: &str, album_id: &str) -> Result<Vec<PhotoEntry>, RemoteServiceError> {
        let user_dir = self.user_dir(user)?;
        let albums: Vec<Album> = read_manifest(&user_dir.join("albums.json")).await?;

        if !albums.iter().any(|a| a.id == album_id) {
            return Err(RemoteServiceError::NotFound(format!("album {}", album_id)));
        }

        read_manifest(&Self::album_dir(&user_dir, album_id).join("photos.json")).await
    }

    async fn create_album(&self, album: NewAlbum) -> Result<Album, RemoteServiceError> {
        let user_dir = self.own_dir()?;
        let manifest = user_dir.join("albums.json");
        let mut albums: Vec<Album> = read_manifest(&manifest).await?;

        let created = Album {
            id: next_id(albums.iter().map(|a| &a.id)),
            title: album.title,
            summary: album.summary,
            access: album.access,
            timestamp: album.timestamp,
        };

        tokio::fs::create_dir_all(Self::album_dir(&user_dir, &created.id)).await?;
        albums.push(created.clone());
        write_manifest(&manifest, &albums).await?;

        Ok(created)
    }

    async fn delete_album(&self, album_id: &str) -> Result<(), RemoteServiceError> {
        let user_dir = self.own_dir()?;
        let manifest = user_dir.join("albums.json");
        let mut albums: Vec<Album> = read_manifest(&manifest).await?;
        let before = albums.len();

        albums.retain(|a| a.id != album_id);

        if albums.len() == before {
            return Err(RemoteServiceError::NotFound(format!("album {}", album_id)));
        }

        write_manifest(&manifest, &albums).await?;

        let album_dir = Self::album_dir(&user_dir, album_id);
        if let Err(e) = tokio::fs::remove_dir_all(&album_dir).await {
            log::warn!("Could not remove album directory {:?}: {}", album_dir, e);
        }

        Ok(())
    }

    async fn upload_photo(&self, album_id: &str, path: &Path, tags: &str) -> Result<PhotoEntry, RemoteServiceError> {
        let user_dir = self.own_dir()?;
        let albums: Vec<Album> = read_manifest(&user_dir.join("albums.json")).await?;

        if !albums.iter().any(|a| a.id == album_id) {
            return Err(RemoteServiceError::NotFound(format!("album {}", album_id)));
        }

        let size = tokio::fs::metadata(path).await?.len();

        if size > self.max_upload_bytes {
            return Err(RemoteServiceError::Quota(format!(
                "{:?} is {} bytes, the limit is {}",
                path, size, self.max_upload_bytes
            )));
        }

        let bytes = tokio::fs::read(path).await?;
        let hash = hash_bytes(&bytes);
        let blob_path = self.blob_path(&hash);

        if tokio::fs::metadata(&blob_path).await.is_err() {
            tokio::fs::write(&blob_path, &bytes).await?;
            log::debug!("Stored blob {} for {:?}", hash, path);
        }

        let blob_path = tokio::fs::canonicalize(&blob_path).await?;
        let content_url = Url::from_file_path(&blob_path)
            .map_err(|_| RemoteServiceError::Request(format!("no file url for {:?}", blob_path)))?;

        let manifest = Self::album_dir(&user_dir, album_id).join("photos.json");
        let mut photos: Vec<PhotoEntry> = read_manifest(&manifest).await?;

        let entry = PhotoEntry {
            id: next_id(photos.iter().map(|p| &p.id)),
            title: path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| hash.clone()),
            content_type: mime_guess::from_path(path).first_or_octet_stream().to_string(),
            content_url: content_url.to_string(),
            tags: Some(tags.to_owned()).filter(|t| !t.is_empty()),
        };

        photos.push(entry.clone());
        write_manifest(&manifest, &photos).await?;

        Ok(entry)
    }

    async fn download_photo(&self, content_url: &str) -> Result<Vec<u8>, RemoteServiceError> {
        self.own_dir()?;

        let url = Url::parse(content_url).map_err(|e| RemoteServiceError::Request(format!("{}: {}", content_url, e)))?;

        if url.scheme() != "file" {
            return Err(RemoteServiceError::Request(format!("unsupported url scheme: {}", url.scheme())));
        }

        let path = url
            .to_file_path()
            .map_err(|_| RemoteServiceError::Request(format!("bad file url: {}", content_url)))?;

        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(RemoteServiceError::NotFound(content_url.to_owned())),
            Err(e) => Err(e.into()),
        }
    }
}

fn event_matches(event: &Event, query: &EventQuery) -> bool {
    if let Some(min) = query.start_min {
        match event.start {
            Some(start) if start.date() >= min => {}
            _ => return false,
        }
    }

    if let Some(max) = query.start_max {
        match event.start {
            Some(start) if start.date() < max => {}
            _ => return false,
        }
    }

    match &query.text {
        Some(text) => {
            let text = text.to_lowercase();
            event.title.to_lowercase().contains(&text)
                || event
                    .content
                    .as_deref()
                    .map(|c| c.to_lowercase().contains(&text))
                    .unwrap_or(false)
        }
        None => true,
    }
}

#[async_trait]
impl CalendarService for LocalStore {
    async fn quick_add_event(&self, text: &str) -> Result<Event, RemoteServiceError> {
        let manifest = self.own_dir()?.join("events.json");
        let mut events: Vec<Event> = read_manifest(&manifest).await?;

        let start: NaiveDateTime = Local::now().naive_local();
        let id = next_id(events.iter().map(|e| &e.id));
        let event = Event {
            url: format!("local:event/{}", id),
            id,
            title: text.to_owned(),
            content: Some(text.to_owned()),
            start: Some(start),
            end: Some(start + Duration::hours(1)),
            location: None,
        };

        events.push(event.clone());
        write_manifest(&manifest, &events).await?;

        Ok(event)
    }

    async fn list_events(&self, query: &EventQuery) -> Result<Vec<Event>, RemoteServiceError> {
        let events: Vec<Event> = read_manifest(&self.own_dir()?.join("events.json")).await?;

        Ok(events.into_iter().filter(|e| event_matches(e, query)).collect())
    }

    async fn delete_event(&self, event_id: &str) -> Result<(), RemoteServiceError> {
        let manifest = self.own_dir()?.join("events.json");
        let mut events: Vec<Event> = read_manifest(&manifest).await?;
        let before = events.len();

        events.retain(|e| e.id != event_id);

        if events.len() == before {
            return Err(RemoteServiceError::NotFound(format!("event {}", event_id)));
        }

        write_manifest(&manifest, &events).await
    }
}
