use crate::error::{AuthError, RemoteServiceError};
use crate::models::{Access, Album, Credentials, Event, NewAlbum, PhotoEntry};
use crate::prompt::{answer_to_bool, Prompter};
use crate::service::{Authenticator, CalendarService, EventQuery, PhotoService};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

static SCRATCH_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Unique directory under the system temp dir, removed on drop.
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    pub fn new(name: &str) -> Self {
        let path = std::env::temp_dir().join(format!(
            "googlecl-test-{}-{}-{}",
            name,
            std::process::id(),
            SCRATCH_COUNTER.fetch_add(1, Ordering::SeqCst)
        ));
        let _ = std::fs::remove_dir_all(&path);
        std::fs::create_dir_all(&path).unwrap();

        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

pub fn album(id: &str, title: &str) -> Album {
    Album {
        id: id.to_owned(),
        title: title.to_owned(),
        summary: String::new(),
        access: Access::Public,
        timestamp: None,
    }
}

pub fn photo(id: &str, title: &str, content_type: &str) -> PhotoEntry {
    PhotoEntry {
        id: id.to_owned(),
        title: title.to_owned(),
        content_type: content_type.to_owned(),
        content_url: format!("mock://{}", id),
        tags: None,
    }
}

#[derive(Default)]
struct MockState {
    albums: Vec<Album>,
    photos: HashMap<String, Vec<PhotoEntry>>,
    blobs: HashMap<String, Vec<u8>>,
    events: Vec<Event>,
    unlistable: HashSet<String>,
    failing_uploads: HashSet<PathBuf>,
    login_calls: usize,
    reject_logins: bool,
    deleted_albums: Vec<String>,
    deleted_events: Vec<String>,
    created: Vec<NewAlbum>,
    uploads: Vec<(String, PathBuf, String)>,
}

/// In-memory remote service recording every call made to it.
#[derive(Default)]
pub struct MockService {
    state: Mutex<MockState>,
}

impl MockService {
    pub fn reject_logins(self) -> Self {
        self.state.lock().unwrap().reject_logins = true;
        self
    }

    /// Adds an album. Photos given without bytes fail to download.
    pub fn with_album(self, album: Album, photos: Vec<(PhotoEntry, Option<&str>)>) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let mut entries = Vec::new();

            for (entry, bytes) in photos {
                if let Some(bytes) = bytes {
                    state.blobs.insert(entry.content_url.clone(), bytes.as_bytes().to_vec());
                }
                entries.push(entry);
            }

            state.photos.insert(album.id.clone(), entries);
            state.albums.push(album);
        }
        self
    }

    pub fn with_unlistable(self, album_id: &str) -> Self {
        self.state.lock().unwrap().unlistable.insert(album_id.to_owned());
        self
    }

    pub fn with_failing_upload(self, path: &Path) -> Self {
        self.state.lock().unwrap().failing_uploads.insert(path.to_path_buf());
        self
    }

    pub fn with_event(self, event: Event) -> Self {
        self.state.lock().unwrap().events.push(event);
        self
    }

    pub fn login_calls(&self) -> usize {
        self.state.lock().unwrap().login_calls
    }

    pub fn deleted_albums(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted_albums.clone()
    }

    pub fn deleted_events(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted_events.clone()
    }

    pub fn created(&self) -> Vec<NewAlbum> {
        self.state.lock().unwrap().created.clone()
    }

    pub fn uploads(&self) -> Vec<(String, PathBuf, String)> {
        self.state.lock().unwrap().uploads.clone()
    }
}

#[async_trait]
impl Authenticator for MockService {
    async fn login(&self, credentials: &Credentials) -> Result<(), AuthError> {
        let mut state = self.state.lock().unwrap();
        state.login_calls += 1;

        if state.reject_logins {
            Err(AuthError::BadAuthentication(credentials.email.clone()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PhotoService for MockService {
    async fn list_albums(&self, _user: &str) -> Result<Vec<Album>, RemoteServiceError> {
        Ok(self.state.lock().unwrap().albums.clone())
    }

    async fn list_photos(&self, _user: &str, album_id: &str) -> Result<Vec<PhotoEntry>, RemoteServiceError> {
        let state = self.state.lock().unwrap();

        if state.unlistable.contains(album_id) {
            return Err(RemoteServiceError::Request(String::from("feed unavailable")));
        }

        state
            .photos
            .get(album_id)
            .cloned()
            .ok_or_else(|| RemoteServiceError::NotFound(album_id.to_owned()))
    }

    async fn create_album(&self, album: NewAlbum) -> Result<Album, RemoteServiceError> {
        let mut state = self.state.lock().unwrap();
        let created = Album {
            id: format!("album-{}", state.albums.len() + 1),
            title: album.title.clone(),
            summary: album.summary.clone(),
            access: album.access,
            timestamp: album.timestamp,
        };

        state.created.push(album);
        state.albums.push(created.clone());
        state.photos.insert(created.id.clone(), Vec::new());

        Ok(created)
    }

    async fn delete_album(&self, album_id: &str) -> Result<(), RemoteServiceError> {
        let mut state = self.state.lock().unwrap();
        state.albums.retain(|a| a.id != album_id);
        state.deleted_albums.push(album_id.to_owned());
        Ok(())
    }

    async fn upload_photo(&self, album_id: &str, path: &Path, tags: &str) -> Result<PhotoEntry, RemoteServiceError> {
        let mut state = self.state.lock().unwrap();

        if state.failing_uploads.contains(path) {
            return Err(RemoteServiceError::Quota(String::from("storage full")));
        }

        state.uploads.push((album_id.to_owned(), path.to_path_buf(), tags.to_owned()));

        let title = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let mut entry = photo(&format!("photo-{}", state.uploads.len()), &title, "image/jpeg");
        entry.tags = Some(tags.to_owned());

        Ok(entry)
    }

    async fn download_photo(&self, content_url: &str) -> Result<Vec<u8>, RemoteServiceError> {
        self.state
            .lock()
            .unwrap()
            .blobs
            .get(content_url)
            .cloned()
            .ok_or_else(|| RemoteServiceError::NotFound(content_url.to_owned()))
    }
}

#[async_trait]
impl CalendarService for MockService {
    async fn quick_add_event(&self, text: &str) -> Result<Event, RemoteServiceError> {
        let mut state = self.state.lock().unwrap();
        let event = Event {
            id: format!("event-{}", state.events.len() + 1),
            title: text.to_owned(),
            content: None,
            start: None,
            end: None,
            location: None,
            url: String::new(),
        };
        state.events.push(event.clone());
        Ok(event)
    }

    async fn list_events(&self, query: &EventQuery) -> Result<Vec<Event>, RemoteServiceError> {
        let state = self.state.lock().unwrap();

        Ok(state
            .events
            .iter()
            .filter(|e| match &query.text {
                Some(text) => e.title.contains(text.as_str()),
                None => true,
            })
            .cloned()
            .collect())
    }

    async fn delete_event(&self, event_id: &str) -> Result<(), RemoteServiceError> {
        let mut state = self.state.lock().unwrap();
        state.events.retain(|e| e.id != event_id);
        state.deleted_events.push(event_id.to_owned());
        Ok(())
    }
}

/// Prompter answering from a fixed script. Runs out into empty answers.
pub struct ScriptedPrompter {
    answers: VecDeque<String>,
    pub questions: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            questions: Vec::new(),
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&mut self, prompt: &str, default: bool) -> bool {
        self.questions.push(prompt.to_owned());
        let answer = self.answers.pop_front().unwrap_or_default();
        answer_to_bool(&answer, default)
    }

    fn ask(&mut self, prompt: &str) -> String {
        self.questions.push(prompt.to_owned());
        self.answers.pop_front().unwrap_or_default()
    }
}
