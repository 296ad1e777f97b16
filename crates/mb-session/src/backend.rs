//! External collaborators: project store, card library, image generator,
//! file storage.
//!
//! The session only sees the traits. In-memory implementations back the
//! tests; `JsonFileProjectStore` backs the CLI.

use crate::config::SessionConfig;
use crate::error::{GenerationError, StorageError, StoreError};
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use mb_core::{
    CanvasElement, CardType, CustomCard, ElementId, Project, ProjectSummary, ProjectUpdate,
};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::RwLock;

// ─── Traits ───────────────────────────────────────────────────────────────

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Produce one image for `prompt`, using `references` as visual context.
    /// Returns a URL or data URI.
    async fn generate(
        &self,
        prompt: &str,
        references: &[CanvasElement],
    ) -> Result<String, GenerationError>;
}

#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn create(&self, title: &str) -> Result<Project, StoreError>;
    async fn get(&self, id: &str) -> Result<Project, StoreError>;
    async fn update(&self, id: &str, update: ProjectUpdate) -> Result<Project, StoreError>;
    /// Most recently updated first.
    async fn list(&self) -> Result<Vec<ProjectSummary>, StoreError>;
    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Public example boards, most recently updated first.
    async fn list_examples(&self) -> Result<Vec<ProjectSummary>, StoreError> {
        let mut rows = self.list().await?;
        rows.retain(|row| row.is_example);
        Ok(rows)
    }
}

/// Fields of a card about to be saved to a `CardLibrary`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCard {
    /// Checked against the known card types on create.
    pub card_type: String,
    pub image_url: String,
    pub text_content: Option<String>,
}

impl NewCard {
    pub fn new(card_type: impl Into<String>, image_url: impl Into<String>) -> Self {
        Self {
            card_type: card_type.into(),
            image_url: image_url.into(),
            text_content: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text_content = Some(text.into());
        self
    }
}

/// A user's saved cards. `CustomCard::to_template` turns one into something
/// `Editor::add_card` can place.
#[async_trait]
pub trait CardLibrary: Send + Sync {
    /// Most recently created first.
    async fn list(&self) -> Result<Vec<CustomCard>, StoreError>;
    async fn create(&self, card: NewCard) -> Result<CustomCard, StoreError>;
    async fn get(&self, id: u64) -> Result<CustomCard, StoreError>;
    async fn delete(&self, id: u64) -> Result<(), StoreError>;
}

#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Store an upload and return the URL it can be fetched from.
    async fn upload(&self, bytes: Vec<u8>, filename: &str) -> Result<String, StorageError>;

    /// Store a `data:image/...;base64,` URI, or bare base64 taken as PNG.
    async fn upload_data_uri(&self, data: &str) -> Result<String, StorageError> {
        let (bytes, filename) = decode_data_uri(data)?;
        self.upload(bytes, &filename).await
    }
}

/// Decode a data URI into its bytes and a filename whose extension comes
/// from the MIME subtype (`jpeg` becomes `jpg`).
pub fn decode_data_uri(data: &str) -> Result<(Vec<u8>, String), StorageError> {
    let data = data.trim();
    if data.is_empty() {
        return Err(StorageError::Empty);
    }
    let (ext, payload) = match data
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(','))
    {
        Some((header, payload)) => {
            let mime = header.split(';').next().unwrap_or_default();
            let ext = match mime.split_once('/') {
                Some((_, "jpeg")) => "jpg",
                Some((_, subtype)) => subtype,
                None => "",
            };
            (ext, payload)
        }
        None => ("png", data),
    };
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| StorageError::InvalidBase64(e.to_string()))?;
    Ok((bytes, format!("image.{ext}")))
}

fn newest_first(mut rows: Vec<ProjectSummary>) -> Vec<ProjectSummary> {
    rows.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    rows
}

// ─── In-memory project store ──────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MemoryProjectStore {
    projects: RwLock<BTreeMap<String, Project>>,
    next_id: AtomicU64,
    updates: AtomicUsize,
}

impl MemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_projects(projects: impl IntoIterator<Item = Project>) -> Self {
        let projects = projects.into_iter().map(|p| (p.id.clone(), p)).collect();
        Self {
            projects: RwLock::new(projects),
            ..Self::default()
        }
    }

    /// Number of successful `update` calls so far.
    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProjectStore for MemoryProjectStore {
    async fn create(&self, title: &str) -> Result<Project, StoreError> {
        let mut projects = self.projects.write().await;
        let id = loop {
            let candidate = (self.next_id.fetch_add(1, Ordering::SeqCst) + 1).to_string();
            if !projects.contains_key(&candidate) {
                break candidate;
            }
        };
        let project = Project::new(id.clone(), title);
        projects.insert(id, project.clone());
        Ok(project)
    }

    async fn get(&self, id: &str) -> Result<Project, StoreError> {
        self.projects
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn update(&self, id: &str, update: ProjectUpdate) -> Result<Project, StoreError> {
        let mut projects = self.projects.write().await;
        let project = projects
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        project.apply(update);
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(project.clone())
    }

    async fn list(&self) -> Result<Vec<ProjectSummary>, StoreError> {
        let rows = self.projects.read().await.values().map(Project::summary).collect();
        Ok(newest_first(rows))
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.projects
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}

// ─── In-memory card library ───────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MemoryCardLibrary {
    cards: RwLock<BTreeMap<u64, CustomCard>>,
    next_id: AtomicU64,
}

impl MemoryCardLibrary {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CardLibrary for MemoryCardLibrary {
    async fn list(&self) -> Result<Vec<CustomCard>, StoreError> {
        let mut cards: Vec<_> = self.cards.read().await.values().cloned().collect();
        cards.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(cards)
    }

    async fn create(&self, card: NewCard) -> Result<CustomCard, StoreError> {
        let card_type = CardType::parse(&card.card_type)
            .ok_or_else(|| StoreError::InvalidCardType(card.card_type.clone()))?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let card = CustomCard {
            id,
            card_type,
            image_url: card.image_url,
            text_content: card.text_content,
            created_at: Utc::now(),
        };
        self.cards.write().await.insert(id, card.clone());
        log::debug!("saved {} card {id} to the library", card_type.as_str());
        Ok(card)
    }

    async fn get(&self, id: u64) -> Result<CustomCard, StoreError> {
        self.cards
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::CardNotFound(id))
    }

    async fn delete(&self, id: u64) -> Result<(), StoreError> {
        self.cards
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::CardNotFound(id))
    }
}

// ─── JSON file project store ──────────────────────────────────────────────

/// Distinguishes temp files of concurrent writes.
static WRITE_SEQ: AtomicU64 = AtomicU64::new(0);

/// One `<id>.json` file per project inside `dir`.
#[derive(Debug, Clone)]
pub struct JsonFileProjectStore {
    dir: PathBuf,
}

impl JsonFileProjectStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store rooted at a project file's directory, plus that project's id.
    pub fn for_file(path: impl AsRef<Path>) -> Option<(Self, String)> {
        let path = path.as_ref();
        let id = path.file_stem()?.to_str()?.to_string();
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Some((Self::new(dir), id))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    async fn read(&self, id: &str) -> Result<Project, StoreError> {
        let path = self.path_for(id);
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(id.to_string()));
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        let mut project: Project =
            serde_json::from_str(&text).map_err(|source| StoreError::Json { path, source })?;
        // The file name is authoritative.
        project.id = id.to_string();
        Ok(project)
    }

    async fn write(&self, project: &Project) -> Result<(), StoreError> {
        let path = self.path_for(&project.id);
        let json = serde_json::to_string_pretty(project).map_err(|source| StoreError::Json {
            path: path.clone(),
            source,
        })?;
        // One temp file per write; overlapping updates must not share it.
        let tmp = self.dir.join(format!(
            ".{}.{}.{}.tmp",
            project.id,
            std::process::id(),
            WRITE_SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        if let Err(source) = tokio::fs::write(&tmp, json).await {
            tokio::fs::remove_file(&tmp).await.ok();
            return Err(StoreError::Io { path: tmp, source });
        }
        if let Err(source) = tokio::fs::rename(&tmp, &path).await {
            tokio::fs::remove_file(&tmp).await.ok();
            return Err(StoreError::Io { path, source });
        }
        Ok(())
    }
}

#[async_trait]
impl ProjectStore for JsonFileProjectStore {
    async fn create(&self, title: &str) -> Result<Project, StoreError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| StoreError::Io {
                path: self.dir.clone(),
                source,
            })?;
        let base = Utc::now().timestamp_millis();
        let mut n = 0;
        let id = loop {
            let candidate = if n == 0 {
                base.to_string()
            } else {
                format!("{base}-{n}")
            };
            if !tokio::fs::try_exists(self.path_for(&candidate))
                .await
                .unwrap_or(false)
            {
                break candidate;
            }
            n += 1;
        };
        let project = Project::new(id, title);
        self.write(&project).await?;
        log::info!("created project {} at {}", project.id, self.path_for(&project.id).display());
        Ok(project)
    }

    async fn get(&self, id: &str) -> Result<Project, StoreError> {
        self.read(id).await
    }

    async fn update(&self, id: &str, update: ProjectUpdate) -> Result<Project, StoreError> {
        let mut project = self.read(id).await?;
        project.apply(update);
        self.write(&project).await?;
        log::debug!("wrote project {id} ({} elements)", project.elements.len());
        Ok(project)
    }

    async fn list(&self) -> Result<Vec<ProjectSummary>, StoreError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.dir.clone(),
                    source,
                });
            }
        };
        let mut rows = Vec::new();
        loop {
            let entry = entries.next_entry().await.map_err(|source| StoreError::Io {
                path: self.dir.clone(),
                source,
            })?;
            let Some(entry) = entry else { break };
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match self.read(id).await {
                Ok(project) => rows.push(project.summary()),
                Err(e) => log::warn!("skipping {}: {e}", path.display()),
            }
        }
        Ok(newest_first(rows))
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let path = self.path_for(id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(id.to_string()))
            }
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }
}

// ─── Mock image generator ─────────────────────────────────────────────────

/// What a `MockImageGenerator` was asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub references: Vec<ElementId>,
}

#[derive(Debug, Clone)]
enum MockOutcome {
    Picsum,
    Fixed(String),
    Fail(String),
}

/// Generator that sleeps for `latency` and returns a placeholder image.
#[derive(Debug)]
pub struct MockImageGenerator {
    latency: Duration,
    outcome: MockOutcome,
    /// Prompts containing this marker fail regardless of `outcome`.
    fail_marker: Option<String>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl Default for MockImageGenerator {
    fn default() -> Self {
        Self {
            latency: Duration::from_millis(1500),
            outcome: MockOutcome::Picsum,
            fail_marker: None,
            requests: Mutex::new(Vec::new()),
        }
    }
}

impl MockImageGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always return `url`.
    pub fn returning(url: impl Into<String>) -> Self {
        Self {
            outcome: MockOutcome::Fixed(url.into()),
            ..Self::default()
        }
    }

    /// Always fail with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            outcome: MockOutcome::Fail(message.into()),
            ..Self::default()
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn failing_on(mut self, marker: impl Into<String>) -> Self {
        self.fail_marker = Some(marker.into());
        self
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

fn picsum_url(prompt: &str, n: usize) -> String {
    let seed: String = prompt
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    format!("https://picsum.photos/seed/{}-{n}/400/400", seed.trim_matches('-'))
}

#[async_trait]
impl ImageGenerator for MockImageGenerator {
    async fn generate(
        &self,
        prompt: &str,
        references: &[CanvasElement],
    ) -> Result<String, GenerationError> {
        let n = {
            let mut requests = self.requests.lock().unwrap_or_else(PoisonError::into_inner);
            requests.push(GenerationRequest {
                prompt: prompt.to_string(),
                references: references.iter().map(|el| el.id).collect(),
            });
            requests.len()
        };
        tokio::time::sleep(self.latency).await;

        if let Some(marker) = &self.fail_marker
            && prompt.contains(marker.as_str())
        {
            return Err(GenerationError::Backend(format!("refused prompt {prompt:?}")));
        }
        match &self.outcome {
            MockOutcome::Picsum => Ok(picsum_url(prompt, n)),
            MockOutcome::Fixed(url) => Ok(url.clone()),
            MockOutcome::Fail(message) => Err(GenerationError::Backend(message.clone())),
        }
    }
}

// ─── In-memory file storage ───────────────────────────────────────────────

#[derive(Debug)]
pub struct MemoryFileStorage {
    max_bytes: usize,
    allowed_extensions: Vec<String>,
    files: Mutex<HashMap<String, Vec<u8>>>,
    seq: AtomicU64,
}

impl MemoryFileStorage {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            max_bytes: config.upload_max_bytes,
            allowed_extensions: config.allowed_extensions.clone(),
            files: Mutex::new(HashMap::new()),
            seq: AtomicU64::new(0),
        }
    }

    pub fn get(&self, url: &str) -> Option<Vec<u8>> {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .cloned()
    }
}

#[async_trait]
impl FileStorage for MemoryFileStorage {
    async fn upload(&self, bytes: Vec<u8>, filename: &str) -> Result<String, StorageError> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if !self.allowed_extensions.iter().any(|a| *a == ext) {
            return Err(StorageError::DisallowedExtension(ext));
        }
        if bytes.is_empty() {
            return Err(StorageError::Empty);
        }
        if bytes.len() > self.max_bytes {
            return Err(StorageError::TooLarge {
                size: bytes.len(),
                limit: self.max_bytes,
            });
        }
        let n = self.seq.fetch_add(1, Ordering::SeqCst);
        let url = format!(
            "memory://uploads/{}-{n}.{ext}",
            Utc::now().timestamp_millis()
        );
        log::debug!("stored {} byte upload {filename:?} at {url}", bytes.len());
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.clone(), bytes);
        Ok(url)
    }
}
