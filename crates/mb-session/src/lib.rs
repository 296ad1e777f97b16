//! Async runtime around the editor: the generation task queue and its
//! processor, debounced autosave, and the collaborator backends (projects,
//! card library, uploads).

pub mod autosave;
pub mod backend;
pub mod config;
pub mod error;
mod processor;
pub mod queue;
pub mod session;

pub use autosave::{AutosaveState, SaveStatus};
pub use backend::{
    CardLibrary, FileStorage, GenerationRequest, ImageGenerator, JsonFileProjectStore,
    MemoryCardLibrary, MemoryFileStorage, MemoryProjectStore, MockImageGenerator, NewCard,
    ProjectStore, decode_data_uri,
};
pub use config::SessionConfig;
pub use error::{ConfigError, GenerationError, SessionError, StorageError, StoreError};
pub use queue::{GenerationTask, Job, TaskQueue, TaskStatus, truncate_prompt};
pub use session::{AuthState, Backends, EditorSnapshot, Session};
