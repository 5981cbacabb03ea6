//! Snapshot session management.

use crate::memory::image::MemoryImage;
use memlayout::LayoutProfile;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// An open snapshot and the layouts used to read it.
pub struct MemorySession {
    /// Unique session ID.
    pub id: String,
    /// Path to the snapshot file.
    pub image_path: String,
    /// The memory-mapped snapshot.
    pub image: MemoryImage,
    /// Layout profile, or the built-in primitives when none was given.
    pub profile: Arc<LayoutProfile>,
    pub layout_path: Option<String>,
    /// Creation timestamp.
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl MemorySession {
    pub fn new(
        id: String,
        image_path: String,
        image: MemoryImage,
        profile: LayoutProfile,
        layout_path: Option<String>,
    ) -> Self {
        MemorySession {
            id,
            image_path,
            image,
            profile: Arc::new(profile),
            layout_path,
            created_at: chrono::Utc::now(),
        }
    }

    pub fn image_size(&self) -> u64 {
        self.image.size()
    }
}

/// Global session store.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Arc<MemorySession>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new session and return its ID.
    pub async fn create_session(
        &self,
        image_path: String,
        image: MemoryImage,
        profile: LayoutProfile,
        layout_path: Option<String>,
    ) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let session = MemorySession::new(id.clone(), image_path, image, profile, layout_path);
        let mut sessions = self.sessions.write().await;
        sessions.insert(id.clone(), Arc::new(session));
        id
    }

    /// Get a session by ID.
    pub async fn get_session(&self, id: &str) -> Option<Arc<MemorySession>> {
        let sessions = self.sessions.read().await;
        sessions.get(id).cloned()
    }

    /// All sessions, oldest first.
    pub async fn list_sessions(&self) -> Vec<Arc<MemorySession>> {
        let sessions = self.sessions.read().await;
        let mut result: Vec<_> = sessions.values().cloned().collect();
        result.sort_by_key(|s| s.created_at);
        result
    }

    /// Remove a session.
    pub async fn remove_session(&self, id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        sessions.remove(id).is_some()
    }

    /// Count active sessions.
    pub async fn count(&self) -> usize {
        let sessions = self.sessions.read().await;
        sessions.len()
    }
}
