use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use crate::Post;

/// Saved posts keyed by id, in save order. Entries are frozen copies taken
/// at save time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SavedItems {
    items: Vec<Post>,
}

impl SavedItems {
    pub fn new(items: Vec<Post>) -> Self {
        let mut saved = Self::default();
        for post in items {
            saved.save(post);
        }
        saved
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.iter().any(|post| post.id == id)
    }

    /// Adds `post` unless its id is already present. Returns whether it was added.
    pub fn save(&mut self, mut post: Post) -> bool {
        if self.contains(&post.id) {
            return false;
        }
        post.is_saved = true;
        self.items.push(post);
        true
    }

    pub fn unsave(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|post| post.id != id);
        self.items.len() != before
    }

    pub fn list(&self) -> &[Post] {
        &self.items
    }

    pub fn into_vec(self) -> Vec<Post> {
        self.items
    }

    /// Sets `is_saved` on every post in `posts` from membership here.
    pub fn mark(&self, posts: &mut [Post]) {
        let ids: HashSet<&str> = self.items.iter().map(|post| post.id.as_str()).collect();
        for post in posts {
            post.is_saved = ids.contains(post.id.as_str());
        }
    }
}

/// Persistence boundary for saved posts. Every write replaces the whole
/// collection; concurrent writers are not coordinated beyond one process.
#[async_trait]
pub trait SavedStore: Send + Sync {
    async fn get_all(&self) -> Result<SavedItems, String>;

    /// Returns false when a post with the same id was already saved.
    async fn put(&self, post: Post) -> Result<bool, String>;

    async fn delete(&self, id: &str) -> Result<bool, String>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    items: Mutex<SavedItems>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SavedStore for MemoryStore {
    async fn get_all(&self) -> Result<SavedItems, String> {
        Ok(self.items.lock().await.clone())
    }

    async fn put(&self, post: Post) -> Result<bool, String> {
        Ok(self.items.lock().await.save(post))
    }

    async fn delete(&self, id: &str) -> Result<bool, String> {
        Ok(self.items.lock().await.unsave(id))
    }
}

/// Saved posts kept as a flat JSON array on disk.
pub struct JsonFileStore {
    path: PathBuf,
    items: Mutex<SavedItems>,
}

impl JsonFileStore {
    pub async fn load(path: PathBuf) -> Result<Self, String> {
        let items = if path.exists() {
            let data = tokio::fs::read_to_string(&path)
                .await
                .map_err(|err| format!("failed to read saved items: {}", err))?;
            if data.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&data)
                    .map_err(|err| format!("failed to parse saved items: {}", err))?
            }
        } else {
            Vec::new()
        };

        Ok(Self {
            path,
            items: Mutex::new(SavedItems::new(items)),
        })
    }

    async fn persist(&self, items: &SavedItems) -> Result<(), String> {
        if let Some(parent) = self.path.parent() {
            ensure_dir(parent).await?;
        }
        let payload = serde_json::to_string_pretty(items.list())
            .map_err(|err| format!("failed to serialize saved items: {}", err))?;
        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, payload)
            .await
            .map_err(|err| format!("failed to write saved items: {}", err))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|err| format!("failed to finalize saved items: {}", err))?;
        Ok(())
    }
}

#[async_trait]
impl SavedStore for JsonFileStore {
    async fn get_all(&self) -> Result<SavedItems, String> {
        Ok(self.items.lock().await.clone())
    }

    async fn put(&self, post: Post) -> Result<bool, String> {
        let mut guard = self.items.lock().await;
        let added = guard.save(post);
        if added {
            self.persist(&guard).await?;
        }
        Ok(added)
    }

    async fn delete(&self, id: &str) -> Result<bool, String> {
        let mut guard = self.items.lock().await;
        let removed = guard.unsave(id);
        if removed {
            self.persist(&guard).await?;
        }
        Ok(removed)
    }
}

async fn ensure_dir(path: &Path) -> Result<(), String> {
    if path.as_os_str().is_empty() || path.exists() {
        return Ok(());
    }
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|err| format!("failed to create saved items dir: {}", err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockProvider;

    #[test]
    fn save_is_idempotent_and_unsave_reports_removal() {
        let posts = MockProvider.candidates();
        let mut saved = SavedItems::default();

        assert!(saved.save(posts[0].clone()));
        assert!(!saved.save(posts[0].clone()));
        assert_eq!(saved.len(), 1);
        assert!(saved.list()[0].is_saved);

        assert!(saved.unsave(&posts[0].id));
        assert!(!saved.unsave(&posts[0].id));
        assert!(saved.is_empty());
        assert!(saved.save(posts[1].clone()));
        assert!(saved.contains(&posts[1].id));
    }

    #[test]
    fn mark_reflects_membership() {
        let mut posts = MockProvider.candidates();
        let saved = SavedItems::new(vec![posts[2].clone()]);
        posts[0].is_saved = true;

        saved.mark(&mut posts);
        let flagged: Vec<&str> = posts
            .iter()
            .filter(|post| post.is_saved)
            .map(|post| post.id.as_str())
            .collect();
        assert_eq!(flagged, vec![posts[2].id.as_str()]);
    }
}
