//! In-process collaborators for tests and `--dry-run` harvests.

use std::collections::{HashMap, VecDeque};

use murmur_core::{
    cursor_key, Cursor, CursorStore, MessageQueue, Platform, PopOrder, Rotation, StoreError,
    TagQueue, TagsFile,
};
use tokio::sync::Mutex;

#[derive(Debug, Default)]
pub struct MemoryCursorStore {
    cursors: Mutex<HashMap<String, Cursor>>,
}

impl MemoryCursorStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored key and cursor.
    pub async fn snapshot(&self) -> HashMap<String, Cursor> {
        self.cursors.lock().await.clone()
    }
}

impl CursorStore for MemoryCursorStore {
    async fn get(&self, platform: Platform, tag: &str) -> Result<Option<Cursor>, StoreError> {
        Ok(self
            .cursors
            .lock()
            .await
            .get(&cursor_key(platform, tag))
            .cloned())
    }

    async fn set(&self, platform: Platform, tag: &str, cursor: &Cursor) -> Result<(), StoreError> {
        self.cursors
            .lock()
            .await
            .insert(cursor_key(platform, tag), cursor.clone());
        Ok(())
    }

    async fn clear(&self, platform: Platform, tag: &str) -> Result<(), StoreError> {
        self.cursors.lock().await.remove(&cursor_key(platform, tag));
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryTagQueue {
    queues: Mutex<HashMap<Platform, VecDeque<String>>>,
}

impl MemoryTagQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue seeded with every history tag in `file`, in file order.
    #[must_use]
    pub fn from_tags(file: &TagsFile) -> Self {
        Self::from_rotation(file, Rotation::History)
    }

    #[must_use]
    pub fn from_rotation(file: &TagsFile, rotation: Rotation) -> Self {
        let queues = Platform::ALL
            .into_iter()
            .map(|p| (p, file.rotation_for(rotation, p).iter().cloned().collect()))
            .collect();
        Self {
            queues: Mutex::new(queues),
        }
    }
}

impl TagQueue for MemoryTagQueue {
    async fn peek_front(&self, platform: Platform) -> Result<Option<String>, StoreError> {
        Ok(self
            .queues
            .lock()
            .await
            .get(&platform)
            .and_then(|q| q.front().cloned()))
    }

    async fn requeue(&self, platform: Platform, tag: &str) -> Result<(), StoreError> {
        let mut queues = self.queues.lock().await;
        let queue = queues.entry(platform).or_default();
        if let Some(pos) = queue.iter().position(|t| t == tag) {
            if let Some(tag) = queue.remove(pos) {
                queue.push_back(tag);
            }
        }
        Ok(())
    }

    async fn retire(&self, platform: Platform, tag: &str) -> Result<bool, StoreError> {
        let mut queues = self.queues.lock().await;
        let queue = queues.entry(platform).or_default();
        let before = queue.len();
        queue.retain(|t| t != tag);
        Ok(queue.len() != before)
    }

    async fn push_back(&self, platform: Platform, tag: &str) -> Result<bool, StoreError> {
        let mut queues = self.queues.lock().await;
        let queue = queues.entry(platform).or_default();
        if queue.iter().any(|t| t == tag) {
            return Ok(false);
        }
        queue.push_back(tag.to_owned());
        Ok(true)
    }

    async fn list(&self, platform: Platform) -> Result<Vec<String>, StoreError> {
        Ok(self
            .queues
            .lock()
            .await
            .get(&platform)
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default())
    }
}

#[derive(Debug, Default)]
pub struct MemoryQueue {
    topics: Mutex<HashMap<String, VecDeque<Vec<u8>>>>,
}

impl MemoryQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return everything queued on `topic`, oldest first.
    pub async fn drain(&self, topic: &str) -> Vec<Vec<u8>> {
        self.topics
            .lock()
            .await
            .get_mut(topic)
            .map(|q| q.drain(..).collect())
            .unwrap_or_default()
    }

    pub async fn len(&self, topic: &str) -> usize {
        self.topics.lock().await.get(topic).map_or(0, VecDeque::len)
    }
}

impl MessageQueue for MemoryQueue {
    async fn push(&self, topic: &str, payload: &[u8]) -> Result<(), StoreError> {
        self.topics
            .lock()
            .await
            .entry(topic.to_owned())
            .or_default()
            .push_back(payload.to_vec());
        Ok(())
    }

    async fn pop(&self, topic: &str, order: PopOrder) -> Result<Option<Vec<u8>>, StoreError> {
        let mut topics = self.topics.lock().await;
        let Some(queue) = topics.get_mut(topic) else {
            return Ok(None);
        };
        Ok(match order {
            PopOrder::Fifo => queue.pop_front(),
            PopOrder::Lifo => queue.pop_back(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn tag_queue_requeue_moves_tag_to_back() {
        let q = MemoryTagQueue::new();
        for tag in ["a", "b", "c"] {
            assert!(q.push_back(Platform::Reddit, tag).await.unwrap());
        }
        q.requeue(Platform::Reddit, "a").await.unwrap();
        assert_eq!(q.list(Platform::Reddit).await.unwrap(), ["b", "c", "a"]);
        assert_eq!(
            q.peek_front(Platform::Reddit).await.unwrap().as_deref(),
            Some("b")
        );
    }

    #[tokio::test]
    async fn hot_rotation_seeds_only_hot_subreddits() {
        let file = TagsFile {
            reddit: vec!["sydney".to_owned()],
            reddit_hot: vec!["news".to_owned(), "australia".to_owned()],
            ..TagsFile::default()
        };
        let hot = MemoryTagQueue::from_rotation(&file, Rotation::Hot);
        assert_eq!(hot.list(Platform::Reddit).await.unwrap(), ["news", "australia"]);
        assert!(hot.list(Platform::Mastodon).await.unwrap().is_empty());

        let history = MemoryTagQueue::from_tags(&file);
        assert_eq!(history.list(Platform::Reddit).await.unwrap(), ["sydney"]);
    }

    #[tokio::test]
    async fn tag_queue_retire_is_idempotent() {
        let q = MemoryTagQueue::new();
        q.push_back(Platform::Mastodon, "auspol").await.unwrap();
        assert!(q.retire(Platform::Mastodon, "auspol").await.unwrap());
        assert!(!q.retire(Platform::Mastodon, "auspol").await.unwrap());
        assert!(q.peek_front(Platform::Mastodon).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn tag_queue_push_back_ignores_duplicates() {
        let q = MemoryTagQueue::new();
        assert!(q.push_back(Platform::Bluesky, "x").await.unwrap());
        assert!(!q.push_back(Platform::Bluesky, "x").await.unwrap());
        assert_eq!(q.list(Platform::Bluesky).await.unwrap(), ["x"]);
    }

    #[tokio::test]
    async fn platforms_are_independent() {
        let q = MemoryTagQueue::new();
        q.push_back(Platform::Reddit, "sydney").await.unwrap();
        assert!(q.peek_front(Platform::Mastodon).await.unwrap().is_none());

        let store = MemoryCursorStore::new();
        store
            .set(Platform::Reddit, "sydney", &Cursor::new("t3_a"))
            .await
            .unwrap();
        assert!(store.get(Platform::Mastodon, "sydney").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn message_queue_pops_in_requested_order() {
        let q = MemoryQueue::new();
        for msg in [b"1", b"2", b"3"] {
            q.push("reddit", msg).await.unwrap();
        }
        assert_eq!(
            q.pop("reddit", PopOrder::Fifo).await.unwrap().as_deref(),
            Some(&b"1"[..])
        );
        assert_eq!(
            q.pop("reddit", PopOrder::Lifo).await.unwrap().as_deref(),
            Some(&b"3"[..])
        );
        assert_eq!(q.len("reddit").await, 1);
        assert!(q.pop("elastic", PopOrder::Fifo).await.unwrap().is_none());
    }
}
