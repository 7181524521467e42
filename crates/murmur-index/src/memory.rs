//! In-process [`DocumentIndex`] for tests and dry runs.

use std::collections::HashMap;

use murmur_core::Envelope;
use tokio::sync::Mutex;

use crate::{DocumentIndex, IndexError, IndexOutcome};

#[derive(Debug, Default)]
pub struct MemoryIndex {
    documents: Mutex<HashMap<String, Envelope>>,
}

impl MemoryIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, id: &str) -> Option<Envelope> {
        self.documents.lock().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.documents.lock().await.len()
    }
}

impl DocumentIndex for MemoryIndex {
    async fn create_document(
        &self,
        id: &str,
        envelope: &Envelope,
    ) -> Result<IndexOutcome, IndexError> {
        let mut docs = self.documents.lock().await;
        if docs.contains_key(id) {
            return Ok(IndexOutcome::Duplicate);
        }
        docs.insert(id.to_owned(), envelope.clone());
        Ok(IndexOutcome::Created)
    }
}
