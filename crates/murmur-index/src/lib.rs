//! Search index collaborator: Elasticsearch over HTTP.
//!
//! Documents are written create-only under `{platform}_{post id}` so that
//! re-harvested posts never overwrite or duplicate an indexed one.

pub mod client;
pub mod error;
pub mod memory;
pub mod query;
pub mod search;
pub mod worker;

use std::future::Future;

use murmur_core::Envelope;

pub use client::{ElasticClient, SearchHits, SearchResponse};
pub use error::IndexError;
pub use memory::MemoryIndex;
pub use query::{build_search_body, Combine, FilterRequest, DEFAULT_MAX_DOCS, DEFAULT_PAGE_SIZE};
pub use search::{run_filter, FilterResponse};
pub use worker::{index_batch, IndexReport};

/// Result of a create-only write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOutcome {
    Created,
    /// A document with this ID already exists; nothing was written.
    Duplicate,
}

/// Create-if-absent document store.
pub trait DocumentIndex: Send + Sync {
    fn create_document(
        &self,
        id: &str,
        envelope: &Envelope,
    ) -> impl Future<Output = Result<IndexOutcome, IndexError>> + Send;
}
