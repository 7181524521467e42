//! Filter execution: search, scroll until `max_docs`, clear the scroll.

use serde::Serialize;
use serde_json::Value;

use crate::client::{ElasticClient, SearchResponse};
use crate::error::IndexError;
use crate::query::{build_search_body, FilterRequest};

const SCROLL_KEEP_ALIVE: &str = "2m";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FilterResponse {
    /// Total matches reported by the index, which may exceed `data.len()`.
    pub total: u64,
    /// Source documents, each with its `_id`.
    pub data: Vec<Value>,
}

/// Run `request` against the index.
///
/// # Errors
///
/// Returns [`IndexError`] if the initial search or any scroll page fails.
/// Failing to clear the scroll afterwards is only logged.
pub async fn run_filter(
    client: &ElasticClient,
    request: &FilterRequest,
) -> Result<FilterResponse, IndexError> {
    let max_docs = request.max_docs();
    let body = build_search_body(request);

    let first = client.search(&body, SCROLL_KEEP_ALIVE).await?;
    let total = first.hits.total.as_ref().map_or(0, |t| t.value);
    let mut scroll_id = first.scroll_id.clone();
    let mut data = Vec::new();
    let mut page = first;

    let outcome = loop {
        let page_len = page.hits.hits.len();
        collect(&mut data, page, max_docs);
        if page_len == 0 || data.len() >= max_docs {
            break Ok(());
        }
        let Some(id) = scroll_id.as_deref() else {
            break Ok(());
        };
        match client.scroll(id, SCROLL_KEEP_ALIVE).await {
            Ok(next) => {
                if next.scroll_id.is_some() {
                    scroll_id.clone_from(&next.scroll_id);
                }
                page = next;
            }
            Err(e) => break Err(e),
        }
    };

    if let Some(id) = scroll_id.as_deref() {
        if let Err(e) = client.clear_scroll(id).await {
            tracing::warn!(error = %e, "failed to clear scroll context");
        }
    }
    outcome?;

    tracing::info!(total, returned = data.len(), "filter query complete");
    Ok(FilterResponse { total, data })
}

fn collect(data: &mut Vec<Value>, page: SearchResponse, max_docs: usize) {
    for hit in page.hits.hits {
        if data.len() >= max_docs {
            break;
        }
        let mut source = match hit.source {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        source.insert("_id".to_owned(), Value::String(hit.id));
        data.push(Value::Object(source));
    }
}
