//! Indexing worker: drains the `elastic` topic into the index.

use murmur_core::{validate, Envelope, MessageQueue, PopOrder, Stage, ELASTIC_TOPIC};

use crate::error::IndexError;
use crate::{DocumentIndex, IndexOutcome};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexReport {
    pub popped: usize,
    pub created: usize,
    pub duplicates: usize,
    /// Undecodable or invalid messages.
    pub dropped: usize,
    /// Messages put back on the topic after a transient index failure.
    pub requeued: usize,
    /// Messages the index refused outright, such as a mapping conflict.
    pub rejected: usize,
}

/// Pop up to `limit` enriched envelopes and write each create-only.
///
/// A message that fails validation is dropped, and so is one the index
/// rejects with a permanent error. On a transient index failure the message
/// is pushed back onto the topic and the batch stops, so an outage does not
/// drain the queue.
///
/// # Errors
///
/// Returns [`IndexError::Store`] if the queue cannot be read, or the index
/// error if the failed message could not be pushed back.
pub async fn index_batch<Q, I>(queue: &Q, index: &I, limit: usize) -> Result<IndexReport, IndexError>
where
    Q: MessageQueue,
    I: DocumentIndex,
{
    let mut report = IndexReport::default();

    while report.popped < limit {
        let Some(payload) = queue.pop(ELASTIC_TOPIC, PopOrder::Fifo).await? else {
            break;
        };
        report.popped += 1;

        let envelope = match decode(&payload) {
            Ok(env) => env,
            Err(reason) => {
                tracing::warn!(%reason, "message dropped before indexing");
                report.dropped += 1;
                continue;
            }
        };

        let id = envelope.document_id();
        match index.create_document(&id, &envelope).await {
            Ok(IndexOutcome::Created) => {
                tracing::debug!(id = %id, "document indexed");
                report.created += 1;
            }
            Ok(IndexOutcome::Duplicate) => {
                tracing::debug!(id = %id, "document already indexed");
                report.duplicates += 1;
            }
            Err(e) if e.is_transient() => {
                tracing::warn!(id = %id, error = %e, "indexing failed; message requeued");
                queue.push(ELASTIC_TOPIC, &payload).await?;
                report.requeued += 1;
                break;
            }
            Err(e) => {
                tracing::error!(id = %id, error = %e, "index rejected document; message dropped");
                report.rejected += 1;
            }
        }
    }

    tracing::info!(
        popped = report.popped,
        created = report.created,
        duplicates = report.duplicates,
        dropped = report.dropped,
        requeued = report.requeued,
        rejected = report.rejected,
        "indexing batch complete"
    );
    Ok(report)
}

fn decode(payload: &[u8]) -> Result<Envelope, String> {
    let value: serde_json::Value = serde_json::from_slice(payload).map_err(|e| e.to_string())?;
    validate(&value, Stage::Enriched).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use murmur_core::{Account, Platform, Post};
    use murmur_harvest::MemoryQueue;

    use super::*;
    use crate::MemoryIndex;

    fn enriched(id: &str) -> Envelope {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let mut env = Envelope::new(
            Platform::Reddit,
            Post {
                id: id.to_owned(),
                created_at: at,
                content: "Ferry timetable changes".to_owned(),
                sensitive: false,
                favourites_count: 3,
                replies_count: 1,
                tags: vec!["sydney".to_owned()],
                url: format!("https://www.reddit.com/comments/{id}"),
                account: Account::deleted(),
            },
            at,
        );
        env.apply_enrichment(0.2, vec!["ferry".to_owned()]);
        env
    }

    async fn push(queue: &MemoryQueue, value: &impl serde::Serialize) {
        queue
            .push(ELASTIC_TOPIC, &serde_json::to_vec(value).unwrap())
            .await
            .unwrap();
    }

    /// Index that answers every write with `status`.
    struct FailingIndex {
        status: u16,
    }

    impl DocumentIndex for FailingIndex {
        async fn create_document(
            &self,
            id: &str,
            _envelope: &Envelope,
        ) -> Result<IndexOutcome, IndexError> {
            Err(IndexError::UnexpectedStatus {
                status: self.status,
                url: format!("http://es/socialplatform/_create/{id}"),
                body: String::new(),
            })
        }
    }

    #[tokio::test]
    async fn same_document_twice_is_indexed_once() {
        let queue = MemoryQueue::new();
        let index = MemoryIndex::new();
        push(&queue, &enriched("abc")).await;
        push(&queue, &enriched("abc")).await;
        push(&queue, &enriched("abd")).await;

        let report = index_batch(&queue, &index, 10).await.unwrap();

        assert_eq!(report.created, 2);
        assert_eq!(report.duplicates, 1);
        assert_eq!(index.len().await, 2);
        assert!(index.get("reddit_abc").await.is_some());
    }

    #[tokio::test]
    async fn unenriched_envelope_is_dropped() {
        let queue = MemoryQueue::new();
        let index = MemoryIndex::new();
        let mut raw = enriched("x1");
        raw.sentiment = None;
        raw.sentiment_label = None;
        push(&queue, &raw).await;

        let mut out_of_range = serde_json::to_value(enriched("x2")).unwrap();
        out_of_range["sentiment"] = serde_json::json!(1.5);
        push(&queue, &out_of_range).await;

        let report = index_batch(&queue, &index, 10).await.unwrap();

        assert_eq!(report.dropped, 2);
        assert_eq!(index.len().await, 0);
    }

    #[tokio::test]
    async fn index_failure_requeues_and_stops() {
        let queue = MemoryQueue::new();
        push(&queue, &enriched("a")).await;
        push(&queue, &enriched("b")).await;

        let report = index_batch(&queue, &FailingIndex { status: 503 }, 10)
            .await
            .unwrap();

        assert_eq!(report.popped, 1);
        assert_eq!(report.requeued, 1);
        assert_eq!(queue.len(ELASTIC_TOPIC).await, 2, "nothing lost");
    }

    #[tokio::test]
    async fn rejected_document_is_dropped_and_batch_continues() {
        let queue = MemoryQueue::new();
        push(&queue, &enriched("a")).await;
        push(&queue, &enriched("b")).await;

        let report = index_batch(&queue, &FailingIndex { status: 400 }, 10)
            .await
            .unwrap();

        assert_eq!(report.popped, 2);
        assert_eq!(report.rejected, 2);
        assert_eq!(report.requeued, 0);
        assert_eq!(queue.len(ELASTIC_TOPIC).await, 0);
    }
}
