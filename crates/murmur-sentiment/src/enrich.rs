//! Enrichment worker: platform topic in, `elastic` topic out.

use murmur_core::{
    strip_html, validate, Envelope, MessageQueue, Platform, PopOrder, Stage, ELASTIC_TOPIC,
};

use crate::eligibility::check_eligible;
use crate::error::SentimentError;
use crate::keywords::{extract_keywords, MAX_KEYWORDS};
use crate::scorer::lexicon_score;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichReport {
    pub popped: usize,
    pub enriched: usize,
    /// Undecodable, invalid, or ineligible messages.
    pub dropped: usize,
    /// Enriched messages that could not be forwarded and went back on the
    /// platform topic.
    pub push_failures: usize,
}

/// Score and tag one harvested envelope.
///
/// Content is reduced to plain text for scoring; the stored content is left
/// as harvested.
///
/// # Errors
///
/// Returns [`SentimentError::Ineligible`] when the text is too short or not
/// predominantly Latin script.
pub fn enrich(mut envelope: Envelope) -> Result<Envelope, SentimentError> {
    let text = strip_html(&envelope.data.content);
    check_eligible(&text).map_err(|reason| SentimentError::Ineligible {
        id: envelope.document_id(),
        reason,
    })?;

    let score = lexicon_score(&text);
    let keywords = extract_keywords(&text, MAX_KEYWORDS);
    envelope.apply_enrichment(score, keywords);
    Ok(envelope)
}

/// Pop up to `limit` messages from `topic`, enrich them, and push each result
/// to [`ELASTIC_TOPIC`].
///
/// A bad message is dropped and logged; it never aborts the batch. When an
/// enriched message cannot be forwarded, the original payload is pushed back
/// onto `topic` and the batch stops.
///
/// # Errors
///
/// Returns [`SentimentError::UnknownTopic`] if `topic` is not a platform
/// topic, or [`SentimentError::Store`] if popping from the queue fails or a
/// message cannot be returned to `topic`.
pub async fn process_batch<Q: MessageQueue>(
    queue: &Q,
    topic: &str,
    limit: usize,
) -> Result<EnrichReport, SentimentError> {
    let platform: Platform = topic
        .parse()
        .map_err(|_| SentimentError::UnknownTopic(topic.to_owned()))?;
    let mut report = EnrichReport::default();

    while report.popped < limit {
        let Some(payload) = queue.pop(topic, PopOrder::Fifo).await? else {
            break;
        };
        report.popped += 1;

        let enriched = match decode_and_enrich(&payload) {
            Ok(env) => env,
            Err(SentimentError::Ineligible { id, reason }) => {
                tracing::info!(%platform, id = %id, %reason, "ineligible post dropped");
                report.dropped += 1;
                continue;
            }
            Err(e) => {
                tracing::warn!(%platform, error = %e, "message dropped");
                report.dropped += 1;
                continue;
            }
        };

        let forwarded = match serde_json::to_vec(&enriched) {
            Ok(bytes) => queue
                .push(ELASTIC_TOPIC, &bytes)
                .await
                .map_err(SentimentError::from),
            Err(e) => Err(e.into()),
        };
        if let Err(e) = forwarded {
            tracing::warn!(
                %platform,
                id = %enriched.document_id(),
                topic,
                error = %e,
                "forwarding to elastic topic failed; message returned"
            );
            report.push_failures += 1;
            if let Err(restore) = queue.push(topic, &payload).await {
                tracing::error!(
                    %platform,
                    id = %enriched.document_id(),
                    error = %restore,
                    "could not return message to its topic"
                );
                return Err(restore.into());
            }
            break;
        }
        report.enriched += 1;
    }

    tracing::info!(
        %platform,
        popped = report.popped,
        enriched = report.enriched,
        dropped = report.dropped,
        push_failures = report.push_failures,
        "enrichment batch complete"
    );
    Ok(report)
}

fn decode_and_enrich(payload: &[u8]) -> Result<Envelope, SentimentError> {
    let value: serde_json::Value = serde_json::from_slice(payload)?;
    let envelope = validate(&value, Stage::Harvested)?;
    enrich(envelope)
}
