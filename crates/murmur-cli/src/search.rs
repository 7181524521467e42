use murmur_core::AppConfig;
use murmur_index::{Combine, ElasticClient, FilterRequest};

pub(crate) fn request(
    content: Vec<String>,
    tags: Vec<String>,
    keywords: Vec<String>,
    or: bool,
    max_docs: Option<usize>,
) -> FilterRequest {
    FilterRequest {
        content,
        tags,
        keywords,
        combine: if or { Combine::Or } else { Combine::And },
        size: None,
        max_docs,
    }
}

/// Run a filter query and print the response as JSON.
///
/// # Errors
///
/// Returns an error if Elasticsearch is not configured or the query fails.
pub(crate) async fn run_search(config: &AppConfig, request: FilterRequest) -> anyhow::Result<()> {
    let client = ElasticClient::new(config.elastic_config()?, config.http_timeout_secs)?;
    let response = murmur_index::run_filter(&client, &request).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
