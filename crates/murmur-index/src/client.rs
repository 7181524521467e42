//! Elasticsearch REST client.

use std::time::Duration;

use murmur_core::{ElasticConfig, Envelope};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::IndexError;
use crate::{DocumentIndex, IndexOutcome};

/// Document IDs are opaque upstream strings; only unreserved characters pass.
const ID_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(rename = "_scroll_id")]
    pub scroll_id: Option<String>,
    pub hits: SearchHits,
}

#[derive(Debug, Deserialize)]
pub struct SearchHits {
    pub total: Option<HitsTotal>,
    #[serde(default)]
    pub hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
pub struct HitsTotal {
    pub value: u64,
}

#[derive(Debug, Deserialize)]
pub struct Hit {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_source", default)]
    pub source: Value,
}

#[derive(Clone)]
pub struct ElasticClient {
    http: Client,
    base: Url,
    index: String,
    username: Option<String>,
    password: Option<String>,
}

impl ElasticClient {
    /// # Errors
    ///
    /// Returns [`IndexError::InvalidBaseUrl`] if the configured URL cannot be
    /// parsed, or [`IndexError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &ElasticConfig, timeout_secs: u64) -> Result<Self, IndexError> {
        let mut client = Self::with_base_url(&config.url, &config.index, timeout_secs)?;
        client.username.clone_from(&config.username);
        client.password.clone_from(&config.password);
        Ok(client)
    }

    /// Unauthenticated client against `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::InvalidBaseUrl`] for an unparsable URL, or
    /// [`IndexError::Http`] if the HTTP client cannot be built.
    pub fn with_base_url(base_url: &str, index: &str, timeout_secs: u64) -> Result<Self, IndexError> {
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base = Url::parse(&normalised).map_err(|e| IndexError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;
        let http = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base,
            index: index.to_owned(),
            username: None,
            password: None,
        })
    }

    #[must_use]
    pub fn index(&self) -> &str {
        &self.index
    }

    fn url(&self, path: &str) -> Result<Url, IndexError> {
        self.base.join(path).map_err(|e| IndexError::InvalidBaseUrl {
            url: self.base.to_string(),
            reason: e.to_string(),
        })
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.username {
            Some(user) => request.basic_auth(user, self.password.as_ref()),
            None => request,
        }
    }

    /// Write `envelope` under `id` unless a document with that ID exists.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError`] on transport failure or any status other than
    /// 2xx or 409.
    pub async fn create_document(
        &self,
        id: &str,
        envelope: &Envelope,
    ) -> Result<IndexOutcome, IndexError> {
        let url = self.url(&format!(
            "{}/_create/{}",
            self.index,
            utf8_percent_encode(id, ID_SEGMENT)
        ))?;
        let response = self
            .authed(self.http.put(url))
            .json(envelope)
            .send()
            .await?;

        match response.status() {
            StatusCode::CONFLICT => Ok(IndexOutcome::Duplicate),
            status if status.is_success() => Ok(IndexOutcome::Created),
            _ => Err(unexpected(response).await),
        }
    }

    /// Run a search, opening a scroll context kept alive for `keep_alive`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError`] on transport failure, a non-2xx status, or an
    /// undecodable body.
    pub async fn search(&self, body: &Value, keep_alive: &str) -> Result<SearchResponse, IndexError> {
        let mut url = self.url(&format!("{}/_search", self.index))?;
        url.query_pairs_mut().append_pair("scroll", keep_alive);
        let response = self.authed(self.http.post(url)).json(body).send().await?;
        read_json(response, "search response").await
    }

    /// Fetch the next page of an open scroll.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError`] on transport failure, a non-2xx status, or an
    /// undecodable body.
    pub async fn scroll(&self, scroll_id: &str, keep_alive: &str) -> Result<SearchResponse, IndexError> {
        let url = self.url("_search/scroll")?;
        let response = self
            .authed(self.http.post(url))
            .json(&json!({ "scroll": keep_alive, "scroll_id": scroll_id }))
            .send()
            .await?;
        read_json(response, "scroll response").await
    }

    /// Release a scroll context.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError`] on transport failure or a non-2xx status.
    pub async fn clear_scroll(&self, scroll_id: &str) -> Result<(), IndexError> {
        let url = self.url("_search/scroll")?;
        let response = self
            .authed(self.http.delete(url))
            .json(&json!({ "scroll_id": [scroll_id] }))
            .send()
            .await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(unexpected(response).await)
        }
    }
}

impl std::fmt::Debug for ElasticClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElasticClient")
            .field("base", &self.base.as_str())
            .field("index", &self.index)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[redacted]"))
            .finish_non_exhaustive()
    }
}

impl DocumentIndex for ElasticClient {
    async fn create_document(
        &self,
        id: &str,
        envelope: &Envelope,
    ) -> Result<IndexOutcome, IndexError> {
        ElasticClient::create_document(self, id, envelope).await
    }
}

async fn unexpected(response: Response) -> IndexError {
    let status = response.status().as_u16();
    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    IndexError::UnexpectedStatus { status, url, body }
}

async fn read_json<T: serde::de::DeserializeOwned>(
    response: Response,
    context: &str,
) -> Result<T, IndexError> {
    if !response.status().is_success() {
        return Err(unexpected(response).await);
    }
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| IndexError::Deserialize {
        context: context.to_owned(),
        source: e,
    })
}
