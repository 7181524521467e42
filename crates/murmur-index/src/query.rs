//! Filter request to Elasticsearch query translation.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const DEFAULT_PAGE_SIZE: u32 = 1000;
pub const DEFAULT_MAX_DOCS: usize = 500_000;

/// Fields returned for each matching document.
const SOURCE_FIELDS: &[&str] = &[
    "platform",
    "sentiment",
    "sentimentLabel",
    "keywords",
    "data.createdAt",
    "data.tags",
];

/// How the content, tag, and keyword clauses are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Combine {
    #[default]
    And,
    Or,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterRequest {
    /// Words matched against post content.
    pub content: Vec<String>,
    /// Exact post tags.
    pub tags: Vec<String>,
    /// Exact enrichment keywords.
    pub keywords: Vec<String>,
    pub combine: Combine,
    /// Documents per scroll page.
    pub size: Option<u32>,
    /// Stop collecting after this many documents.
    pub max_docs: Option<usize>,
}

impl FilterRequest {
    #[must_use]
    pub fn page_size(&self) -> u32 {
        self.size.filter(|s| *s > 0).unwrap_or(DEFAULT_PAGE_SIZE)
    }

    #[must_use]
    pub fn max_docs(&self) -> usize {
        self.max_docs.unwrap_or(DEFAULT_MAX_DOCS)
    }
}

/// The bool query for `request`. Empty or blank terms are ignored; with no
/// terms left the query matches nothing.
#[must_use]
pub fn build_query(request: &FilterRequest) -> Value {
    let content = cleaned(&request.content, false);
    let tags = cleaned(&request.tags, true);
    let keywords = cleaned(&request.keywords, true);

    let operator = match request.combine {
        Combine::And => "and",
        Combine::Or => "or",
    };
    let content_clause = (!content.is_empty()).then(|| {
        json!({
            "simple_query_string": {
                "query": content.join(" "),
                "fields": ["data.content"],
                "default_operator": operator,
            }
        })
    });
    let tags_clause = (!tags.is_empty()).then(|| json!({ "terms": { "data.tags": tags } }));
    let keywords_clause =
        (!keywords.is_empty()).then(|| json!({ "terms": { "keywords": keywords } }));

    if content_clause.is_none() && tags_clause.is_none() && keywords_clause.is_none() {
        return json!({ "match_none": {} });
    }

    match request.combine {
        Combine::And => {
            let must: Vec<Value> = content_clause.into_iter().collect();
            let filter: Vec<Value> = tags_clause.into_iter().chain(keywords_clause).collect();
            json!({ "bool": { "must": must, "filter": filter } })
        }
        Combine::Or => {
            let should: Vec<Value> = content_clause
                .into_iter()
                .chain(tags_clause)
                .chain(keywords_clause)
                .collect();
            json!({ "bool": { "should": should, "minimum_should_match": 1 } })
        }
    }
}

/// Full search body: query, newest-first sort, source filter, page size.
#[must_use]
pub fn build_search_body(request: &FilterRequest) -> Value {
    json!({
        "query": build_query(request),
        "sort": [{ "data.createdAt": { "order": "desc" } }],
        "_source": SOURCE_FIELDS,
        "size": request.page_size(),
    })
}

fn cleaned(terms: &[String], lowercase: bool) -> Vec<String> {
    terms
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(|t| if lowercase { t.to_lowercase() } else { t.to_owned() })
        .collect()
}
