//! Review source backed by a hosted scraping actor
//!
//! Calls the actor's synchronous run endpoint, which returns the dataset items
//! directly. Actors disagree on their input schema, so each known shape is
//! tried in turn until one is accepted.

use async_trait::async_trait;
use reqwest::Client;
use revu_config::SourceConfig;
use revu_interfaces::{Checkpoint, FetchRequest, FetchedReviews, ProductInfo, ReviewSource, SourceError};
use serde_json::{json, Map, Value as JsonValue};
use tracing::{debug, info, warn};
use url::Url;

/// Item keys that may carry the product's total review count
const REVIEW_COUNT_KEYS: &[&str] = &[
    "countReviews",
    "countRatings",
    "reviewsCount",
    "reviews_count",
    "reviewCount",
    "totalReviews",
    "reviewsTotal",
    "review_count",
    "numReviews",
    "total_review_count",
    "count_ratings",
    "count_reviews",
];

/// Upper bound on pages requested from paging actors
const MAX_ACTOR_PAGES: usize = 10;

/// Longest upstream error body kept in an error message
const MAX_ERROR_BODY: usize = 300;

pub struct ApifySource {
    client: Client,
    config: SourceConfig,
}

impl ApifySource {
    pub fn new(config: SourceConfig) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("revu/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SourceError::Request(e.to_string()))?;
        Ok(Self { client, config })
    }

    /// Synchronous run endpoint; actor ids use `~` in place of `/`
    fn endpoint(&self, token: &str) -> Result<Url, SourceError> {
        let raw = format!(
            "{}/v2/acts/{}/run-sync-get-dataset-items",
            self.config.base_url.trim_end_matches('/'),
            self.config.actor.replace('/', "~")
        );
        let mut url = Url::parse(&raw).map_err(|e| SourceError::Request(e.to_string()))?;
        url.query_pairs_mut().append_pair("token", token);
        Ok(url)
    }

    async fn run_actor(&self, endpoint: Url, input: &JsonValue) -> Result<Vec<JsonValue>, SourceError> {
        let response = self
            .client
            .post(endpoint)
            .json(input)
            .send()
            .await
            .map_err(|e| SourceError::Request(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let mut message = response.text().await.unwrap_or_default();
            if message.len() > MAX_ERROR_BODY {
                let cut = (0..=MAX_ERROR_BODY)
                    .rev()
                    .find(|i| message.is_char_boundary(*i))
                    .unwrap_or(0);
                message.truncate(cut);
            }
            return Err(SourceError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let body: JsonValue = response
            .json()
            .await
            .map_err(|e| SourceError::Decode(e.without_url().to_string()))?;
        match body {
            JsonValue::Array(items) => Ok(items),
            other => Err(SourceError::Decode(format!(
                "expected a list of dataset items, got {}",
                json_kind(&other)
            ))),
        }
    }
}

#[async_trait]
impl ReviewSource for ApifySource {
    fn source_name(&self) -> &str {
        "apify"
    }

    fn actor(&self) -> Option<&str> {
        Some(&self.config.actor)
    }

    async fn fetch_reviews(
        &self,
        request: &FetchRequest,
        checkpoint: &dyn Checkpoint,
    ) -> Result<FetchedReviews, SourceError> {
        let token = self
            .config
            .api_token
            .as_deref()
            .ok_or_else(|| SourceError::Request("source API token is not configured".to_string()))?;

        let mut last_error = None;
        for (shape, input) in input_shapes(&self.config.actor, request) {
            checkpoint.checkpoint().await?;
            debug!("Running actor {} with {} input", self.config.actor, shape);

            match self.run_actor(self.endpoint(token)?, &input).await {
                Ok(mut items) => {
                    let product = extract_product_info(&items);
                    items.truncate(request.max_reviews);
                    info!("Actor returned {} items for {}", items.len(), request.asin);
                    return Ok(FetchedReviews { items, product });
                }
                Err(err)
                    if matches!(&err, SourceError::Upstream { status, .. } if is_input_rejection(*status)) =>
                {
                    warn!("Actor rejected {} input: {}", shape, err);
                    last_error = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        Err(last_error.unwrap_or_else(|| SourceError::Request("no actor input was accepted".to_string())))
    }
}

/// Client errors other than auth failures mean the input shape was wrong
fn is_input_rejection(status: u16) -> bool {
    (400..500).contains(&status) && status != 401 && status != 403
}

/// Candidate actor inputs in the order they should be tried
pub fn input_shapes(actor: &str, request: &FetchRequest) -> Vec<(&'static str, JsonValue)> {
    let pages = request
        .max_reviews
        .div_ceil(10)
        .clamp(1, request.max_pages.clamp(1, MAX_ACTOR_PAGES));
    let entry = json!({
        "asin": request.asin,
        "domainCode": request.domain_code,
        "maxPages": pages,
    });

    let flat = (
        "flat",
        json!({
            "asin": [request.asin],
            "maxReviews": request.max_reviews,
            "country": country_for_domain(&request.domain_code),
        }),
    );
    let nested_list = ("nested_list", json!({ "input": [entry.clone()] }));
    let nested_object = ("nested_object", json!({ "input": { "input": [entry] } }));

    if actor.starts_with("axesso") || actor.contains("/axesso") {
        vec![nested_object, nested_list, flat]
    } else {
        vec![flat, nested_list, nested_object]
    }
}

/// Country code expected by actors for a marketplace domain code
pub fn country_for_domain(domain_code: &str) -> &'static str {
    match domain_code.to_lowercase().as_str() {
        "in" => "IN",
        "co.uk" => "UK",
        "ca" => "CA",
        "de" => "DE",
        "fr" => "FR",
        "it" => "IT",
        "es" => "ES",
        "com.br" => "BR",
        "com.au" => "AU",
        "com.mx" => "MX",
        "co.jp" => "JP",
        _ => "US",
    }
}

/// Product facts carried by the dataset items themselves
pub fn extract_product_info(items: &[JsonValue]) -> ProductInfo {
    let count_reviews = items
        .iter()
        .filter_map(JsonValue::as_object)
        .find_map(review_count);

    let Some(first) = items.first().and_then(JsonValue::as_object) else {
        return ProductInfo {
            count_reviews,
            ..Default::default()
        };
    };

    let product = ["product", "productInfo", "details"]
        .iter()
        .find_map(|key| first.get(*key).and_then(JsonValue::as_object));

    let product_name = first_present(first, &["productTitle", "productName"])
        .or_else(|| product.and_then(|p| first_present(p, &["title", "name"])))
        .or_else(|| first_present(first, &["itemName", "asin"]));

    let price = first_present(first, &["productPrice", "currentPrice", "price"])
        .or_else(|| product.and_then(|p| first_present(p, &["price", "currentPrice", "amount"])))
        .or_else(|| first_present(first, &["priceString", "cost", "amount"]));

    ProductInfo {
        product_name,
        count_reviews,
        price,
    }
}

fn review_count(item: &Map<String, JsonValue>) -> Option<u64> {
    let nested = item.get("product").and_then(JsonValue::as_object);
    REVIEW_COUNT_KEYS.iter().find_map(|key| {
        item.get(*key)
            .and_then(as_count)
            .or_else(|| nested.and_then(|p| p.get(*key)).and_then(as_count))
    })
}

fn as_count(value: &JsonValue) -> Option<u64> {
    let count = match value {
        JsonValue::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f as u64)),
        JsonValue::String(s) => s.replace(',', "").trim().parse().ok(),
        _ => None,
    }?;
    (count > 0).then_some(count)
}

/// First non-empty scalar under any of `keys`, as text
fn first_present(map: &Map<String, JsonValue>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match map.get(*key)? {
        JsonValue::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "a list",
        JsonValue::Object(_) => "an object",
    }
}
