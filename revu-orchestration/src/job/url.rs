use once_cell::sync::Lazy;
use regex::Regex;

use super::JobError;

static ASIN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/(?:dp|gp/product|product-reviews)/([A-Za-z0-9]{10})").expect("ASIN pattern is valid")
});

static DOMAIN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"amazon\.([a-z.]+)").expect("marketplace pattern is valid"));

/// Product identity extracted from a product page URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductUrl {
    pub asin: String,
    /// Marketplace domain code, `com` when the host does not say
    pub domain_code: String,
}

pub fn parse_product_url(url: &str) -> Result<ProductUrl, JobError> {
    let asin = ASIN_PATTERN
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| JobError::Failed("Invalid Amazon URL: ASIN not found".to_string()))?;

    let lowered = url.to_lowercase();
    let domain_code = DOMAIN_PATTERN
        .captures(&lowered)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim_end_matches('.').to_string())
        .filter(|code| !code.is_empty())
        .unwrap_or_else(|| "com".to_string());

    Ok(ProductUrl { asin, domain_code })
}
