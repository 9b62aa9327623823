use crate::errors::{AppError, AppResult};
use scraper::{Html, Selector};
use std::time::Duration;

/// One outbound lookup per call; `None` means the price is unavailable.
/// Implementations must swallow transport and parse failures (logging them)
/// rather than surface errors to callers.
pub trait PriceSource: Send + Sync {
    fn lookup(&self, item_name: &str) -> Option<f64>;
}

/// Scrapes a search page for the first `span.price` element. Brittle and
/// site-specific by nature; the trait keeps it swappable.
pub struct WebPriceSource {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl WebPriceSource {
    pub fn new(base_url: &str, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AppError::Lookup(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn fetch(&self, item_name: &str) -> AppResult<Option<f64>> {
        let url = format!("{}?q={}", self.base_url, item_name.replace(' ', "+"));
        let body = self
            .client
            .get(&url)
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(|err| AppError::Lookup(err.to_string()))?
            .text()
            .map_err(|err| AppError::Lookup(err.to_string()))?;
        Ok(extract_price(&body))
    }
}

impl PriceSource for WebPriceSource {
    fn lookup(&self, item_name: &str) -> Option<f64> {
        match self.fetch(item_name) {
            Ok(price) => price,
            Err(err) => {
                tracing::warn!(item = item_name, error = %err, "price lookup failed");
                None
            }
        }
    }
}

fn extract_price(body: &str) -> Option<f64> {
    let document = Html::parse_document(body);
    let selector = Selector::parse("span.price").ok()?;
    let tag = document.select(&selector).next()?;
    let text: String = tag.text().collect();
    parse_price_text(&text)
}

fn parse_price_text(text: &str) -> Option<f64> {
    let cleaned = text.trim().trim_start_matches('$').replace(',', "");
    cleaned.trim().parse::<f64>().ok().filter(|price| price.is_finite() && *price >= 0.0)
}
