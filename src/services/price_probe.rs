// src/services/price_probe.rs
use async_trait::async_trait;
use log::{debug, info, warn};
use rand::seq::SliceRandom;
use regex::Regex;
use reqwest::{Client, StatusCode};
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;

/// Labels the quote page puts in front of the last traded price.
const PRICE_LABELS: [&str; 2] = ["成交", "Price"];

/// Older page layouts always put the traded price in the first detail item.
const FALLBACK_SELECTOR: &str = "li.price-detail-item";
const FALLBACK_INDEX: usize = 0;

/// First number in a cell, sign included so a negative reading is not taken as a price.
static PRICE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d[\d,]*(?:\.\d+)?").expect("valid price pattern"));

const USER_AGENTS: [&str; 4] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Mobile/15E148",
];

/// Best-effort lookup of the current traded price. Implementations never fail:
/// anything that goes wrong is reported as `None`.
#[async_trait]
pub trait PriceProbe: Send + Sync {
    async fn fetch_price(&self, ticker: &str) -> Option<f64>;
}

#[derive(Debug, Error)]
enum ProbeError {
    #[error("invalid ticker {0:?}")]
    InvalidTicker(String),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("quote page answered {0}")]
    Status(StatusCode),
    #[error("no price on quote page")]
    PriceNotFound,
}

/// Scrapes the per-ticker quote page at `{base_url}/{ticker}`.
pub struct QuotePageProbe {
    base_url: String,
    client: Client,
}

impl QuotePageProbe {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(QuotePageProbe {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn try_fetch(&self, ticker: &str) -> Result<f64, ProbeError> {
        if ticker.is_empty()
            || !ticker
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '.')
        {
            return Err(ProbeError::InvalidTicker(ticker.to_string()));
        }

        let url = format!("{}/{}", self.base_url, ticker);
        let user_agent = USER_AGENTS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(USER_AGENTS[0]);
        debug!("Fetching quote page {} as {:?}", url, user_agent);

        let response = self
            .client
            .get(&url)
            .header("User-Agent", user_agent)
            .send()
            .await?;
        if response.status() != StatusCode::OK {
            return Err(ProbeError::Status(response.status()));
        }

        let body = response.text().await?;
        parse_quote_page(&body).ok_or(ProbeError::PriceNotFound)
    }
}

#[async_trait]
impl PriceProbe for QuotePageProbe {
    async fn fetch_price(&self, ticker: &str) -> Option<f64> {
        match self.try_fetch(ticker).await {
            Ok(price) => {
                info!("Live price for {}: {}", ticker, price);
                Some(price)
            }
            Err(e) => {
                warn!("Live price for {} unavailable: {}", ticker, e);
                None
            }
        }
    }
}

/// Stands in for the quote page in offline runs and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedPriceProbe(pub Option<f64>);

#[async_trait]
impl PriceProbe for FixedPriceProbe {
    async fn fetch_price(&self, _ticker: &str) -> Option<f64> {
        self.0
    }
}

/// Finds the traded price in a quote page: first the list item labelled as the
/// traded price, then the fixed position older layouts used.
pub fn parse_quote_page(html: &str) -> Option<f64> {
    let document = Html::parse_document(html);
    let item_selector = Selector::parse("li").ok()?;
    let span_selector = Selector::parse("span").ok()?;

    let labelled = document.select(&item_selector).find_map(|item| {
        let spans: Vec<ElementRef> = item.select(&span_selector).collect();
        let label_at = spans
            .iter()
            .position(|span| PRICE_LABELS.contains(&element_text(span).as_str()))?;
        spans.get(label_at + 1).and_then(|span| price_from_text(&element_text(span)))
    });
    if labelled.is_some() {
        return labelled;
    }

    debug!("No labelled price item, trying fallback position");
    let fallback_selector = Selector::parse(FALLBACK_SELECTOR).ok()?;
    let item = document.select(&fallback_selector).nth(FALLBACK_INDEX)?;
    let value_span = item.select(&span_selector).last()?;
    price_from_text(&element_text(&value_span))
}

fn element_text(element: &ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn price_from_text(text: &str) -> Option<f64> {
    let matched = PRICE_PATTERN.find(text)?.as_str().replace(',', "");
    matched.parse::<f64>().ok().filter(|p| p.is_finite() && *p > 0.0)
}
