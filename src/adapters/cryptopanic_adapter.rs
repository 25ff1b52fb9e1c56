//! CryptoPanic news sentiment adapter.
//!
//! The free tier allows only a handful of requests per hour, so the
//! global feed is fetched at most once per poll interval into a local
//! cache and searched per symbol. Keyword matching decides the label.
//! Every failure path degrades to Neutral; this adapter never errors.

use reqwest::blocking::Client;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::domain::error::KestrelError;
use crate::domain::signal::Sentiment;
use crate::ports::sentiment_port::SentimentPort;

const CRYPTOPANIC_URL: &str = "https://cryptopanic.com/api/v1/posts/";
const FEAR_GREED_URL: &str = "https://api.alternative.me/fng/";

const BULLISH_KEYWORDS: &[&str] = &[
    "partnership",
    "launch",
    "mainnet",
    "blackrock",
    "etf",
    "integration",
    "approval",
    "upgrade",
];

const BEARISH_KEYWORDS: &[&str] = &[
    "hack", "exploit", "delist", "ban", "lawsuit", "breach", "scam", "fraud",
];

/// Common ticker-to-name aliases for title matching.
const SYMBOL_NAMES: &[(&str, &[&str])] = &[
    ("BTC", &["bitcoin"]),
    ("ETH", &["ethereum"]),
    ("BNB", &["binance coin", "bnb"]),
    ("SOL", &["solana"]),
    ("XRP", &["ripple", "xrp"]),
    ("ADA", &["cardano"]),
    ("DOGE", &["dogecoin"]),
    ("AVAX", &["avalanche"]),
    ("DOT", &["polkadot"]),
    ("MATIC", &["polygon"]),
    ("LINK", &["chainlink"]),
    ("SHIB", &["shiba"]),
    ("LTC", &["litecoin"]),
    ("UNI", &["uniswap"]),
    ("ATOM", &["cosmos"]),
];

#[derive(Debug, Clone)]
struct Article {
    /// Lowercased headline.
    title: String,
    /// Uppercased currency codes tagged by the feed.
    currencies: Vec<String>,
}

pub struct CryptopanicAdapter {
    client: Client,
    api_key: Option<String>,
    poll_interval: Duration,
    cache: Vec<Article>,
    last_update: Option<Instant>,
}

impl CryptopanicAdapter {
    pub fn new(
        api_key: Option<String>,
        poll_interval: Duration,
    ) -> Result<CryptopanicAdapter, KestrelError> {
        if api_key.is_none() {
            warn!("no CryptoPanic API key configured, news sentiment disabled");
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent("kestrel/0.1")
            .build()
            .map_err(|e| KestrelError::Fetch {
                context: "news client".to_string(),
                reason: e.to_string(),
            })?;
        Ok(CryptopanicAdapter {
            client,
            api_key,
            poll_interval,
            cache: Vec::new(),
            last_update: None,
        })
    }

    /// Refresh the global feed cache when the poll interval has elapsed.
    /// A failed fetch keeps the stale cache and retries on the next call.
    fn refresh_cache(&mut self) {
        let fresh = self
            .last_update
            .is_some_and(|at| at.elapsed() < self.poll_interval);
        if fresh {
            return;
        }
        let Some(api_key) = self.api_key.clone() else {
            return;
        };

        let body: Result<Value, reqwest::Error> = self
            .client
            .get(CRYPTOPANIC_URL)
            .query(&[("auth_token", api_key.as_str()), ("public", "true")])
            .send()
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.json());

        let body = match body {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "news feed fetch failed, keeping stale cache");
                return;
            }
        };

        self.cache = body
            .get("results")
            .and_then(Value::as_array)
            .map(|results| results.iter().map(parse_article).collect())
            .unwrap_or_default();
        self.last_update = Some(Instant::now());
        info!(articles = self.cache.len(), "news cache updated");
    }

    fn fetch_fear_and_greed(&self) -> Result<(u8, String), KestrelError> {
        let fetch_err = |reason: String| KestrelError::Fetch {
            context: "fear & greed".to_string(),
            reason,
        };

        let body: Value = self
            .client
            .get(FEAR_GREED_URL)
            .send()
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.json())
            .map_err(|e| fetch_err(e.to_string()))?;

        let entry = body
            .get("data")
            .and_then(Value::as_array)
            .and_then(|data| data.first())
            .ok_or_else(|| fetch_err("empty index response".to_string()))?;

        let value: u8 = entry
            .get("value")
            .and_then(Value::as_str)
            .and_then(|raw| raw.parse().ok())
            .ok_or_else(|| fetch_err("malformed index value".to_string()))?;
        let classification = entry
            .get("value_classification")
            .and_then(Value::as_str)
            .unwrap_or("Neutral")
            .to_string();

        Ok((value, classification))
    }
}

impl SentimentPort for CryptopanicAdapter {
    fn sentiment_for(&mut self, symbol: &str) -> Sentiment {
        self.refresh_cache();

        let base = base_symbol(symbol);
        let terms = search_terms(&base);
        let relevant = relevant_articles(&self.cache, &base, &terms);
        if relevant.is_empty() {
            return Sentiment::Neutral;
        }

        let label = score_articles(&relevant);
        debug!(symbol, articles = relevant.len(), sentiment = %label, "news sentiment");
        label
    }

    fn fear_and_greed(&mut self) -> (u8, String) {
        match self.fetch_fear_and_greed() {
            Ok(reading) => reading,
            Err(e) => {
                warn!(error = %e, "fear & greed fetch failed, assuming neutral");
                (50, "Neutral".to_string())
            }
        }
    }
}

fn parse_article(value: &Value) -> Article {
    let title = value
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_lowercase();
    let currencies = value
        .get("currencies")
        .and_then(Value::as_array)
        .map(|tags| {
            tags.iter()
                .filter_map(|tag| tag.get("code").and_then(Value::as_str))
                .map(|code| code.to_uppercase())
                .collect()
        })
        .unwrap_or_default();
    Article { title, currencies }
}

/// "BTCUSDT" -> "BTC". Quote suffixes are stripped so the base asset can
/// be matched against feed tags and headlines.
fn base_symbol(symbol: &str) -> String {
    let upper = symbol.to_uppercase();
    for suffix in ["USDT", "BUSD"] {
        if let Some(stripped) = upper.strip_suffix(suffix) {
            if !stripped.is_empty() {
                return stripped.to_string();
            }
        }
    }
    upper
}

fn search_terms(base: &str) -> Vec<String> {
    let mut terms = vec![base.to_lowercase()];
    if let Some((_, names)) = SYMBOL_NAMES.iter().find(|(code, _)| *code == base) {
        terms.extend(names.iter().map(|name| name.to_string()));
    }
    terms
}

fn relevant_articles<'a>(
    cache: &'a [Article],
    base: &str,
    terms: &[String],
) -> Vec<&'a Article> {
    cache
        .iter()
        .filter(|article| {
            article.currencies.iter().any(|code| code == base)
                || terms.iter().any(|term| article.title.contains(term.as_str()))
        })
        .collect()
}

fn score_articles(relevant: &[&Article]) -> Sentiment {
    let bullish = relevant
        .iter()
        .filter(|article| BULLISH_KEYWORDS.iter().any(|kw| article.title.contains(kw)))
        .count();
    let bearish = relevant
        .iter()
        .filter(|article| BEARISH_KEYWORDS.iter().any(|kw| article.title.contains(kw)))
        .count();

    if bullish > bearish {
        Sentiment::Bullish
    } else if bearish > bullish {
        Sentiment::Bearish
    } else {
        Sentiment::Neutral
    }
}
