//! Sentiment classification for product reviews.
//!
//! Two classifiers share one result shape: a remote HuggingFace-style
//! classifier called with bounded retries, and a deterministic keyword-based
//! fallback used whenever the remote endpoint is unreachable or returns
//! something unusable. The fallback is a pure function.

use once_cell::sync::Lazy;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::time::sleep;
use utoipa::ToSchema;

/// Review polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }
}

/// Result of sentiment analysis. Both classifier paths produce this shape.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SentimentResult {
    pub sentiment: Sentiment,
    /// Confidence in [0, 1], rounded to 4 decimals.
    pub score: f64,
}

// ============================================================================
// Keyword tables for the fallback classifier
// ============================================================================

// Weights 1-3 reflect intensity ("excellent" outweighs "nice").
static POSITIVE_WEIGHTS: Lazy<HashMap<&'static str, u32>> = Lazy::new(|| {
    HashMap::from([
        ("excellent", 3),
        ("amazing", 3),
        ("fantastic", 3),
        ("wonderful", 3),
        ("outstanding", 3),
        ("perfect", 3),
        ("brilliant", 3),
        ("superb", 3),
        ("awesome", 3),
        ("incredible", 3),
        ("exceptional", 3),
        ("love", 3),
        ("loved", 3),
        ("best", 3),
        ("great", 2),
        ("good", 2),
        ("impressive", 2),
        ("beautiful", 2),
        ("happy", 2),
        ("satisfied", 2),
        ("recommend", 2),
        ("recommended", 2),
        ("reliable", 2),
        ("comfortable", 2),
        ("sturdy", 2),
        ("smooth", 2),
        ("durable", 2),
        ("nice", 1),
        ("fast", 1),
        ("easy", 1),
        ("helpful", 1),
        ("worth", 1),
        ("quality", 1),
        ("decent", 1),
        ("solid", 1),
        ("useful", 1),
        ("fine", 1),
    ])
});

static NEGATIVE_WEIGHTS: Lazy<HashMap<&'static str, u32>> = Lazy::new(|| {
    HashMap::from([
        ("terrible", 3),
        ("horrible", 3),
        ("awful", 3),
        ("worst", 3),
        ("hate", 3),
        ("hated", 3),
        ("garbage", 3),
        ("trash", 3),
        ("useless", 3),
        ("unusable", 3),
        ("scam", 3),
        ("pathetic", 3),
        ("bad", 2),
        ("poor", 2),
        ("disappointing", 2),
        ("disappointed", 2),
        ("broken", 2),
        ("broke", 2),
        ("defective", 2),
        ("faulty", 2),
        ("flimsy", 2),
        ("waste", 2),
        ("refund", 2),
        ("unreliable", 2),
        ("overpriced", 2),
        ("fail", 2),
        ("failed", 2),
        ("fails", 2),
        ("slow", 1),
        ("expensive", 1),
        ("problem", 1),
        ("problems", 1),
        ("issue", 1),
        ("issues", 1),
        ("difficult", 1),
        ("complicated", 1),
        ("confusing", 1),
        ("noisy", 1),
        ("mediocre", 1),
    ])
});

// A negation token inverts the polarity of the keyword right after it.
static NEGATIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "not", "no", "never", "none", "neither", "nor", "nothing", "hardly",
        "barely", "cannot", "without",
    ])
});

fn is_negation(token: &str) -> bool {
    NEGATIONS.contains(token) || token.ends_with("n't")
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Fallback sentiment analysis using weighted keywords and negation handling.
///
/// Deterministic and network-free: identical text always yields an identical
/// (sentiment, score) pair. A keyword immediately preceded by a negation token
/// contributes its weight to the opposite polarity ("not good" counts as
/// negative evidence).
pub fn analyze_sentiment_fallback(text: &str) -> SentimentResult {
    let lowered = text.to_lowercase();
    let tokens: Vec<&str> = lowered
        .split_whitespace()
        .map(|t| t.trim_matches(|c| c == ',' || c == '.'))
        .filter(|t| !t.is_empty())
        .collect();

    let mut positive: u32 = 0;
    let mut negative: u32 = 0;

    for (i, token) in tokens.iter().enumerate() {
        let negated = i > 0 && is_negation(tokens[i - 1]);
        if let Some(&weight) = POSITIVE_WEIGHTS.get(*token) {
            if negated {
                negative += weight;
            } else {
                positive += weight;
            }
        } else if let Some(&weight) = NEGATIVE_WEIGHTS.get(*token) {
            if negated {
                positive += weight;
            } else {
                negative += weight;
            }
        }
    }

    resolve_score(positive, negative)
}

// Margin-based confidence: larger polarity margins score higher, capped at
// 0.95 since this is a heuristic. Equal accumulators (including 0/0) are
// neutral at exactly 0.5.
fn resolve_score(positive: u32, negative: u32) -> SentimentResult {
    if positive == negative {
        return SentimentResult {
            sentiment: Sentiment::Neutral,
            score: 0.5,
        };
    }

    let total = (positive + negative) as f64;
    let diff = positive.abs_diff(negative) as f64;
    let score = (0.6 + (diff / total) * 0.35).min(0.95);

    SentimentResult {
        sentiment: if positive > negative {
            Sentiment::Positive
        } else {
            Sentiment::Negative
        },
        score: round4(score),
    }
}

// ============================================================================
// Remote classifier (HuggingFace Inference API)
// ============================================================================

/// Label conventions are model-specific: cardiffnlp models answer with
/// ordinal labels (label_2 = positive, label_0 = negative, label_1 = neutral),
/// others spell the sentiment out. Swapping the remote model only requires
/// editing this table; substring matching covers the spelled-out case.
const LABEL_ALIASES: &[(&str, Sentiment)] = &[
    ("label_2", Sentiment::Positive),
    ("label_1", Sentiment::Neutral),
    ("label_0", Sentiment::Negative),
];

pub fn map_label(label: &str) -> Sentiment {
    let label = label.to_lowercase();
    for (alias, sentiment) in LABEL_ALIASES {
        if label == *alias {
            return *sentiment;
        }
    }
    if label.contains("positive") {
        Sentiment::Positive
    } else if label.contains("negative") {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    }
}

/// Fixed-delay retry budget for the remote classifier. Rate limiting waits
/// twice as long as the other transient failures. Tests construct a
/// zero-delay policy so no real time passes.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl RetryPolicy {
    pub fn delay_for(&self, status: StatusCode) -> Duration {
        if status == StatusCode::TOO_MANY_REQUESTS {
            self.retry_delay * 2
        } else {
            self.retry_delay
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_secs(3),
        }
    }
}

/// Remote sentiment classifier. `classify` never fails: once the retry
/// budget is exhausted (or the response shape is unusable) it delegates to
/// the keyword fallback.
pub struct SentimentClassifier {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    retry: RetryPolicy,
}

impl SentimentClassifier {
    pub fn new(client: reqwest::Client, api_url: String, api_key: String, retry: RetryPolicy) -> Self {
        Self {
            client,
            api_url,
            api_key,
            retry,
        }
    }

    pub async fn classify(&self, text: &str) -> SentimentResult {
        for attempt in 1..=self.retry.max_attempts {
            let final_attempt = attempt == self.retry.max_attempts;
            println!(
                "🧠 Sentiment analysis attempt {}/{}...",
                attempt, self.retry.max_attempts
            );

            let response = self
                .client
                .post(&self.api_url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&serde_json::json!({ "inputs": text }))
                .send()
                .await;

            match response {
                Ok(resp) => {
                    let status = resp.status();

                    // 503 means the hosted model is still loading: a wait,
                    // not an error.
                    if status == StatusCode::SERVICE_UNAVAILABLE {
                        println!("⏳ Model loading, waiting {:?}...", self.retry.retry_delay);
                        if !final_attempt {
                            sleep(self.retry.delay_for(status)).await;
                        }
                        continue;
                    }

                    if status == StatusCode::TOO_MANY_REQUESTS {
                        println!("⏳ Rate limited, waiting...");
                        if !final_attempt {
                            sleep(self.retry.delay_for(status)).await;
                        }
                        continue;
                    }

                    if !status.is_success() {
                        eprintln!("⚠️ Classifier returned status {}", status);
                        if !final_attempt {
                            sleep(self.retry.retry_delay).await;
                            continue;
                        }
                        break;
                    }

                    match resp.json::<serde_json::Value>().await {
                        Ok(value) => match select_prediction(&value) {
                            Some(result) => {
                                println!(
                                    "✅ Sentiment result: {} ({})",
                                    result.sentiment.as_str(),
                                    result.score
                                );
                                return result;
                            }
                            None => {
                                eprintln!("⚠️ Unexpected classifier response format");
                                break;
                            }
                        },
                        Err(e) => {
                            eprintln!("⚠️ Classifier response parse error: {}", e);
                            if !final_attempt {
                                sleep(self.retry.retry_delay).await;
                                continue;
                            }
                            break;
                        }
                    }
                }
                Err(e) => {
                    eprintln!("❌ Classifier request failed: {}", e);
                    if !final_attempt {
                        sleep(self.retry.retry_delay).await;
                        continue;
                    }
                    break;
                }
            }
        }

        println!("🔄 Using fallback sentiment analysis...");
        analyze_sentiment_fallback(text)
    }
}

/// Picks the max-score prediction out of the inference response. The API
/// answers with a list of lists of {label, score}; some deployments flatten
/// the outer list.
pub fn select_prediction(value: &serde_json::Value) -> Option<SentimentResult> {
    let outer = value.as_array()?;
    let predictions = match outer.first()? {
        inner @ serde_json::Value::Array(_) => inner.as_array()?,
        _ => outer,
    };

    let mut best: Option<(&str, f64)> = None;
    for prediction in predictions {
        let label = prediction.get("label")?.as_str()?;
        let score = prediction.get("score")?.as_f64()?;
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((label, score));
        }
    }

    let (label, score) = best?;
    Some(SentimentResult {
        sentiment: map_label(label),
        score: round4(score),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::post;
    use axum::Router;

    fn zero_delay_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            retry_delay: Duration::ZERO,
        }
    }

    #[test]
    fn test_fallback_positive() {
        let result = analyze_sentiment_fallback("Amazing product, excellent quality and fast delivery");
        assert_eq!(result.sentiment, Sentiment::Positive);
        assert!(result.score > 0.6);
    }

    #[test]
    fn test_fallback_negative() {
        let result = analyze_sentiment_fallback("Terrible, broke after one day");
        assert_eq!(result.sentiment, Sentiment::Negative);
        assert!(result.score > 0.6);
    }

    #[test]
    fn test_fallback_neutral_without_keywords() {
        let result = analyze_sentiment_fallback("The item arrived on a Tuesday in a cardboard box");
        assert_eq!(result.sentiment, Sentiment::Neutral);
        assert_eq!(result.score, 0.5);
    }

    #[test]
    fn test_fallback_neutral_on_tie() {
        // "good" and "bad" both weigh 2
        let result = analyze_sentiment_fallback("good camera bad battery");
        assert_eq!(result.sentiment, Sentiment::Neutral);
        assert_eq!(result.score, 0.5);
    }

    #[test]
    fn test_fallback_is_pure() {
        let text = "Great phone but the screen is a bit slow";
        assert_eq!(analyze_sentiment_fallback(text), analyze_sentiment_fallback(text));
    }

    #[test]
    fn test_negation_inverts_polarity() {
        let result = analyze_sentiment_fallback("not good at all");
        assert_eq!(result.sentiment, Sentiment::Negative);

        let result = analyze_sentiment_fallback("never failed me once");
        assert_eq!(result.sentiment, Sentiment::Positive);

        // n't contractions count as negations too
        let result = analyze_sentiment_fallback("doesn't work, isn't good");
        assert_eq!(result.sentiment, Sentiment::Negative);
    }

    #[test]
    fn test_score_formula_and_bounds() {
        // good(2) vs slow(1): diff=1 total=3 -> 0.6 + 0.35/3 = 0.7167
        let result = analyze_sentiment_fallback("good but slow");
        assert_eq!(result.sentiment, Sentiment::Positive);
        assert_eq!(result.score, 0.7167);

        // One-sided input caps at 0.95, never 1.0
        let result = analyze_sentiment_fallback("excellent amazing perfect");
        assert_eq!(result.score, 0.95);

        for text in [
            "excellent",
            "terrible awful worst garbage",
            "nice but expensive",
            "not bad",
            "just a box",
        ] {
            let result = analyze_sentiment_fallback(text);
            assert!(result.score >= 0.0 && result.score <= 0.95, "text: {}", text);
        }
    }

    #[test]
    fn test_punctuation_stripped_before_matching() {
        let result = analyze_sentiment_fallback("Terrible, broke.");
        assert_eq!(result.sentiment, Sentiment::Negative);
    }

    #[test]
    fn test_map_label_aliases_and_substrings() {
        assert_eq!(map_label("LABEL_2"), Sentiment::Positive);
        assert_eq!(map_label("label_0"), Sentiment::Negative);
        assert_eq!(map_label("label_1"), Sentiment::Neutral);
        assert_eq!(map_label("POSITIVE"), Sentiment::Positive);
        assert_eq!(map_label("very_negative"), Sentiment::Negative);
        assert_eq!(map_label("something_else"), Sentiment::Neutral);
    }

    #[test]
    fn test_select_prediction_picks_max_score() {
        let value = serde_json::json!([[
            { "label": "positive", "score": 0.9 },
            { "label": "neutral", "score": 0.05 }
        ]]);
        let result = select_prediction(&value).unwrap();
        assert_eq!(result.sentiment, Sentiment::Positive);
        assert_eq!(result.score, 0.9);
    }

    #[test]
    fn test_select_prediction_flat_list() {
        let value = serde_json::json!([
            { "label": "label_0", "score": 0.7 },
            { "label": "label_2", "score": 0.2 }
        ]);
        let result = select_prediction(&value).unwrap();
        assert_eq!(result.sentiment, Sentiment::Negative);
        assert_eq!(result.score, 0.7);
    }

    #[test]
    fn test_select_prediction_rejects_bad_shapes() {
        assert!(select_prediction(&serde_json::json!({ "error": "loading" })).is_none());
        assert!(select_prediction(&serde_json::json!([])).is_none());
        assert!(select_prediction(&serde_json::json!([[{ "label": "positive" }]])).is_none());
    }

    // axum and reqwest disagree on http crate versions, so the stub server
    // builds its status from the raw code.
    async fn spawn_status_server(status_code: u16) -> String {
        let app = Router::new().route(
            "/",
            post(move || async move { axum::http::StatusCode::from_u16(status_code).unwrap() }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/", addr)
    }

    #[tokio::test]
    async fn test_classify_falls_back_on_permanent_503() {
        let url = spawn_status_server(503).await;
        let classifier = SentimentClassifier::new(
            reqwest::Client::new(),
            url,
            String::new(),
            zero_delay_policy(),
        );

        let text = "Terrible, broke after one day";
        let result = classifier.classify(text).await;
        assert_eq!(result, analyze_sentiment_fallback(text));
    }

    #[tokio::test]
    async fn test_classify_never_errors_when_unreachable() {
        let classifier = SentimentClassifier::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9/".to_string(),
            String::new(),
            zero_delay_policy(),
        );

        let text = "Amazing product, works perfectly";
        let result = classifier.classify(text).await;
        assert_eq!(result, analyze_sentiment_fallback(text));
    }

    #[tokio::test]
    async fn test_classify_falls_back_on_rate_limit() {
        let url = spawn_status_server(429).await;
        let classifier = SentimentClassifier::new(
            reqwest::Client::new(),
            url,
            String::new(),
            zero_delay_policy(),
        );

        let result = classifier.classify("not worth the price").await;
        assert_eq!(result, analyze_sentiment_fallback("not worth the price"));
    }

    #[test]
    fn test_retry_policy_delays() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.delay_for(StatusCode::TOO_MANY_REQUESTS),
            policy.retry_delay * 2
        );
        assert_eq!(
            policy.delay_for(StatusCode::SERVICE_UNAVAILABLE),
            policy.retry_delay
        );
    }
}
