//! Sentiment analysis pipeline: detect -> translate -> classify.

use crate::config::AppConfig;
use crate::language::{detect_language, Translator};
use crate::sentiment::{SentimentClassifier, SentimentResult};

/// Composes the language detector, translator and remote classifier into a
/// single call. Every stage degrades internally, so `analyze` always hands a
/// usable result back to the caller.
pub struct SentimentPipeline {
    translator: Translator,
    classifier: SentimentClassifier,
}

impl SentimentPipeline {
    pub fn new(client: reqwest::Client, config: &AppConfig) -> Self {
        Self {
            translator: Translator::new(client.clone(), config.translate_api_url.clone()),
            classifier: SentimentClassifier::new(
                client,
                config.huggingface_api_url.clone(),
                config.huggingface_api_key.clone(),
                config.retry.clone(),
            ),
        }
    }

    /// Runs the stages strictly in order; later stages depend on earlier
    /// outputs. Classification happens on the translated text, while the
    /// caller keeps the original for storage and key points.
    pub async fn analyze(&self, review_text: &str) -> SentimentResult {
        let language = detect_language(review_text);
        println!("🔍 Detected language: {}", language);

        let translation = self.translator.translate_to_english(review_text, &language).await;
        if translation.is_translated {
            println!(
                "🌐 Translated review from '{}' for classification",
                translation.original_language
            );
        }

        self.classifier.classify(&translation.translated_text).await
    }
}
