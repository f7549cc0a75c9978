//! Language detection and translation glue for the analysis pipeline.
//!
//! Detection runs locally via whatlang; translation goes through a
//! LibreTranslate-compatible endpoint. Both stages degrade silently: a
//! detection failure assumes English, a translation failure passes the
//! original text through.

use serde::Deserialize;

/// Default language assumed when detection fails.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Outcome of the translation stage, produced once per analysis call.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationResult {
    pub original_text: String,
    pub translated_text: String,
    /// ISO-639-1-like code, or "unknown" for scripts whatlang recognizes
    /// but the code table does not.
    pub original_language: String,
    pub is_translated: bool,
}

/// Detect the language of the given text as an ISO-639-1-like code.
/// Too-short or undetectable text falls back to "en". Detection failure is
/// not transient, so there are no retries.
pub fn detect_language(text: &str) -> String {
    if text.trim().len() < 10 {
        return DEFAULT_LANGUAGE.to_string();
    }

    match whatlang::detect(text) {
        Some(info) => lang_to_code(info.lang()).to_string(),
        None => DEFAULT_LANGUAGE.to_string(),
    }
}

fn lang_to_code(lang: whatlang::Lang) -> &'static str {
    use whatlang::Lang::*;
    match lang {
        Eng => "en",
        Spa => "es",
        Fra => "fr",
        Deu => "de",
        Ita => "it",
        Por => "pt",
        Rus => "ru",
        Jpn => "ja",
        Cmn => "zh",
        Kor => "ko",
        Ara => "ar",
        Hin => "hi",
        Nld => "nl",
        Pol => "pl",
        Tur => "tr",
        Vie => "vi",
        Ind => "id",
        Tha => "th",
        Ukr => "uk",
        Swe => "sv",
        _ => "unknown",
    }
}

/// Translates review text to English before classification.
pub struct Translator {
    client: reqwest::Client,
    api_url: String,
}

impl Translator {
    pub fn new(client: reqwest::Client, api_url: String) -> Self {
        Self { client, api_url }
    }

    /// English input short-circuits without a network call. Any translation
    /// failure returns the original text unchanged, keeping the detected
    /// language code; translation must never block the pipeline.
    pub async fn translate_to_english(&self, text: &str, source_lang: &str) -> TranslationResult {
        if source_lang == DEFAULT_LANGUAGE {
            return TranslationResult {
                original_text: text.to_string(),
                translated_text: text.to_string(),
                original_language: DEFAULT_LANGUAGE.to_string(),
                is_translated: false,
            };
        }

        match self.request_translation(text, source_lang).await {
            Ok(translated) => TranslationResult {
                original_text: text.to_string(),
                translated_text: translated,
                original_language: source_lang.to_string(),
                is_translated: true,
            },
            Err(e) => {
                eprintln!("⚠️ Translation failed, using original text: {}", e);
                TranslationResult {
                    original_text: text.to_string(),
                    translated_text: text.to_string(),
                    original_language: source_lang.to_string(),
                    is_translated: false,
                }
            }
        }
    }

    async fn request_translation(&self, text: &str, source_lang: &str) -> anyhow::Result<String> {
        #[derive(Deserialize)]
        struct TranslateResponse {
            #[serde(rename = "translatedText")]
            translated_text: String,
        }

        // The endpoint rejects codes it does not know, so unmapped languages
        // ask for auto-detection instead.
        let source = if source_lang == "unknown" { "auto" } else { source_lang };

        let payload = serde_json::json!({
            "q": text,
            "source": source,
            "target": "en",
            "format": "text"
        });

        let response = self
            .client
            .post(format!("{}/translate", self.api_url))
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("translation endpoint returned {}", response.status());
        }

        let body: TranslateResponse = response.json().await?;
        Ok(body.translated_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_english() {
        let code = detect_language("This phone exceeded all of my expectations, truly great value.");
        assert_eq!(code, "en");
    }

    #[test]
    fn test_detect_spanish() {
        let code = detect_language("Este producto es maravilloso, la calidad es excelente y llegó rápido.");
        assert_eq!(code, "es");
    }

    #[test]
    fn test_detect_short_text_defaults_to_english() {
        assert_eq!(detect_language("ok"), "en");
        assert_eq!(detect_language("   "), "en");
    }

    #[tokio::test]
    async fn test_translator_short_circuits_english() {
        // URL is never hit for English input
        let translator = Translator::new(reqwest::Client::new(), "http://127.0.0.1:9".to_string());
        let result = translator
            .translate_to_english("Great product, works perfectly", "en")
            .await;
        assert!(!result.is_translated);
        assert_eq!(result.translated_text, result.original_text);
        assert_eq!(result.original_language, "en");
    }

    #[tokio::test]
    async fn test_translation_failure_passes_through() {
        let translator = Translator::new(reqwest::Client::new(), "http://127.0.0.1:9".to_string());
        let result = translator
            .translate_to_english("Este producto es maravilloso", "es")
            .await;
        assert!(!result.is_translated);
        assert_eq!(result.translated_text, "Este producto es maravilloso");
        // Detected language survives the failed translation
        assert_eq!(result.original_language, "es");
    }
}
