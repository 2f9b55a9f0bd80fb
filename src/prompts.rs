use crate::llm::CompletionRequest;
use crate::models::FeatureType;

const LINGUIST_SYSTEM: &str = "You are a multilingual linguist. Answer with valid JSON only.";

const PHRASE_SHAPE: &str = r#"{
  "phrase": string,
  "language": string,
  "romanization": string,
  "translation": string,
  "meaning": string,
  "etymology": {"origin": string, "history": string, "evolution": string},
  "examples": [{"sentence": string, "romanization": string, "translation": string, "context": string}],
  "synonyms": [{"word": string, "romanization": string, "context": string}],
  "inflections": {"type": string, "forms": [{"form": string, "value": string, "translation": string}]} | null
}"#;

const WRITING_SHAPE: &str = r#"{
  "originalText": string,
  "language": string,
  "translation": string,
  "summary": string,
  "difficultWords": [{
    "word": string,
    "cefrLevel": string,
    "romanization": string,
    "definition": string,
    "etymology": {"origin": string, "history": string},
    "examples": [{"sentence": string, "romanization": string, "translation": string}],
    "rephrasing": string,
    "inflections": {"type": string, "forms": [{"form": string, "value": string}]} | null
  }]
}"#;

const PANGLISH_SHAPE: &str = r#"{"translation": string, "explanation": string}"#;

// JSON string literal, so quotes and newlines in user input cannot break the prompt
fn quoted(input: &str) -> String {
    serde_json::Value::from(input.trim()).to_string()
}

pub fn build(feature: FeatureType, input: &str) -> CompletionRequest {
    match feature {
        FeatureType::Phrase => CompletionRequest {
            system: Some(LINGUIST_SYSTEM),
            prompt: format!(
                "Analyze the word or phrase {}: language, plain meaning, etymology, \
                 two examples and three synonyms. Romanize any non-Latin script. \
                 Reply with JSON shaped like:\n{}",
                quoted(input),
                PHRASE_SHAPE
            ),
            temperature: 0.3,
            max_tokens: 3000,
            json_mode: false,
        },
        FeatureType::Writing => CompletionRequest {
            system: Some(LINGUIST_SYSTEM),
            prompt: format!(
                "Analyze the writing sample {}: summarize it simply and list the words \
                 at CEFR B2 or above with definitions, etymology and simpler rephrasings. \
                 Reply with JSON shaped like:\n{}",
                quoted(input),
                WRITING_SHAPE
            ),
            temperature: 0.3,
            max_tokens: 3000,
            json_mode: false,
        },
        FeatureType::Panglish => CompletionRequest {
            system: None,
            prompt: format!(
                "Rewrite {} in natural modern English using only words with Proto-Germanic \
                 roots, coining compounds where needed, and explain the key word choices. \
                 Reply with JSON shaped like:\n{}",
                quoted(input),
                PANGLISH_SHAPE
            ),
            temperature: 0.7,
            max_tokens: 1024,
            json_mode: true,
        },
    }
}
