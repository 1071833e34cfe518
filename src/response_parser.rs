use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::LazyLock;

use crate::errors::ParseError;

static TAGGED_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[A-Za-z][A-Za-z0-9_+-]*[ \t]*\r?\n?(.*?)```").expect("valid fence regex")
});

static BARE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(.*?)```").expect("valid fence regex"));

/// Returns the interior of the first language-tagged fence, else of the first
/// bare fence, else the whole text. Only one level of fencing is removed.
pub fn strip_code_fences(content: &str) -> &str {
    let interior = TAGGED_FENCE
        .captures(content)
        .or_else(|| BARE_FENCE.captures(content))
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str())
        .unwrap_or(content);

    interior.trim()
}

/// Reads LLM replies as JSON once conversational wrapping is removed.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonResponseParser;

impl JsonResponseParser {
    pub fn parse(&self, raw: &str) -> Result<Value, ParseError> {
        self.parse_as::<Value>(raw)
    }

    pub fn parse_as<T>(&self, raw: &str) -> Result<T, ParseError>
    where
        T: DeserializeOwned,
    {
        let extracted = strip_code_fences(raw);
        serde_json::from_str::<T>(extracted).map_err(|source| ParseError {
            extracted: extracted.to_string(),
            source,
        })
    }
}
