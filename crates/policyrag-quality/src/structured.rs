use serde::de::DeserializeOwned;

/// Outcome of parsing a generator reply against a typed schema.
#[derive(Debug, Clone, PartialEq)]
pub enum Structured<T> {
    Parsed(T),
    /// The raw reply, kept so callers can fall back to showing it.
    Unparsable(String),
}

impl<T> Structured<T> {
    pub fn is_parsed(&self) -> bool { matches!(self, Self::Parsed(_)) }

    pub fn into_parsed(self) -> Option<T> {
        match self {
            Self::Parsed(v) => Some(v),
            Self::Unparsable(_) => None,
        }
    }
}

/// Parse the JSON object in `text`, tolerating a surrounding code fence or
/// prose around the outermost braces.
pub fn parse_structured<T: DeserializeOwned>(text: &str) -> Structured<T> {
    let body = strip_fence(text);
    let candidate = match (body.find('{'), body.rfind('}')) {
        (Some(start), Some(end)) if start < end => &body[start..=end],
        _ => return Structured::Unparsable(text.to_string()),
    };
    match serde_json::from_str::<T>(candidate) {
        Ok(value) => Structured::Parsed(value),
        Err(e) => {
            tracing::debug!(error = %e, "structured reply did not match schema");
            Structured::Unparsable(text.to_string())
        }
    }
}

fn strip_fence(text: &str) -> &str {
    let inner = |open: &str| {
        let (_, rest) = text.split_once(open)?;
        Some(rest.split_once("```").map_or(rest, |(body, _)| body))
    };
    inner("```json").or_else(|| inner("```")).unwrap_or(text).trim()
}
