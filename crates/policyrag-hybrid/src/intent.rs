use once_cell::sync::Lazy;
use regex::Regex;

// "my" alone covers "does my", "is my", "what's my", "in my policy", ...
static PERSONAL_MARKERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:my|am\s+i|do\s+i|i\s+am|i\s+have)\b").expect("personal marker regex"));

/// True when the query reads as a question about the user's own policy.
pub fn is_personal_query(query: &str) -> bool { PERSONAL_MARKERS.is_match(query) }
