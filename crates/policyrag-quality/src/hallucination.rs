use once_cell::sync::Lazy;
use regex::Regex;

static AMOUNT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[$₹€£][\d,]+(?:\.\d{2})?").expect("amount regex"));
static POLICY_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Z]{2,4}[-\s]?\d{4}[-\s]?\d{4,6}").expect("policy number regex"));

/// Currency amounts and policy numbers in `answer` that do not occur
/// verbatim in `context`, one message per distinct token in answer order.
///
/// Matching is exact: "$2500" is flagged against a context saying "$2,500".
/// A trailing sentence comma is part of the amount, so "$2,500, payable" is
/// flagged as "$2,500," even when the context says "$2,500".
pub fn find_hallucinated_numbers(answer: &str, context: &str) -> Vec<String> {
    let mut tokens: Vec<(usize, &str, bool)> = AMOUNT
        .find_iter(answer)
        .map(|m| (m.start(), m.as_str(), true))
        .chain(POLICY_NUMBER.find_iter(answer).map(|m| (m.start(), m.as_str(), false)))
        .collect();
    tokens.sort_by_key(|(start, _, _)| *start);

    let mut seen: Vec<&str> = Vec::new();
    let mut flags = Vec::new();
    for (_, token, is_amount) in tokens {
        if context.contains(token) || seen.contains(&token) { continue; }
        seen.push(token);
        flags.push(if is_amount {
            format!("Amount {token} not found in policy documents")
        } else {
            format!("Policy number {token} not found in documents")
        });
    }
    flags
}
