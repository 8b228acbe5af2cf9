use std::time::Duration;

use policyrag_core::config::LlmSettings;
use policyrag_llm::{parse_reply, OpenAiGenerator};

#[test]
fn request_carries_model_prompt_and_temperature() {
    let generator = OpenAiGenerator::new("sk-test".into(), "https://example.invalid/v1/", "gpt-4o-mini", Duration::from_secs(5)).expect("generator");
    let body = serde_json::to_value(generator.build_request("Is hail covered?", 0.0)).expect("json");
    assert_eq!(body["model"], "gpt-4o-mini");
    assert_eq!(body["messages"][0]["role"], "user");
    assert_eq!(body["messages"][0]["content"], "Is hail covered?");
    assert_eq!(body["temperature"], 0.0);
}

#[test]
fn empty_key_is_a_config_error() {
    let err = OpenAiGenerator::new("  ".into(), "https://example.invalid/v1", "m", Duration::from_secs(5)).err().expect("should fail");
    assert!(err.to_string().contains("API key is required"));
}

#[test]
fn missing_key_variable_is_reported() {
    let settings = LlmSettings { api_key_env: "POLICYRAG_TEST_KEY_THAT_IS_NEVER_SET".into(), ..LlmSettings::default() };
    let err = OpenAiGenerator::from_settings(&settings).err().expect("should fail");
    assert!(err.to_string().contains("POLICYRAG_TEST_KEY_THAT_IS_NEVER_SET"));
}

#[test]
fn reply_text_comes_from_first_choice() {
    let body = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"{\"answer\":\"yes\"}"},"finish_reason":"stop"}]}"#;
    assert_eq!(parse_reply(body).expect("reply"), "{\"answer\":\"yes\"}");
}

#[test]
fn empty_or_malformed_replies_are_errors() {
    assert!(parse_reply(r#"{"choices":[]}"#).is_err());
    assert!(parse_reply(r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#).is_err());
    assert!(parse_reply("not json").is_err());
}
