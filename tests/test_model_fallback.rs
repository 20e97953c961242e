use mockito::Matcher;
use rotten_recipe::config::GeminiConfig;
use rotten_recipe::matcher::NormalizedLevenshtein;
use rotten_recipe::providers::{AttemptFailure, FallbackProvider};
use rotten_recipe::{CanonicalFoodEntry, IngredientExtractor};
use serde_json::json;

fn gemini_config(base_url: &str, candidates: &[&str]) -> GeminiConfig {
    GeminiConfig {
        api_key: Some("test-key".to_string()),
        base_url: base_url.to_string(),
        model_candidates: candidates.iter().map(|m| m.to_string()).collect(),
        ..GeminiConfig::default()
    }
}

fn gemini_body(text: &str) -> String {
    json!({
        "candidates": [{
            "content": {"parts": [{"text": text}], "role": "model"},
            "finishReason": "STOP"
        }]
    })
    .to_string()
}

fn vocabulary() -> Vec<CanonicalFoodEntry> {
    vec![
        CanonicalFoodEntry::new("f1", "아보카도", "과일"),
        CanonicalFoodEntry::new("f2", "루꼴라", "채소"),
        CanonicalFoodEntry::new("f3", "올리브유", "오일"),
    ]
}

#[tokio::test]
async fn test_generate_content_request() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/models/gemini-2.5-flash:generateContent")
        .match_query(Matcher::UrlEncoded("key".into(), "test-key".into()))
        .match_body(Matcher::PartialJson(json!({
            "generationConfig": {"maxOutputTokens": 2048}
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(gemini_body(r#"[{"name": "아보카도", "amount": 1, "unit": "개"}]"#))
        .create_async()
        .await;

    let model = FallbackProvider::new(&gemini_config(
        &server.url(),
        &["models/gemini-2.5-flash"],
    ))
    .unwrap();
    let text = model.try_each("prompt").await.unwrap();

    assert!(text.contains("아보카도"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_all_candidates_not_found() {
    let mut server = mockito::Server::new_async().await;
    let first = server
        .mock("POST", "/v1/models/gemini-2.5-flash:generateContent")
        .match_query(Matcher::Any)
        .with_status(404)
        .with_body(r#"{"error": {"code": 404, "status": "NOT_FOUND"}}"#)
        .expect(1)
        .create_async()
        .await;
    let second = server
        .mock("POST", "/v1/models/gemini-2.0-flash:generateContent")
        .match_query(Matcher::Any)
        .with_status(404)
        .with_body(r#"{"error": {"code": 404, "status": "NOT_FOUND"}}"#)
        .expect(1)
        .create_async()
        .await;

    let model = FallbackProvider::new(&gemini_config(
        &server.url(),
        &["models/gemini-2.5-flash", "models/gemini-2.0-flash"],
    ))
    .unwrap();

    let failures = model.try_each("prompt").await.unwrap_err();
    let models: Vec<&str> = failures.iter().map(|f| f.model.as_str()).collect();
    assert_eq!(models, vec!["models/gemini-2.5-flash", "models/gemini-2.0-flash"]);
    assert!(failures
        .iter()
        .all(|f| matches!(f.failure, AttemptFailure::ModelNotFound { .. })));

    first.assert_async().await;
    second.assert_async().await;
}

#[tokio::test]
async fn test_exhausted_candidates_give_empty_list() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("POST", Matcher::Regex(r"^/v1/models/.+:generateContent$".to_string()))
        .match_query(Matcher::Any)
        .with_status(404)
        .create_async()
        .await;

    let model = FallbackProvider::new(&gemini_config(
        &server.url(),
        &["models/gemini-2.5-flash", "models/gemini-2.0-flash"],
    ))
    .unwrap();
    let extractor = IngredientExtractor::new(model, Box::new(NormalizedLevenshtein), 0.4);

    let result = extractor
        .extract_ingredients("아보카도 1개", &vocabulary())
        .await;
    assert!(result.is_empty());
}

#[tokio::test]
async fn test_server_error_falls_through_to_next_candidate() {
    let mut server = mockito::Server::new_async().await;
    let _first = server
        .mock("POST", "/v1/models/gemini-2.5-flash:generateContent")
        .match_query(Matcher::Any)
        .with_status(503)
        .with_body("overloaded")
        .create_async()
        .await;
    let _second = server
        .mock("POST", "/v1/models/gemini-2.0-flash:generateContent")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(gemini_body(r#"[{"name": "루꼴라", "amount": null, "unit": "줌"}]"#))
        .create_async()
        .await;

    let model = FallbackProvider::new(&gemini_config(
        &server.url(),
        &["models/gemini-2.5-flash", "models/gemini-2.0-flash"],
    ))
    .unwrap();
    let extractor = IngredientExtractor::new(model, Box::new(NormalizedLevenshtein), 0.4);

    let result = extractor
        .extract_ingredients("루꼴라 한 줌", &vocabulary())
        .await;
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].standard_name, "루꼴라");
    assert_eq!(result[0].unit, "줌");
    assert!(result[0].amount.is_none());
}

#[tokio::test]
async fn test_empty_candidate_text_is_a_failure() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("POST", "/v1/models/gemini-2.5-flash:generateContent")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"candidates": [{"content": {"parts": [{"text": ""}]}}]}"#)
        .create_async()
        .await;

    let model = FallbackProvider::new(&gemini_config(
        &server.url(),
        &["models/gemini-2.5-flash"],
    ))
    .unwrap();

    let failures = model.try_each("prompt").await.unwrap_err();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].failure, AttemptFailure::EmptyText);
    assert_eq!(model.generate_or_empty("prompt").await, "");
}

#[tokio::test]
async fn test_truncated_fenced_response_is_recovered() {
    let truncated = "```json\n[\n  {\"name\": \"후숙된 아보카도\", \"amount\": 1, \"unit\": \"개\"},\n  {\"name\": \"올리브유\", \"amount\": 2, \"unit\": \"큰술\"},\n  {\"name\": \"루꼴라\", \"amou";

    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("POST", "/v1/models/gemini-2.5-flash:generateContent")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(gemini_body(truncated))
        .create_async()
        .await;

    let model = FallbackProvider::new(&gemini_config(
        &server.url(),
        &["models/gemini-2.5-flash"],
    ))
    .unwrap();
    let extractor = IngredientExtractor::new(model, Box::new(NormalizedLevenshtein), 0.4);

    let result = extractor
        .extract_ingredients("후숙된 아보카도 1개, 올리브유 2큰술, 루꼴라", &vocabulary())
        .await;

    let names: Vec<&str> = result.iter().map(|i| i.standard_name.as_str()).collect();
    assert_eq!(names, vec!["아보카도", "올리브유", "루꼴라"]);
    assert!(result[2].amount.is_none());
    assert_eq!(result[2].unit, "");
}
