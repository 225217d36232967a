//! Response classification
//!
//! The gateway reports missing resources only through free-text error
//! messages, and their wording is not versioned. All matching rules live
//! here so they can change without touching the reconcilers.

use crate::transport::ApiResponse;
use serde_json::Value;

/// Outcome of inspecting a raw response
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// HTTP 200 with a decodable body
    Success(Value),
    /// The addressed resource does not exist
    NotFound,
    /// HTTP 200 whose body is not valid JSON
    Undecodable(String),
    /// Any other failure
    Failure,
}

/// Turns a raw response into a [`Classification`]
pub trait ErrorClassifier: Send + Sync {
    fn classify(&self, response: &ApiResponse) -> Classification;
}

/// Classifier matching the error texts emitted by the LiteLLM proxy
#[derive(Debug, Clone)]
pub struct GatewayClassifier {
    /// Case-insensitive phrases that mark a message as "not found"
    phrases: Vec<String>,

    /// Also match `<entity> with id=<id> not found in db`
    match_id_not_found_in_db: bool,
}

impl Default for GatewayClassifier {
    fn default() -> Self {
        Self {
            phrases: vec!["model not found".to_string()],
            match_id_not_found_in_db: true,
        }
    }
}

impl GatewayClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add another phrase that identifies a not-found message
    pub fn with_phrase(mut self, phrase: impl Into<String>) -> Self {
        self.phrases.push(phrase.into().to_lowercase());
        self
    }

    fn message_is_not_found(&self, message: &str) -> bool {
        let lower = message.to_lowercase();
        if self.phrases.iter().any(|p| lower.contains(p.as_str())) {
            return true;
        }
        self.match_id_not_found_in_db && is_id_not_found_in_db(&lower)
    }

    fn body_is_not_found(&self, body: &Value) -> bool {
        error_messages(body)
            .iter()
            .any(|m| self.message_is_not_found(m))
    }
}

impl ErrorClassifier for GatewayClassifier {
    fn classify(&self, response: &ApiResponse) -> Classification {
        if response.status == 200 {
            let trimmed = response.body.trim();
            if trimmed.is_empty() || trimmed == "null" {
                return Classification::Success(Value::Object(Default::default()));
            }
            return match serde_json::from_str::<Value>(trimmed) {
                Ok(body) if self.body_is_not_found(&body) => Classification::NotFound,
                Ok(body) => Classification::Success(body),
                Err(e) => Classification::Undecodable(e.to_string()),
            };
        }

        if response.status == 404 {
            return Classification::NotFound;
        }

        match serde_json::from_str::<Value>(&response.body) {
            Ok(body) if self.body_is_not_found(&body) => Classification::NotFound,
            _ => Classification::Failure,
        }
    }
}

/// `Model with id=abc not found in db`, `Team with id=... not found in db`, ...
fn is_id_not_found_in_db(lower: &str) -> bool {
    match lower.find("with id=") {
        Some(pos) => lower[pos..].contains("not found in db"),
        None => false,
    }
}

/// Collect every error text from the envelopes the proxy is known to use:
///
/// - `{"error": {"message": "..."}}`
/// - `{"error": {"message": {"error": "..."}}}`
/// - `{"error": "..."}`
/// - `{"detail": "..."}` / `{"detail": {"error": "..."}}`
fn error_messages(body: &Value) -> Vec<String> {
    let mut messages = Vec::new();

    match body.get("error") {
        Some(Value::String(s)) => messages.push(s.clone()),
        Some(Value::Object(err)) => {
            if let Some(message) = err.get("message") {
                collect_message(message, &mut messages);
            }
        }
        _ => {}
    }

    if let Some(detail) = body.get("detail") {
        collect_message(detail, &mut messages);
    }

    messages
}

fn collect_message(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.push(s.clone()),
        Value::Object(map) => {
            for key in ["error", "message"] {
                if let Some(Value::String(s)) = map.get(key) {
                    out.push(s.clone());
                }
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn classify(status: u16, body: &str) -> Classification {
        GatewayClassifier::default().classify(&ApiResponse::new(status, body))
    }

    #[test]
    fn test_success_body_is_decoded() {
        assert_eq!(
            classify(200, r#"{"team_id":"t-1"}"#),
            Classification::Success(json!({"team_id": "t-1"}))
        );
    }

    #[test]
    fn test_empty_success_body_is_empty_object() {
        assert_eq!(classify(200, ""), Classification::Success(json!({})));
        assert_eq!(classify(200, "null"), Classification::Success(json!({})));
    }

    #[test]
    fn test_plain_model_not_found_message() {
        let body = json!({"error": {"message": "model not found: gpt-x"}}).to_string();
        assert_eq!(classify(400, &body), Classification::NotFound);
    }

    #[test]
    fn test_nested_not_found_in_db_message() {
        let body = json!({
            "error": {"message": {"error": "Model with id=1234 not found in db"}}
        })
        .to_string();
        assert_eq!(classify(400, &body), Classification::NotFound);
    }

    #[test]
    fn test_detail_envelope() {
        let body = json!({"detail": {"error": "Team with id=t-9 not found in db"}}).to_string();
        assert_eq!(classify(400, &body), Classification::NotFound);
    }

    #[test]
    fn test_404_is_not_found_without_body() {
        assert_eq!(classify(404, "gone"), Classification::NotFound);
    }

    #[test]
    fn test_200_wrapping_not_found_error() {
        let body = json!({"error": {"message": "model not found"}}).to_string();
        assert_eq!(classify(200, &body), Classification::NotFound);
    }

    #[test]
    fn test_other_failures() {
        let body = json!({"error": {"message": "budget exceeded"}}).to_string();
        assert_eq!(classify(400, &body), Classification::Failure);
        assert_eq!(classify(500, "<html>oops</html>"), Classification::Failure);
    }

    #[test]
    fn test_id_without_db_suffix_is_not_matched() {
        let body = json!({"error": {"message": "Model with id=1 is locked"}}).to_string();
        assert_eq!(classify(400, &body), Classification::Failure);
    }

    #[test]
    fn test_undecodable_success() {
        assert!(matches!(
            classify(200, "{not json"),
            Classification::Undecodable(_)
        ));
    }

    #[test]
    fn test_extra_phrase() {
        let classifier = GatewayClassifier::new().with_phrase("Team doesn't exist");
        let body = json!({"detail": "team doesn't exist"}).to_string();
        assert_eq!(
            classifier.classify(&ApiResponse::new(400, body)),
            Classification::NotFound
        );
    }
}
