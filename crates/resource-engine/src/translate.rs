//! # Server Error Translation
//!
//! When a submit or delete fails with a non-2xx response, the engine asks a
//! translator whether the body is a structured error payload it recognizes. A
//! recognized payload becomes a list of `error:<code>` tokens that are appended to
//! the engine's `errors`; anything else (`None`) surfaces as a generic failure
//! with the original status and body.
//!
//! The base step understands the HAL-style payload
//! `{"_embedded": {"errors": [{"code": "...", "message": "..."}]}}`. Services whose
//! errors only carry human-readable messages plug in [`by_message`].

use crate::transport::Response;
use serde_json::Value;
use std::sync::Arc;

/// Overridable translation step.
pub type Translator = Arc<dyn Fn(&Response) -> Option<Vec<String>> + Send + Sync>;

fn embedded_errors(response: &Response) -> Option<Vec<Value>> {
    let body: Value = response.json_body().ok()?;
    body.pointer("/_embedded/errors")?.as_array().cloned()
}

/// `error:<code>` for every embedded error carrying a `code`.
pub fn embedded_error_codes(response: &Response) -> Option<Vec<String>> {
    let codes: Vec<String> = embedded_errors(response)?
        .iter()
        .filter_map(|error| error.get("code")?.as_str().map(|code| format!("error:{code}")))
        .collect();
    (!codes.is_empty()).then_some(codes)
}

/// The `message` of every embedded error, in response order.
pub fn embedded_messages(response: &Response) -> Vec<String> {
    embedded_errors(response)
        .unwrap_or_default()
        .iter()
        .filter_map(|error| error.get("message")?.as_str().map(str::to_string))
        .collect()
}

/// Translator mapping message phrases to codes.
///
/// Each embedded message is matched (case-insensitive substring) against the
/// table in order; the first matching phrase contributes `error:<code>`.
/// Unmatched messages are ignored; when nothing matched the payload counts as
/// unrecognized.
///
/// ```rust
/// use resource_engine::transport::Response;
/// use resource_engine::translate;
/// use serde_json::json;
///
/// let translate = translate::by_message(&[("already configured", "already_configured")]);
/// let response = Response::json(500, &json!({
///     "_embedded": {"errors": [{"message": "Gateway already configured"}]}
/// }));
/// assert_eq!(translate(&response), Some(vec!["error:already_configured".to_string()]));
/// ```
pub fn by_message(
    table: &[(&str, &str)],
) -> impl Fn(&Response) -> Option<Vec<String>> + Send + Sync + 'static {
    let table: Vec<(String, String)> = table
        .iter()
        .map(|(phrase, code)| (phrase.to_lowercase(), code.to_string()))
        .collect();

    move |response: &Response| {
        let tokens: Vec<String> = embedded_messages(response)
            .iter()
            .filter_map(|message| {
                let message = message.to_lowercase();
                table
                    .iter()
                    .find(|(phrase, _)| message.contains(phrase.as_str()))
                    .map(|(_, code)| format!("error:{code}"))
            })
            .collect();
        (!tokens.is_empty()).then_some(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_embedded_codes_in_response_order() {
        let response = Response::json(
            400,
            &json!({"_embedded": {"errors": [
                {"code": "duplicate_name", "message": "Name taken"},
                {"message": "no code here"},
                {"code": "quota_exceeded"}
            ]}}),
        );

        assert_eq!(
            embedded_error_codes(&response),
            Some(vec![
                "error:duplicate_name".to_string(),
                "error:quota_exceeded".to_string()
            ])
        );
    }

    #[test]
    fn test_unrecognized_payloads_are_not_translated() {
        for response in [
            Response::new(502, "<html>Bad gateway</html>"),
            Response::json(500, &json!({"error": "boom"})),
            Response::json(500, &json!({"_embedded": {"errors": [{"message": "x"}]}})),
        ] {
            assert_eq!(embedded_error_codes(&response), None);
        }
    }

    #[test]
    fn test_by_message_ignores_unknown_phrases() {
        let translate = by_message(&[("already configured", "already_configured")]);

        let unknown = Response::json(
            500,
            &json!({"_embedded": {"errors": [{"message": "disk full"}]}}),
        );
        assert_eq!(translate(&unknown), None);

        let mixed = Response::json(
            500,
            &json!({"_embedded": {"errors": [
                {"message": "disk full"},
                {"message": "Already Configured for this store"}
            ]}}),
        );
        assert_eq!(
            translate(&mixed),
            Some(vec!["error:already_configured".to_string()])
        );
    }
}
