//! Slash-command payload and command-text parsing.
//!
//! The inbound payload shape follows the common slash-command convention
//! (form fields `token`, `channel_id`, `user_id`, `text`) without binding
//! to any particular chat platform. The command text itself follows the
//! grammar `/tool <capability> [key=value]...`; the leading `/tool` is
//! stripped by the platform before it reaches us.

use serde::Deserialize;
use serde_json::Value;
use tollgate_core::{Error, InvocationRequest, Result};

/// Usage hint rendered back to the user on malformed command text.
pub const USAGE: &str = "usage: /tool <capability> [key=value]...";

/// The decoded slash-command payload.
///
/// Accepted as `application/x-www-form-urlencoded` or JSON; unknown
/// fields the platform sends alongside are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct SlashPayload {
    /// Platform verification token, when the platform sends one.
    #[serde(default)]
    pub token: Option<String>,
    /// The channel the command was typed in.
    pub channel_id: String,
    /// The user who typed it.
    pub user_id: String,
    /// Everything after the slash-command name.
    #[serde(default)]
    pub text: String,
}

/// Parses command text into a structured invocation.
///
/// The first word names the capability; the rest are `key=value` pairs
/// collected into a JSON object of string values. Handlers own any
/// further coercion of their arguments.
pub fn parse_command(text: &str) -> Result<InvocationRequest> {
    let mut words = text.split_whitespace();

    let capability = words
        .next()
        .ok_or_else(|| Error::malformed(format!("empty command; {USAGE}")))?;
    if capability.contains('=') {
        return Err(Error::malformed(format!(
            "missing capability name before arguments; {USAGE}"
        )));
    }

    let mut arguments = serde_json::Map::new();
    for word in words {
        let Some((key, value)) = word.split_once('=') else {
            return Err(Error::malformed(format!(
                "expected key=value, got {word:?}; {USAGE}"
            )));
        };
        if key.is_empty() {
            return Err(Error::malformed(format!(
                "argument with empty key: {word:?}; {USAGE}"
            )));
        }
        arguments.insert(key.to_string(), Value::String(value.to_string()));
    }

    let arguments = if arguments.is_empty() {
        Value::Null
    } else {
        Value::Object(arguments)
    };
    Ok(InvocationRequest::new(capability, arguments))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_capability_only() {
        let req = parse_command("k8s.listPods").unwrap();
        assert_eq!(req.capability.as_str(), "k8s.listPods");
        assert_eq!(req.arguments, Value::Null);
    }

    #[test]
    fn test_parse_with_arguments() {
        let req = parse_command("k8s.listPods namespace=default verbose=true").unwrap();
        assert_eq!(
            req.arguments,
            json!({"namespace": "default", "verbose": "true"})
        );
    }

    #[test]
    fn test_parse_tolerates_extra_whitespace() {
        let req = parse_command("  workflow.trigger   flow=nightly  ").unwrap();
        assert_eq!(req.capability.as_str(), "workflow.trigger");
        assert_eq!(req.arguments, json!({"flow": "nightly"}));
    }

    #[test]
    fn test_empty_text_is_malformed_with_usage() {
        let err = parse_command("   ").unwrap_err();
        assert!(matches!(err, Error::MalformedCommand { .. }));
        assert!(err.to_string().contains(USAGE));
    }

    #[test]
    fn test_bare_pair_without_capability_rejected() {
        let err = parse_command("namespace=default").unwrap_err();
        assert!(err.to_string().contains("missing capability"));
    }

    #[test]
    fn test_argument_without_equals_rejected() {
        let err = parse_command("k8s.listPods default").unwrap_err();
        assert!(err.to_string().contains("key=value"));
    }

    #[test]
    fn test_empty_key_rejected() {
        assert!(parse_command("k8s.listPods =default").is_err());
    }

    #[test]
    fn test_value_may_contain_equals() {
        let req = parse_command("cloud.listResourceGroups filter=env=prod").unwrap();
        assert_eq!(req.arguments, json!({"filter": "env=prod"}));
    }

    #[test]
    fn test_form_payload_decodes() {
        let payload: SlashPayload = serde_json::from_value(json!({
            "token": "t0k",
            "channel_id": "c1",
            "user_id": "u1",
            "text": "k8s.listPods",
            "team_id": "ignored"
        }))
        .unwrap();
        assert_eq!(payload.channel_id, "c1");
        assert_eq!(payload.token.as_deref(), Some("t0k"));
    }
}
