use anyhow::Context;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::debug;

use crate::canonical::ErrorDescriptor;
use crate::config::Config;
use crate::error::ValidatorError;

/// Produces the raw error descriptors for a URL.
#[async_trait]
pub trait Validator: Send + Sync {
    async fn validate(&self, url: &str) -> Result<Vec<ErrorDescriptor>, ValidatorError>;
}

/// Validator reached over HTTP: `GET {endpoint}?url=...` answering with a
/// JSON array of error objects.
pub struct HttpValidator {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpValidator {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.validator_timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            endpoint: config.validator_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Validator for HttpValidator {
    async fn validate(&self, url: &str) -> Result<Vec<ErrorDescriptor>, ValidatorError> {
        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[("url", url)])
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        let errors = decode_response(status, &text)?;

        debug!(url, errors = errors.len(), "validator responded");
        Ok(errors)
    }
}

/// Map a validator HTTP response to its error list.
fn decode_response(status: StatusCode, body: &str) -> Result<Vec<ErrorDescriptor>, ValidatorError> {
    if !status.is_success() {
        return Err(ValidatorError::Status(status.as_u16()));
    }
    let json: Value = serde_json::from_str(body)
        .map_err(|e| ValidatorError::Malformed(format!("invalid JSON: {}", e)))?;
    parse_validator_output(json)
}

/// The validator must answer with a list of objects; anything else is a failure.
pub fn parse_validator_output(json: Value) -> Result<Vec<ErrorDescriptor>, ValidatorError> {
    let Value::Array(items) = json else {
        return Err(ValidatorError::Malformed("expected a JSON array".to_string()));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            ErrorDescriptor::from_value(item)
                .ok_or_else(|| ValidatorError::Malformed(format!("item {} is not an object", i)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_non_success_status() {
        let body = r#"[{"code": "X"}]"#;
        assert!(matches!(
            decode_response(StatusCode::SERVICE_UNAVAILABLE, body),
            Err(ValidatorError::Status(503))
        ));
        assert!(matches!(
            decode_response(StatusCode::NOT_FOUND, "not found"),
            Err(ValidatorError::Status(404))
        ));
    }

    #[test]
    fn test_response_invalid_json() {
        let err = decode_response(StatusCode::OK, "<html>oops</html>").unwrap_err();
        assert!(matches!(&err, ValidatorError::Malformed(msg) if msg.starts_with("invalid JSON")));
    }

    #[test]
    fn test_response_ok() {
        let errors = decode_response(StatusCode::OK, r#"[{"code": "X", "sources": ["s1"]}]"#).unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].get("code"), Some(&json!("X")));
        assert!(decode_response(StatusCode::OK, "[]").unwrap().is_empty());
        assert!(matches!(
            decode_response(StatusCode::OK, r#"{"errors": []}"#),
            Err(ValidatorError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_list_of_objects() {
        let errors = parse_validator_output(json!([
            {"code": "invalid_element", "node_name": "script", "sources": []},
            {"code": "invalid_attribute", "node_name": "onclick"}
        ]))
        .unwrap();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[1].get("node_name"), Some(&json!("onclick")));
    }

    #[test]
    fn test_parse_empty_list() {
        assert!(parse_validator_output(json!([])).unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_non_list() {
        for bad in [json!({"errors": []}), json!(null), json!("oops"), json!([1, 2])] {
            assert!(matches!(
                parse_validator_output(bad),
                Err(ValidatorError::Malformed(_))
            ));
        }
    }
}
