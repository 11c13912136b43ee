//! Live event parameter parsing
//!
//! Exports carry the pixel's parameters either as a query string
//! (`a=1&b=2`, optionally with a leading `?`) or as a JSON array of
//! `key=value` strings (`["a=1","b=2"]`). Keys and values are
//! percent-decoded. A token without `=` is a key with an empty value.

use serde_json::Value;

use crate::error::{PixelError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamToken {
    pub key: String,
    pub value: String,
}

impl ParamToken {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// `key=value` form, used as the example for unknown parameters
    pub fn raw(&self) -> String {
        format!("{}={}", self.key, self.value)
    }

    pub fn to_lowercase(&self) -> Self {
        Self {
            key: self.key.to_lowercase(),
            value: self.value.to_lowercase(),
        }
    }
}

pub fn parse_params(raw: &str) -> Result<Vec<ParamToken>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    if trimmed.starts_with('[') {
        let items: Vec<Value> = serde_json::from_str(trimmed)
            .map_err(|e| PixelError::MalformedEvent(format!("unparsable parameter list: {}", e)))?;
        return items
            .iter()
            .map(|item| match item {
                Value::String(s) => split_token(s),
                other => Err(PixelError::MalformedEvent(format!(
                    "parameter list entries must be strings, got {}",
                    other
                ))),
            })
            .collect();
    }

    trimmed
        .trim_start_matches('?')
        .split('&')
        .filter(|part| !part.is_empty())
        .map(split_token)
        .collect()
}

fn split_token(token: &str) -> Result<ParamToken> {
    let (key, value) = token.split_once('=').unwrap_or((token, ""));
    Ok(ParamToken {
        key: decode(key)?,
        value: decode(value)?,
    })
}

fn decode(part: &str) -> Result<String> {
    urlencoding::decode(part)
        .map(|s| s.into_owned())
        .map_err(|e| PixelError::MalformedEvent(format!("bad percent-encoding in '{}': {}", part, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_string() {
        let tokens = parse_params("?x=1&y=hello%20world&&flag").unwrap();
        assert_eq!(
            tokens,
            vec![
                ParamToken::new("x", "1"),
                ParamToken::new("y", "hello world"),
                ParamToken::new("flag", ""),
            ]
        );
    }

    #[test]
    fn test_json_array() {
        let tokens = parse_params(r#"["x=1", "y=a=b"]"#).unwrap();
        assert_eq!(tokens[0], ParamToken::new("x", "1"));
        // Only the first '=' separates key from value
        assert_eq!(tokens[1], ParamToken::new("y", "a=b"));
    }

    #[test]
    fn test_empty_is_no_tokens() {
        assert!(parse_params("").unwrap().is_empty());
        assert!(parse_params("[]").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_inputs() {
        assert!(matches!(
            parse_params("[\"x=1\""),
            Err(PixelError::MalformedEvent(_))
        ));
        assert!(matches!(
            parse_params("[1, 2]"),
            Err(PixelError::MalformedEvent(_))
        ));
        assert!(matches!(
            parse_params("x=%FF%FE"),
            Err(PixelError::MalformedEvent(_))
        ));
    }
}
