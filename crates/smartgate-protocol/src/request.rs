use serde::{Deserialize, Serialize};
use smartgate_core::{Error, Result, constants::FIELD_DELIMITER};

/// Parsed client request.
///
/// Field 0 of the decoded payload is the request code; the remaining
/// fields are the parameters. A `Request` lives only for the duration of
/// one dispatch call and is never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub code: String,
    pub params: Vec<String>,
}

impl Request {
    /// Build a request directly (used by tests and internal callers).
    pub fn new(code: impl Into<String>, params: Vec<String>) -> Self {
        Request {
            code: code.into(),
            params,
        }
    }

    /// Parse one decoded payload into a request.
    ///
    /// Empty or whitespace-only payloads are silently discarded and
    /// return `None`; they must produce no dispatch and no response.
    /// Empty fields after the code are preserved (consecutive delimiters
    /// carry meaning).
    #[must_use]
    pub fn parse(payload: &str) -> Option<Self> {
        if payload.trim().is_empty() {
            return None;
        }

        let mut fields = payload.split(FIELD_DELIMITER as char);
        let code = fields.next()?.to_string();
        let params = fields.map(str::to_string).collect();

        Some(Request { code, params })
    }

    /// Get a parameter by index.
    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(|s| s.as_str())
    }

    /// Get a required parameter or error.
    ///
    /// # Errors
    /// Returns `Error::MissingParameter` naming the parameter when the
    /// index is out of range.
    pub fn required_param(&self, index: usize, name: &str) -> Result<&str> {
        self.param(index)
            .ok_or_else(|| Error::MissingParameter(name.to_string()))
    }

    /// Number of parameters (the code is not counted).
    #[must_use]
    pub fn param_count(&self) -> usize {
        self.params.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_parse_code_and_params() {
        let req = Request::parse("ADMIN_SIGN_IN;secret").unwrap();
        assert_eq!(req.code, "ADMIN_SIGN_IN");
        assert_eq!(req.params, vec!["secret".to_string()]);
    }

    #[test]
    fn test_parse_code_only() {
        let req = Request::parse("INITIALIZATION").unwrap();
        assert_eq!(req.code, "INITIALIZATION");
        assert_eq!(req.param_count(), 0);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("\t\r")]
    fn test_parse_blank_payload_discarded(#[case] payload: &str) {
        assert!(Request::parse(payload).is_none());
    }

    #[test]
    fn test_parse_preserves_empty_fields() {
        let req = Request::parse("REWRITE_TAG;;04ABCDEF").unwrap();
        assert_eq!(req.params, vec!["".to_string(), "04ABCDEF".to_string()]);
    }

    #[test]
    fn test_required_param() {
        let req = Request::parse("ADD_USER;alice").unwrap();
        assert_eq!(req.required_param(0, "user").unwrap(), "alice");
        assert!(req.required_param(1, "badge").is_err());
    }
}
