use crate::codes::EventCode;
use serde::{Deserialize, Serialize};
use smartgate_core::constants::{FIELD_DELIMITER, MESSAGE_TERMINATOR, REPLY_FALSE, REPLY_TRUE};

/// Outbound protocol message (unicast response or broadcast event).
///
/// Built by joining fields with the field delimiter and appending the
/// end-of-message marker. Both transports carry the identical encoded
/// string; the raw transport writes it to the stream, the WebSocket
/// transport wraps it in one text frame.
///
/// # Examples
///
/// ```
/// use smartgate_protocol::Response;
///
/// let response = Response::new("INITIALIZATION")
///     .field("AA770201")
///     .field("SMARTBOARD")
///     .field("1")
///     .field("3.58");
///
/// assert_eq!(response.encode(), "INITIALIZATION;AA770201;SMARTBOARD;1;3.58\n");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    fields: Vec<String>,
}

impl Response {
    /// Start a response with the given code as field 0.
    pub fn new(code: impl Into<String>) -> Self {
        Response {
            fields: vec![sanitize(code.into())],
        }
    }

    /// Start a broadcast event message.
    #[must_use]
    pub fn event(code: EventCode) -> Self {
        Response::new(code.as_str())
    }

    /// Shorthand for the boolean-as-string reply family.
    pub fn boolean(code: impl Into<String>, ok: bool) -> Self {
        Response::new(code).field(if ok { REPLY_TRUE } else { REPLY_FALSE })
    }

    /// Append a field.
    ///
    /// Reserved framing bytes inside a value would corrupt the message
    /// boundary, so they are stripped.
    #[must_use]
    pub fn field(mut self, value: impl Into<String>) -> Self {
        self.fields.push(sanitize(value.into()));
        self
    }

    /// Append several fields.
    #[must_use]
    pub fn fields_from<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for value in values {
            self = self.field(value);
        }
        self
    }

    /// All fields, code first.
    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Encode to the wire string, terminator included.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut out = self.fields.join(&(FIELD_DELIMITER as char).to_string());
        out.push(MESSAGE_TERMINATOR as char);
        out
    }
}

fn sanitize(value: String) -> String {
    if value
        .bytes()
        .any(|b| b == FIELD_DELIMITER || b == MESSAGE_TERMINATOR)
    {
        value
            .chars()
            .filter(|c| *c != FIELD_DELIMITER as char && *c != MESSAGE_TERMINATOR as char)
            .collect()
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_single_field() {
        let response = Response::new("ADMIN_SIGN_OUT");
        assert_eq!(response.encode(), "ADMIN_SIGN_OUT\n");
    }

    #[test]
    fn test_encode_with_fields() {
        let response = Response::new("TEMPERATURE").field("21.5");
        assert_eq!(response.encode(), "TEMPERATURE;21.5\n");
    }

    #[test]
    fn test_boolean_reply() {
        assert_eq!(Response::boolean("ADD_USER", true).encode(), "ADD_USER;true\n");
        assert_eq!(Response::boolean("ADD_USER", false).encode(), "ADD_USER;false\n");
    }

    #[test]
    fn test_event_response() {
        let response = Response::event(EventCode::DoorState).field("open");
        assert_eq!(response.encode(), "DOOR_STATE;open\n");
    }

    #[test]
    fn test_reserved_bytes_stripped() {
        let response = Response::new("SCAN_COMPLETED").field("bad;value\n");
        assert_eq!(response.encode(), "SCAN_COMPLETED;badvalue\n");
    }

    #[test]
    fn test_fields_from() {
        let response =
            Response::new("SCAN_COMPLETED").fields_from(["2", "04ABCDEF", "AA770201"]);
        assert_eq!(response.encode(), "SCAN_COMPLETED;2;04ABCDEF;AA770201\n");
    }

    #[test]
    fn test_empty_field_preserved() {
        let response = Response::new("INITIALIZATION").field("");
        assert_eq!(response.encode(), "INITIALIZATION;\n");
    }
}
