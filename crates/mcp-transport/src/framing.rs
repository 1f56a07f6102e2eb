//! Line framing for the stdio transport.
//!
//! One envelope per LF-terminated line. Any embedded `\r`, `\n`, or `\r\n`
//! inside the serialized JSON is escaped to the two-character sequence
//! `\n` before the line terminator is appended, so a reader can always
//! split on a single LF byte.

use crate::TransportError;
use mcp_types::JSONRPCMessage;

/// Escape any literal carriage-return/newline bytes in `text`, collapsing
/// `\r\n` to a single escape rather than two.
pub fn escape_embedded_newlines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push_str("\\n");
            }
            '\n' => out.push_str("\\n"),
            other => out.push(other),
        }
    }
    out
}

/// Serialize `message` and produce a single LF-terminated line ready to be
/// written to a stdio pipe.
pub fn frame_line(message: &JSONRPCMessage) -> Result<String, TransportError> {
    let json = serde_json::to_string(message).map_err(TransportError::Decode)?;
    let mut line = escape_embedded_newlines(&json);
    line.push('\n');
    Ok(line)
}

/// Parse a single line (without its terminator) back into an envelope.
pub fn parse_line(line: &str) -> Result<JSONRPCMessage, TransportError> {
    let value: serde_json::Value =
        serde_json::from_str(line).map_err(TransportError::Decode)?;
    Ok(JSONRPCMessage::parse(value)?)
}
