//! Wire message framing: decode, emission, and typed argument views.
//!
//! A frame is text of the form `<id> <command>[ <arguments-json>]` with no
//! trailing newline; the WebSocket transport delimits frames. The JSON tail
//! is kept verbatim and parsed on first access.

use std::sync::OnceLock;

use serde_json::Value;
use thiserror::Error;

/// Message ID used for server-initiated (unsolicited) frames.
pub const SERVER_MESSAGE_ID: i64 = -1;

/// Reply command indicating success.
pub const CMD_OK: &str = "ok";

/// Reply command indicating failure.
pub const CMD_ERROR: &str = "error";

/// The command every connection must send first.
pub const CMD_HELLO: &str = "hello";

/// Server-to-client command reserved for the username validation flow.
/// Never emitted by this server; the name stays reserved on the wire.
pub const CMD_AUTHORIZE: &str = "do_authorize";

/// Errors produced while decoding frames or coercing arguments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    /// The frame did not contain an id token and a command token.
    #[error("chat socket protocol error")]
    Malformed,
    /// The message ID was zero or below the server sentinel.
    #[error("chat socket protocol error: negative or zero message ID")]
    BadMessageId,
    /// The argument tail was not valid JSON.
    #[error("bad arguments JSON: {0}")]
    BadJson(String),
    #[error("Error: Expected single string as arguments.")]
    ExpectedSingleString,
    #[error("Error: Expected single integer as arguments.")]
    ExpectedSingleInt,
    #[error("Error: Expected array of string, string as arguments.")]
    ExpectedTwoStrings,
    #[error("Error: Expected array of string, int as arguments.")]
    ExpectedStringAndInt,
    #[error("Error: Second argument was a float, expected an integer.")]
    ExpectedIntGotFloat,
    #[error("Error: Expected array of string, bool as arguments.")]
    ExpectedStringAndBool,
}

impl From<WireError> for chathub_core::error::AppError {
    fn from(err: WireError) -> Self {
        chathub_core::error::AppError::validation(err.to_string())
    }
}

/// One protocol frame: id, command, and an optional JSON argument tail.
#[derive(Debug, Default)]
pub struct WireMessage {
    /// Message ID. Strictly positive for client-initiated frames;
    /// [`SERVER_MESSAGE_ID`] for unsolicited server frames.
    pub id: i64,
    /// Short ASCII command token without whitespace.
    pub command: String,
    /// Verbatim JSON tail, if the frame had one.
    raw_args: Option<String>,
    /// Parse cache for `raw_args`.
    parsed: OnceLock<Value>,
}

impl Clone for WireMessage {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            command: self.command.clone(),
            raw_args: self.raw_args.clone(),
            parsed: OnceLock::new(),
        }
    }
}

impl PartialEq for WireMessage {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.command == other.command && self.raw_args == other.raw_args
    }
}

impl WireMessage {
    /// Create a frame with no arguments.
    pub fn new(id: i64, command: impl Into<String>) -> Self {
        Self {
            id,
            command: command.into(),
            raw_args: None,
            parsed: OnceLock::new(),
        }
    }

    /// Create a frame carrying a JSON argument value.
    pub fn with_args(id: i64, command: impl Into<String>, args: Value) -> Self {
        let raw = args.to_string();
        let parsed = OnceLock::new();
        let _ = parsed.set(args);
        Self {
            id,
            command: command.into(),
            raw_args: Some(raw),
            parsed,
        }
    }

    /// Decode a text frame.
    ///
    /// The id is everything before the first space; the command is the next
    /// token; the rest, if any, is kept verbatim as the argument tail. IDs
    /// in `[-∞,-2] ∪ {0}` are rejected.
    pub fn decode(frame: &str) -> Result<Self, WireError> {
        let (id_str, rest) = frame.split_once(' ').ok_or(WireError::Malformed)?;
        let id: i64 = id_str.parse().map_err(|_| WireError::Malformed)?;
        if id == 0 || id < SERVER_MESSAGE_ID {
            return Err(WireError::BadMessageId);
        }

        let (command, raw_args) = match rest.split_once(' ') {
            None => (rest, None),
            Some((command, tail)) => (command, Some(tail.to_string())),
        };
        if command.is_empty() {
            return Err(WireError::Malformed);
        }

        Ok(Self {
            id,
            command: command.to_string(),
            raw_args,
            parsed: OnceLock::new(),
        })
    }

    /// Emit the frame as wire text.
    ///
    /// A missing command is filled with `ok` and a missing id with `-1`.
    /// Emitting a frame with both missing is a programming error.
    ///
    /// # Panics
    ///
    /// Panics if both the command is empty and the id is zero.
    pub fn encode(&self) -> String {
        assert!(
            !(self.command.is_empty() && self.id == 0),
            "attempt to emit an empty frame"
        );

        let id = if self.id == 0 { SERVER_MESSAGE_ID } else { self.id };
        let command = if self.command.is_empty() {
            CMD_OK
        } else {
            &self.command
        };

        match &self.raw_args {
            Some(raw) => format!("{id} {command} {raw}"),
            None => format!("{id} {command}"),
        }
    }

    /// The parsed argument value, or `None` for a frame without a tail.
    pub fn arguments(&self) -> Result<Option<&Value>, WireError> {
        let raw = match &self.raw_args {
            None => return Ok(None),
            Some(raw) => raw,
        };
        if let Some(value) = self.parsed.get() {
            return Ok(Some(value));
        }
        let value: Value =
            serde_json::from_str(raw).map_err(|e| WireError::BadJson(e.to_string()))?;
        Ok(Some(self.parsed.get_or_init(|| value)))
    }

    /// Arguments as a single string.
    pub fn args_string(&self) -> Result<&str, WireError> {
        self.arguments()?
            .and_then(Value::as_str)
            .ok_or(WireError::ExpectedSingleString)
    }

    /// Arguments as a single integer. Non-integer numerics are rejected.
    pub fn args_int(&self) -> Result<i64, WireError> {
        self.arguments()?
            .and_then(Value::as_i64)
            .ok_or(WireError::ExpectedSingleInt)
    }

    /// Arguments as an array of two strings. The second element may be JSON
    /// null, which coerces to the empty string.
    pub fn args_two_strings(&self) -> Result<(&str, &str), WireError> {
        let pair = self
            .arguments()?
            .and_then(Value::as_array)
            .filter(|a| a.len() == 2)
            .ok_or(WireError::ExpectedTwoStrings)?;
        let first = pair[0].as_str().ok_or(WireError::ExpectedTwoStrings)?;
        let second = match &pair[1] {
            Value::Null => "",
            other => other.as_str().ok_or(WireError::ExpectedTwoStrings)?,
        };
        Ok((first, second))
    }

    /// Arguments as an array of a string and an integer. A float second
    /// element is rejected with a distinct error.
    pub fn args_string_int(&self) -> Result<(&str, i64), WireError> {
        let pair = self
            .arguments()?
            .and_then(Value::as_array)
            .filter(|a| a.len() == 2)
            .ok_or(WireError::ExpectedStringAndInt)?;
        let first = pair[0].as_str().ok_or(WireError::ExpectedStringAndInt)?;
        let second = match &pair[1] {
            Value::Number(n) => n.as_i64().ok_or(WireError::ExpectedIntGotFloat)?,
            _ => return Err(WireError::ExpectedStringAndInt),
        };
        Ok((first, second))
    }

    /// Arguments as an array of a string and a boolean.
    pub fn args_string_bool(&self) -> Result<(&str, bool), WireError> {
        let pair = self
            .arguments()?
            .and_then(Value::as_array)
            .filter(|a| a.len() == 2)
            .ok_or(WireError::ExpectedStringAndBool)?;
        let first = pair[0].as_str().ok_or(WireError::ExpectedStringAndBool)?;
        let second = pair[1].as_bool().ok_or(WireError::ExpectedStringAndBool)?;
        Ok((first, second))
    }
}
