use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::Display;

/// Parameter mapping attached to a command or carried by a response.
pub type Params = Map<String, Value>;

/// A caller-submitted request naming an action and its parameters.
///
/// Commands are constructed per call and never persisted. The external
/// CLI/HTTP layers deserialize their transport payloads into this shape
/// before handing it to the dispatcher.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Command {
    /// Name of the action to dispatch.
    pub action: String,
    /// Parameters forwarded to the resolved handler.
    #[serde(default)]
    pub params: Params,
}

impl Command {
    /// Create a command with no parameters.
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            params: Params::new(),
        }
    }

    /// Create a command with the given parameters.
    pub fn with_params(action: impl Into<String>, params: Params) -> Self {
        Self {
            action: action.into(),
            params,
        }
    }

    /// Attach a single parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// Outcome classification carried by every [`Response`].
///
/// The dispatcher only ever synthesizes [`Status::Error`] responses itself;
/// the remaining variants belong to handlers.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Success,
    Error,
    Nudge,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Ok => "ok",
            Status::Success => "success",
            Status::Error => "error",
            Status::Nudge => "nudge",
        }
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Structured result returned from every dispatch.
///
/// Only the `status`/`message` pair is canonical; handlers attach domain
/// fields freely via [`Response::with_field`], and those fields are flattened
/// alongside the pair when serialized. The dispatcher passes successful
/// handler responses through unchanged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub status: Status,
    pub message: String,
    /// Handler-defined domain fields, serialized inline.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Response {
    fn new(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            fields: Map::new(),
        }
    }

    /// A response with [`Status::Ok`].
    pub fn ok(message: impl Into<String>) -> Self {
        Self::new(Status::Ok, message)
    }

    /// A response with [`Status::Success`].
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(Status::Success, message)
    }

    /// A response with [`Status::Error`].
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Status::Error, message)
    }

    /// A response with [`Status::Nudge`].
    pub fn nudge(message: impl Into<String>) -> Self {
        Self::new(Status::Nudge, message)
    }

    /// Attach a domain field to this response.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Whether this response carries an error status.
    pub fn is_error(&self) -> bool {
        self.status == Status::Error
    }
}
