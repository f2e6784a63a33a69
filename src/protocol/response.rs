//! Response items and their decoding.
//!
//! Each response chunk is `[tag|terminal][item][item]...` with no identity.
//! Item layouts by message type:
//!
//! | Type      | Fields                                         |
//! |-----------|------------------------------------------------|
//! | Error     | u16 code, message                              |
//! | GetValues | partial path, parameter, value, type name      |
//! | SetValues | u16 code, full path, message (one per failure) |
//! | GetCount  | u16 count                                      |
//! | AddObject | instance identifier                            |

use std::str::FromStr;

use super::buffer::MessageBuffer;
use super::wire_format::MessageType;
use crate::error::{ClientError, Result};

/// One response item.
///
/// Strings are owned copies; an item stays valid after the context moves on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// The request could not be processed.
    Error { code: u16, message: String },
    /// The request was processed and there is nothing to return.
    Empty,
    /// One parameter value of a GetValues request.
    Value(ValueEntry),
    /// One SetValues item that could not be applied.
    SetError {
        full_path: String,
        code: u16,
        message: String,
    },
    /// Result of a GetCount request.
    Count(u16),
    /// Index number or name of the instance an AddObject request created.
    NewInstance(String),
}

impl Response {
    /// Check if this is a generic error response.
    #[inline]
    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error { .. })
    }
}

/// A single parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueEntry {
    /// Partial path of the object holding the parameter.
    pub partial_path: String,
    /// Parameter name.
    pub param: String,
    /// Parameter value in its string form.
    pub value: String,
    /// Declared type of the value.
    pub param_type: ParamType,
}

impl ValueEntry {
    /// Full path of the parameter (`partial_path` + `param`).
    pub fn full_path(&self) -> String {
        format!("{}{}", self.partial_path, self.param)
    }

    /// Interpret a boolean value.
    ///
    /// Returns `None` if the parameter is not a boolean or the value is not
    /// one of `"0"`, `"false"`, `"1"`, `"true"`.
    pub fn as_bool(&self) -> Option<bool> {
        if self.param_type != ParamType::Boolean {
            return None;
        }
        match self.value.as_str() {
            "1" | "true" => Some(true),
            "0" | "false" => Some(false),
            _ => None,
        }
    }
}

/// Possible types of a parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    /// A string, possibly empty.
    String,
    /// An unsigned 32-bit integer.
    UnsignedInt,
    /// A signed 32-bit integer.
    Int,
    /// `"0"`/`"false"` or `"1"`/`"true"`.
    Boolean,
    /// Combined date and time according to ISO 8601.
    DateTime,
    /// Base64 encoded binary.
    Base64,
    /// An unsigned 64-bit integer.
    UnsignedLong,
    /// A signed 64-bit integer.
    Long,
    /// Hex encoded binary.
    HexBinary,
    /// A password string.
    Password,
}

impl ParamType {
    /// Type name as it appears on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::UnsignedInt => "unsignedInt",
            ParamType::Int => "int",
            ParamType::Boolean => "boolean",
            ParamType::DateTime => "dateTime",
            ParamType::Base64 => "base64",
            ParamType::UnsignedLong => "unsignedLong",
            ParamType::Long => "long",
            ParamType::HexBinary => "hexBinary",
            ParamType::Password => "password",
        }
    }
}

impl FromStr for ParamType {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "string" => ParamType::String,
            "unsignedInt" => ParamType::UnsignedInt,
            "int" => ParamType::Int,
            "boolean" => ParamType::Boolean,
            "dateTime" => ParamType::DateTime,
            "base64" => ParamType::Base64,
            "unsignedLong" => ParamType::UnsignedLong,
            "long" => ParamType::Long,
            "hexBinary" => ParamType::HexBinary,
            "password" => ParamType::Password,
            // only possible if the service grew a type this client lacks
            other => {
                return Err(ClientError::Protocol(format!(
                    "unknown parameter type '{}'",
                    other
                )))
            }
        })
    }
}

impl std::fmt::Display for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decode one item of the given message type at the buffer's read cursor.
///
/// The caller guarantees at least one undecoded byte is present.
pub(crate) fn decode_item(buf: &mut MessageBuffer, msg_type: MessageType) -> Result<Response> {
    match msg_type {
        MessageType::ErrorResp => {
            let code = read_u16(buf, "error code")?;
            let message = read_string(buf, "error message")?;
            Ok(Response::Error { code, message })
        }
        MessageType::GpvResp => {
            let partial_path = read_string(buf, "partial path")?;
            let param = read_string(buf, "parameter name")?;
            let value = read_string(buf, "value")?;
            let param_type = read_string(buf, "parameter type")?.parse()?;
            Ok(Response::Value(ValueEntry {
                partial_path,
                param,
                value,
                param_type,
            }))
        }
        // Zero error records means success; that case never reaches here
        // because an item-less chunk is reported as Empty.
        MessageType::SpvResp => {
            let code = read_u16(buf, "error code")?;
            let full_path = read_string(buf, "full path")?;
            let message = read_string(buf, "error message")?;
            Ok(Response::SetError {
                full_path,
                code,
                message,
            })
        }
        MessageType::GpcResp => Ok(Response::Count(read_u16(buf, "count")?)),
        MessageType::AddResp => Ok(Response::NewInstance(read_string(buf, "instance")?)),
        other => Err(ClientError::Protocol(format!(
            "unknown response type {}",
            other.as_u8()
        ))),
    }
}

fn read_u16(buf: &mut MessageBuffer, field: &str) -> Result<u16> {
    buf.decode_u16().ok_or_else(|| truncated(buf, field))
}

fn read_string(buf: &mut MessageBuffer, field: &str) -> Result<String> {
    match buf.decode_string() {
        Some(bytes) => String::from_utf8(bytes.to_vec())
            .map_err(|_| ClientError::Protocol(format!("{} is not valid UTF-8", field))),
        None => Err(truncated(buf, field)),
    }
}

fn truncated(buf: &MessageBuffer, field: &str) -> ClientError {
    ClientError::Protocol(format!(
        "truncated {}: only {} of {} bytes left",
        field,
        buf.remaining(),
        buf.len()
    ))
}
