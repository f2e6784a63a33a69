//! Request items and their wire encoding.
//!
//! A request is a batch of items of one kind. The layout is
//! `[tag|terminal][identity][item fields]...` where the item fields are
//! concatenated without any delimiter:
//!
//! | Kind         | Fields                                  |
//! |--------------|-----------------------------------------|
//! | GetValues    | path                                    |
//! | SetValues    | full path, value                        |
//! | Apply        | (none)                                  |
//! | GetCount     | path                                    |
//! | AddObject    | path, optional instance name            |
//! | DeleteObject | path                                    |

use super::buffer::MessageBuffer;
use super::wire_format::MessageType;

/// One request item.
///
/// Items only borrow their strings; nothing is retained after encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request<'a> {
    /// GetParameterValues: read every value at or below a datamodel path.
    GetValues { path: &'a str },
    /// SetParameterValues: change one parameter. All items of a batch are
    /// applied together or not at all.
    SetValues { full_path: &'a str, value: &'a str },
    /// Activate all changes made by earlier requests.
    Apply,
    /// Number of values a GetValues on the same paths would return.
    GetCount { path: &'a str },
    /// Create a new instance of a multi-instance object.
    AddObject {
        path: &'a str,
        name: Option<&'a str>,
    },
    /// Remove an object instance.
    DeleteObject { path: &'a str },
}

impl<'a> Request<'a> {
    /// The kind of this item.
    pub fn kind(&self) -> RequestKind {
        match self {
            Request::GetValues { .. } => RequestKind::GetValues,
            Request::SetValues { .. } => RequestKind::SetValues,
            Request::Apply => RequestKind::Apply,
            Request::GetCount { .. } => RequestKind::GetCount,
            Request::AddObject { .. } => RequestKind::AddObject,
            Request::DeleteObject { .. } => RequestKind::DeleteObject,
        }
    }

    /// Append this item's fields to a request already started in `buf`.
    ///
    /// On failure the buffer may hold a partial item; the caller rolls back.
    pub(crate) fn encode_fields(&self, buf: &mut MessageBuffer) -> bool {
        match *self {
            Request::GetValues { path }
            | Request::GetCount { path }
            | Request::DeleteObject { path } => buf.encode_string(path.as_bytes()),
            Request::SetValues { full_path, value } => {
                buf.encode_string(full_path.as_bytes()) && buf.encode_string(value.as_bytes())
            }
            Request::Apply => true,
            Request::AddObject { path, name } => {
                buf.encode_string(path.as_bytes())
                    && name.map_or(true, |name| buf.encode_string(name.as_bytes()))
            }
        }
    }
}

/// Kind of a request item, shared by every item of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    GetValues,
    SetValues,
    Apply,
    GetCount,
    AddObject,
    DeleteObject,
}

impl RequestKind {
    /// Message type sent on the wire for this kind.
    pub fn message_type(self) -> MessageType {
        match self {
            RequestKind::GetValues => MessageType::GpvReq,
            RequestKind::SetValues => MessageType::SpvReq,
            RequestKind::Apply => MessageType::ApplyReq,
            RequestKind::GetCount => MessageType::GpcReq,
            RequestKind::AddObject => MessageType::AddReq,
            RequestKind::DeleteObject => MessageType::DelReq,
        }
    }

    /// Only one item of this kind fits in a request.
    pub fn is_singleton(self) -> bool {
        matches!(
            self,
            RequestKind::Apply | RequestKind::AddObject | RequestKind::DeleteObject
        )
    }

    /// Whether the service replies to this kind of request at all.
    pub fn expects_response(self) -> bool {
        self != RequestKind::Apply
    }

    /// Name used in log messages.
    pub fn name(self) -> &'static str {
        match self {
            RequestKind::GetValues => "GetValues",
            RequestKind::SetValues => "SetValues",
            RequestKind::Apply => "Apply",
            RequestKind::GetCount => "GetCount",
            RequestKind::AddObject => "AddObject",
            RequestKind::DeleteObject => "DeleteObject",
        }
    }
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
