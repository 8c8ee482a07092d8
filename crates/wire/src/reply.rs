/// One decoded reply from the length-prefixed array protocol.
///
/// Bulk and array replies carry an explicit null variant (`$-1`, `*-1`)
/// rather than collapsing it into an empty value, since callers
/// distinguish "empty" from "absent" (e.g. a null bulk reply to `GET`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    /// `+...\r\n`
    Simple(String),
    /// `-...\r\n`
    Error(String),
    /// `:...\r\n`
    Integer(i64),
    /// `$<n>\r\n<n bytes>\r\n`, or `None` for the null bulk reply `$-1\r\n`.
    Bulk(Option<Vec<u8>>),
    /// `*<n>\r\n<n replies>`, or `None` for the null array reply `*-1\r\n`.
    Array(Option<Vec<Reply>>),
}

impl Reply {
    /// Returns the bulk payload, if this is a non-null bulk reply.
    #[must_use]
    pub fn as_bulk(&self) -> Option<&[u8]> {
        match self {
            Self::Bulk(Some(bytes)) => Some(bytes.as_slice()),
            _ => None,
        }
    }

    /// Returns the array elements, if this is a non-null array reply.
    #[must_use]
    pub fn as_array(&self) -> Option<&[Reply]> {
        match self {
            Self::Array(Some(items)) => Some(items.as_slice()),
            _ => None,
        }
    }

    /// Renders a simple or bulk reply as a UTF-8 string, lossily.
    #[must_use]
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Simple(text) => Some(text.clone()),
            Self::Bulk(Some(bytes)) => Some(String::from_utf8_lossy(bytes).into_owned()),
            Self::Integer(value) => Some(value.to_string()),
            _ => None,
        }
    }
}
