use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    /// Returns `true` when the error was raised because a decode source buffer
    /// could not satisfy the byte demands of the layout.
    pub fn is_buffer_too_short(&self) -> bool {
        matches!(self.kind(), ErrorKind::BufferTooShort { .. })
    }

    pub fn buffer_too_short(
        member: impl Into<String>,
        offset: usize,
        needed: usize,
        available: usize,
    ) -> Error {
        Error(
            ErrorKind::BufferTooShort {
                member: member.into(),
                offset,
                needed,
                available,
            }
            .into(),
        )
    }

    pub fn invalid_value(member: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidValue {
                member: member.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn type_mismatch(member: impl Into<String>, expected: &'static str) -> Error {
        Error(
            ErrorKind::TypeMismatch {
                member: member.into(),
                expected,
            }
            .into(),
        )
    }

    pub fn length_overflow(member: impl Into<String>, len: usize) -> Error {
        Error(
            ErrorKind::LengthOverflow {
                member: member.into(),
                len,
            }
            .into(),
        )
    }

    pub fn unsupported_type(type_name: impl Into<String>) -> Error {
        Error(
            ErrorKind::UnsupportedType {
                type_name: type_name.into(),
            }
            .into(),
        )
    }

    pub fn build_failed(type_name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::BuildFailed {
                type_name: type_name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn invalid_arg(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidArgument {
                name: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error(
        "buffer too short for member '{member}': {needed} bytes needed at offset {offset}, \
         buffer holds {available}"
    )]
    BufferTooShort {
        member: String,
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("invalid value for member '{member}': {message}")]
    InvalidValue { member: String, message: String },

    #[error("member '{member}' does not hold a {expected}")]
    TypeMismatch {
        member: String,
        expected: &'static str,
    },

    #[error("member '{member}' is too large to encode ({len} bytes)")]
    LengthOverflow { member: String, len: usize },

    #[error("type '{type_name}' has no supported layout")]
    UnsupportedType { type_name: String },

    #[error("failed to build codec for '{type_name}': {message}")]
    BuildFailed { type_name: String, message: String },

    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}
