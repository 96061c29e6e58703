//! Error types and helpers.
use {crate::io, thiserror::Error};

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Write(#[from] WriteError),
    #[error(transparent)]
    Read(#[from] ReadError),
}

/// A record type whose declared shape cannot be compiled into a playbook.
///
/// Schema errors are permanent: they are raised the first time a type is used and every later
/// use of that type returns the same error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Cannot compile field `{field}` of `{type_name}`: {kind}")]
pub struct SchemaError {
    pub type_name: &'static str,
    pub field: &'static str,
    pub kind: SchemaErrorKind,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaErrorKind {
    #[error("type `{0}` has no wire representation")]
    UnsupportedFieldType(&'static str),
    #[error("arrays of arrays are not supported, wrap the inner array in a struct")]
    UnsupportedNestedArray,
    #[error("array fields must declare a size policy")]
    MissingArrayPolicy,
    #[error("end-fill array is not at the end of the record")]
    EndFillNotLast,
    #[error("end-fill array of zero-sized elements")]
    ZeroSizedEndFill,
    #[error("recursive layout through `{0}` has no finite size")]
    InvalidRecursiveLayout(&'static str),
    #[error("encoded size does not fit in `usize`")]
    SizeOverflow,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WriteError {
    #[error(transparent)]
    Io(#[from] io::WriteError),
    #[error("Array holds {len} elements but its fixed length is {max}")]
    ArrayTooLarge { len: usize, max: usize },
    #[error("Field `{field}` of `{type_name}`: {source}")]
    Field {
        type_name: &'static str,
        field: &'static str,
        #[source]
        source: Box<WriteError>,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReadError {
    #[error(transparent)]
    Io(#[from] io::ReadError),
    #[error("End-fill array ended mid-element with {remaining} bytes left")]
    TruncatedElement { remaining: usize },
    #[error("End-fill element consumed no input with {remaining} bytes left")]
    StalledElement { remaining: usize },
    #[error("{remaining} bytes left after the record")]
    TrailingBytes { remaining: usize },
    #[error("Field `{field}` of `{type_name}`: {source}")]
    Field {
        type_name: &'static str,
        field: &'static str,
        #[source]
        source: Box<ReadError>,
    },
}

pub type Result<T> = core::result::Result<T, Error>;
pub type WriteResult<T> = core::result::Result<T, WriteError>;
pub type ReadResult<T> = core::result::Result<T, ReadError>;

impl WriteError {
    /// Attach the innermost offending field. Errors that already name a field pass through.
    pub(crate) fn in_field(self, type_name: &'static str, field: &'static str) -> Self {
        match self {
            err @ WriteError::Field { .. } => err,
            err => WriteError::Field {
                type_name,
                field,
                source: Box::new(err),
            },
        }
    }

    /// The root cause, with field context stripped.
    pub fn kind(&self) -> &WriteError {
        match self {
            WriteError::Field { source, .. } => source.kind(),
            err => err,
        }
    }

    /// `(type_name, field)` of the field that failed, if known.
    pub fn location(&self) -> Option<(&'static str, &'static str)> {
        match self {
            WriteError::Field {
                type_name, field, ..
            } => Some((type_name, field)),
            _ => None,
        }
    }
}

impl ReadError {
    pub(crate) fn in_field(self, type_name: &'static str, field: &'static str) -> Self {
        match self {
            err @ ReadError::Field { .. } => err,
            err => ReadError::Field {
                type_name,
                field,
                source: Box::new(err),
            },
        }
    }

    pub fn kind(&self) -> &ReadError {
        match self {
            ReadError::Field { source, .. } => source.kind(),
            err => err,
        }
    }

    pub fn location(&self) -> Option<(&'static str, &'static str)> {
        match self {
            ReadError::Field {
                type_name, field, ..
            } => Some((type_name, field)),
            _ => None,
        }
    }

    pub(crate) fn is_buffer_too_small(&self) -> bool {
        matches!(
            self.kind(),
            ReadError::Io(io::ReadError::BufferTooSmall { .. })
        )
    }
}

#[cold]
pub const fn array_too_large(len: usize, max: usize) -> WriteError {
    WriteError::ArrayTooLarge { len, max }
}

#[cold]
pub const fn truncated_element(remaining: usize) -> ReadError {
    ReadError::TruncatedElement { remaining }
}

#[cold]
pub const fn stalled_element(remaining: usize) -> ReadError {
    ReadError::StalledElement { remaining }
}

#[cold]
pub const fn trailing_bytes(remaining: usize) -> ReadError {
    ReadError::TrailingBytes { remaining }
}

#[cold]
pub const fn schema_error(
    type_name: &'static str,
    field: &'static str,
    kind: SchemaErrorKind,
) -> SchemaError {
    SchemaError {
        type_name,
        field,
        kind,
    }
}
