use crate::collection::CollectionKind;

/// Value codec errors.
#[derive(Debug, Clone, PartialEq)]
pub enum CodecError {
    /// The value cannot be represented in the canonical encoding
    Encode(String),
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Encode(e) => write!(f, "Encoding error: {e}"),
        }
    }
}

impl std::error::Error for CodecError {}

/// Errors raised by documents, transactions and collections.
#[derive(Debug, Clone, PartialEq)]
pub enum DocError {
    /// The owning document has been released
    Released,
    /// The transaction was already freed
    TransactionFreed,
    /// The engine refused to open a transaction (another one is active)
    TransactionBusy(String),
    /// A list or text position past the end of the collection
    IndexOutOfBounds { index: u32, len: u32 },
    /// A name already in use by a collection of another kind
    KindMismatch {
        name: String,
        existing: CollectionKind,
        requested: CollectionKind,
    },
    /// An undo manager needs at least one tracked collection
    EmptyUndoScope,
    /// A value could not be encoded
    Codec(CodecError),
    /// Malformed state vector or update bytes
    Decode(String),
    /// The engine rejected an update
    Apply(String),
}

impl std::fmt::Display for DocError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Released => write!(f, "Document has been released"),
            Self::TransactionFreed => write!(f, "Transaction has already been freed"),
            Self::TransactionBusy(e) => write!(f, "Cannot open transaction: {e}"),
            Self::IndexOutOfBounds { index, len } => {
                write!(f, "Index {index} out of bounds for length {len}")
            }
            Self::KindMismatch {
                name,
                existing,
                requested,
            } => write!(
                f,
                "Collection '{name}' is a {existing}, requested as {requested}"
            ),
            Self::EmptyUndoScope => write!(f, "Undo manager requires at least one collection"),
            Self::Codec(e) => write!(f, "{e}"),
            Self::Decode(e) => write!(f, "Malformed engine payload: {e}"),
            Self::Apply(e) => write!(f, "Failed to apply update: {e}"),
        }
    }
}

impl std::error::Error for DocError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Codec(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CodecError> for DocError {
    fn from(e: CodecError) -> Self {
        DocError::Codec(e)
    }
}

impl From<yrs::encoding::read::Error> for DocError {
    fn from(e: yrs::encoding::read::Error) -> Self {
        DocError::Decode(e.to_string())
    }
}
