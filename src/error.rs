use crate::boxes::FourCC;

/// Errors produced while parsing a container or querying a track index.
#[derive(thiserror::Error, Debug)]
pub enum DemuxError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// A declared size or count does not fit the bytes that are actually
    /// there. Always fatal for the parse of that subtree.
    #[error("structural violation at {offset:#x}: {reason}")]
    Structural { offset: u64, reason: String },

    /// A layout-bearing field has a value this parser does not implement
    /// (non-zero full-box version, 64-bit size marker, and so on). Fatal,
    /// since every later field offset would be wrong.
    #[error("unsupported variant in '{typ}' at {offset:#x}: {what}")]
    Unsupported {
        typ: FourCC,
        offset: u64,
        what: String,
    },

    /// A sample, chunk, or media-time argument past the end of the track's
    /// tables. Local to the query; the track stays usable.
    #[error("sample index out of range: {reason}")]
    SampleOutOfRange { reason: String },
}

impl DemuxError {
    pub(crate) fn structural(offset: u64, reason: impl Into<String>) -> Self {
        DemuxError::Structural {
            offset,
            reason: reason.into(),
        }
    }

    pub(crate) fn unsupported(typ: FourCC, offset: u64, what: impl Into<String>) -> Self {
        DemuxError::Unsupported {
            typ,
            offset,
            what: what.into(),
        }
    }

    pub(crate) fn out_of_range(reason: impl Into<String>) -> Self {
        DemuxError::SampleOutOfRange {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DemuxError>;
