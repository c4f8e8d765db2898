//! Metadata decoding errors

use crate::header::MetadataVersion;
use crate::token::NodeKind;
use crate::wire::{WireError, WireType};
use thiserror::Error;

/// Errors that abort decoding of a class's metadata
///
/// A decode error never leaves a partially built declaration tree behind.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DecodeError {
    /// A required header field is absent or has the wrong shape
    #[error("Malformed metadata header: field `{field}` {reason}")]
    MalformedHeader {
        /// Header field key
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },

    /// Metadata version is older than the decoder understands
    #[error(
        "Unsupported metadata version {version} (minimum supported: {minimum}). \
         Check that your compiler toolchain is up to date"
    )]
    UnsupportedVersion {
        /// Version found in the header
        version: MetadataVersion,
        /// Minimum supported version
        minimum: MetadataVersion,
    },

    /// Metadata version is newer than the configured maximum
    #[error("Incompatible metadata version {version} (maximum supported: {maximum})")]
    IncompatibleVersion {
        /// Version found in the header
        version: MetadataVersion,
        /// Maximum supported version
        maximum: MetadataVersion,
    },

    /// Header describes something other than a class
    #[error("Unsupported metadata kind: {0}")]
    UnsupportedKind(i32),

    /// Pre-release metadata while pre-release input is disallowed
    #[error("Metadata was produced by a pre-release compiler")]
    PreRelease,

    /// `d1` contains characters outside the encoding's range
    #[error("Malformed encoded data in d1[{index}] at char {offset}: {reason}")]
    MalformedData {
        /// Index of the offending string
        index: usize,
        /// Char offset inside that string
        offset: usize,
        /// Description
        reason: String,
    },

    /// Wire-level error in the encoded declaration tree
    #[error("Wire error: {0}")]
    Wire(#[from] WireError),

    /// Name index outside of the string table
    #[error("String table index {index} out of range (table size {len})")]
    InvalidStringIndex {
        /// Index found in the data
        index: u64,
        /// Size of the string table
        len: usize,
    },

    /// A declaration without its required name
    #[error("{0} declaration has no name")]
    MissingName(NodeKind),

    /// A known field carried with the wrong wire type
    #[error("Field {field} of {node} has unexpected wire type {wire_type:?}")]
    UnexpectedField {
        /// Declaration kind being read
        node: NodeKind,
        /// Field number
        field: u32,
        /// Wire type found
        wire_type: WireType,
    },
}
