//! Resolution errors

use kmeta_decode::DecodeError;
use thiserror::Error;

/// Errors raised while resolving host members against metadata
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ResolveError {
    /// The type's metadata could not be decoded
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The host type carries no metadata container
    #[error("Type {type_name} has no class metadata")]
    MissingMetadata {
        /// Host type name
        type_name: String,
    },

    /// A field matched no property, or more than one
    #[error("No unique property for field {field}: {matches} properties named `{candidate}`")]
    PropertyNotFound {
        /// Host field, qualified by its type
        field: String,
        /// Property name derived from the field name
        candidate: String,
        /// Number of properties with that name
        matches: usize,
    },
}
