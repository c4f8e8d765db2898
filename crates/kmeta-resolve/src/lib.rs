//! Metadata Correlation
//!
//! Connects host reflection objects (fields, methods) with the declarations
//! decoded by `kmeta-decode`. A [`MetadataSession`] decodes each host type at
//! most once; the resulting [`TypeMetadata`] answers per-field queries
//! (backing property, getter, annotation carrier) and memoizes the answers.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod error;
pub mod host;
pub mod metadata;
pub mod session;
pub mod signature_index;

pub use error::ResolveError;
pub use host::HostType;
pub use metadata::{ResolvedMember, TypeMetadata, DELEGATED_PROPERTY_SUFFIX};
pub use session::MetadataSession;
pub use signature_index::SignatureIndex;
