//! Class Metadata Decoder
//!
//! This crate reads the compact metadata header a compiler attaches to its
//! class files, unpacks the encoded declaration tree, and exposes the
//! declarations (class, constructors, functions, properties, parameters)
//! as an immutable model.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod bit_encoding;
pub mod config;
pub mod decoder;
pub mod error;
pub mod flags;
pub mod header;
pub mod model;
pub mod token;
pub mod wire;
pub mod writer;

pub use config::{ConfigError, DecoderConfig};
pub use decoder::{decode, decode_with};
pub use error::DecodeError;
pub use flags::{Flag, Flags};
pub use header::{AnnotationSource, AnnotationValue, ExtraFlags, Header, MetadataKind, MetadataVersion};
pub use model::{
    ClassBuilder, ClassDeclaration, FunctionBuilder, FunctionDeclaration, PropertyBuilder,
    PropertyDeclaration, ValueParameterDeclaration, CONSTRUCTOR_NAME,
};
pub use wire::{WireError, WireReader, WireType, WireWriter};
pub use writer::{encode_class, BitEncodingMode, EncodeOptions};
