//! Metadata header
//!
//! The header is carried by an annotation-like key/value container on the
//! compiled class. [`Header::read`] pulls the fixed set of fields out of an
//! [`AnnotationSource`] and normalizes them.

use crate::error::DecodeError;
use bitflags::bitflags;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::BuildHasher;
use std::str::FromStr;

/// Metadata kind key (`k`)
pub const KEY_KIND: &str = "k";
/// Metadata version key (`mv`)
pub const KEY_VERSION: &str = "mv";
/// Encoded declaration data key (`d1`)
pub const KEY_DATA1: &str = "d1";
/// String table key (`d2`)
pub const KEY_DATA2: &str = "d2";
/// Extra string key (`xs`)
pub const KEY_EXTRA_STRING: &str = "xs";
/// Package name hint key (`pn`)
pub const KEY_PACKAGE_NAME: &str = "pn";
/// Extra int key (`xi`)
pub const KEY_EXTRA_INT: &str = "xi";

/// A single value inside an annotation container
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationValue {
    /// Scalar integer
    Int(i32),
    /// Integer array
    IntArray(Vec<i32>),
    /// Scalar string
    String(String),
    /// String array
    StringArray(Vec<String>),
}

impl AnnotationValue {
    fn shape(&self) -> &'static str {
        match self {
            AnnotationValue::Int(_) => "int",
            AnnotationValue::IntArray(_) => "int array",
            AnnotationValue::String(_) => "string",
            AnnotationValue::StringArray(_) => "string array",
        }
    }
}

/// A key/value container carrying the metadata header fields
pub trait AnnotationSource {
    /// Look up a value by key
    fn value(&self, name: &str) -> Option<&AnnotationValue>;
}

impl<S: BuildHasher> AnnotationSource for HashMap<String, AnnotationValue, S> {
    fn value(&self, name: &str) -> Option<&AnnotationValue> {
        self.get(name)
    }
}

impl AnnotationSource for BTreeMap<String, AnnotationValue> {
    fn value(&self, name: &str) -> Option<&AnnotationValue> {
        self.get(name)
    }
}

/// What a metadata header describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataKind {
    /// A class, interface, object or similar
    Class,
    /// Top-level declarations of a single source file
    FileFacade,
    /// A compiler-generated class (lambdas, default implementations)
    SyntheticClass,
    /// Facade over several file parts
    MultiFileClassFacade,
    /// One part of a multi-file facade
    MultiFileClassPart,
    /// A kind this decoder does not know
    Unknown(i32),
}

impl MetadataKind {
    /// Convert from the raw `k` value
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            1 => MetadataKind::Class,
            2 => MetadataKind::FileFacade,
            3 => MetadataKind::SyntheticClass,
            4 => MetadataKind::MultiFileClassFacade,
            5 => MetadataKind::MultiFileClassPart,
            other => MetadataKind::Unknown(other),
        }
    }

    /// Convert to the raw `k` value
    pub fn to_raw(self) -> i32 {
        match self {
            MetadataKind::Class => 1,
            MetadataKind::FileFacade => 2,
            MetadataKind::SyntheticClass => 3,
            MetadataKind::MultiFileClassFacade => 4,
            MetadataKind::MultiFileClassPart => 5,
            MetadataKind::Unknown(raw) => raw,
        }
    }
}

/// Metadata format version (`major.minor.patch`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct MetadataVersion {
    /// Major component
    pub major: u32,
    /// Minor component
    pub minor: u32,
    /// Patch component
    pub patch: u32,
}

impl MetadataVersion {
    /// Oldest version the decoder understands by default
    pub const MINIMUM_SUPPORTED: MetadataVersion = MetadataVersion::new(1, 1, 0);

    /// Version the writer stamps by default
    pub const CURRENT: MetadataVersion = MetadataVersion::new(1, 9, 0);

    /// Create a version
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }

    /// Encode as the `mv` integer array
    pub fn to_array(self) -> Vec<i32> {
        vec![self.major as i32, self.minor as i32, self.patch as i32]
    }
}

impl fmt::Display for MetadataVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for MetadataVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('.').collect();
        if parts.len() != 3 {
            return Err(format!("Invalid version format: {s}"));
        }
        let component = |part: &str| {
            part.parse::<u32>()
                .map_err(|_| format!("Invalid version component `{part}` in {s}"))
        };
        Ok(Self::new(
            component(parts[0])?,
            component(parts[1])?,
            component(parts[2])?,
        ))
    }
}

impl TryFrom<String> for MetadataVersion {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

bitflags! {
    /// Bits of the extra int (`xi`) header field
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ExtraFlags: u32 {
        /// Parts of a multi-file facade inherit from each other
        const MULTI_FILE_PARTS_INHERIT = 1 << 0;
        /// Produced by a pre-release compiler
        const PRE_RELEASE = 1 << 1;
        /// Compiled from a script
        const SCRIPT = 1 << 2;
        /// Version must be checked strictly
        const STRICT_VERSION_SEMANTICS = 1 << 3;
        /// Produced by the IR backend
        const IR_BACKEND = 1 << 4;
    }
}

/// Normalized metadata header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// What the metadata describes (`k`)
    pub kind: MetadataKind,
    /// Metadata version (`mv`)
    pub version: MetadataVersion,
    /// Encoded declaration tree (`d1`)
    pub data1: Vec<String>,
    /// String table (`d2`)
    pub data2: Vec<String>,
    /// Extra string (`xs`)
    pub extra_string: String,
    /// Package name hint (`pn`)
    pub package_name: Option<String>,
    /// Extra int (`xi`)
    pub extra_int: Option<i32>,
}

impl Header {
    /// Read the header fields from an annotation container
    pub fn read(source: &dyn AnnotationSource) -> Result<Self, DecodeError> {
        let kind = MetadataKind::from_raw(required_int(source, KEY_KIND)?);
        let version = read_version(source)?;
        let data1 = required_string_array(source, KEY_DATA1)?;
        let data2 = required_string_array(source, KEY_DATA2)?;
        let extra_string = required_string(source, KEY_EXTRA_STRING)?;
        let package_name = optional_string(source, KEY_PACKAGE_NAME)?;
        let extra_int = optional_int(source, KEY_EXTRA_INT)?;

        tracing::trace!(?kind, %version, d1 = data1.len(), d2 = data2.len(), "read metadata header");

        Ok(Self {
            kind,
            version,
            data1,
            data2,
            extra_string,
            package_name,
            extra_int,
        })
    }

    /// Typed view of the extra int; unknown bits are dropped
    pub fn extra_flags(&self) -> ExtraFlags {
        ExtraFlags::from_bits_truncate(self.extra_int.unwrap_or(0) as u32)
    }

    /// Render the header back into container entries
    pub fn to_values(&self) -> BTreeMap<String, AnnotationValue> {
        let mut values = BTreeMap::new();
        values.insert(KEY_KIND.to_string(), AnnotationValue::Int(self.kind.to_raw()));
        values.insert(
            KEY_VERSION.to_string(),
            AnnotationValue::IntArray(self.version.to_array()),
        );
        values.insert(
            KEY_DATA1.to_string(),
            AnnotationValue::StringArray(self.data1.clone()),
        );
        values.insert(
            KEY_DATA2.to_string(),
            AnnotationValue::StringArray(self.data2.clone()),
        );
        values.insert(
            KEY_EXTRA_STRING.to_string(),
            AnnotationValue::String(self.extra_string.clone()),
        );
        if let Some(package) = &self.package_name {
            values.insert(
                KEY_PACKAGE_NAME.to_string(),
                AnnotationValue::String(package.clone()),
            );
        }
        if let Some(extra) = self.extra_int {
            values.insert(KEY_EXTRA_INT.to_string(), AnnotationValue::Int(extra));
        }
        values
    }
}

fn malformed(field: &'static str, reason: impl Into<String>) -> DecodeError {
    DecodeError::MalformedHeader {
        field,
        reason: reason.into(),
    }
}

fn wrong_shape(field: &'static str, expected: &str, found: &AnnotationValue) -> DecodeError {
    malformed(field, format!("expected {expected}, found {}", found.shape()))
}

fn required<'a>(
    source: &'a dyn AnnotationSource,
    field: &'static str,
) -> Result<&'a AnnotationValue, DecodeError> {
    source.value(field).ok_or_else(|| malformed(field, "is missing"))
}

fn required_int(source: &dyn AnnotationSource, field: &'static str) -> Result<i32, DecodeError> {
    match required(source, field)? {
        AnnotationValue::Int(value) => Ok(*value),
        other => Err(wrong_shape(field, "int", other)),
    }
}

fn required_string(
    source: &dyn AnnotationSource,
    field: &'static str,
) -> Result<String, DecodeError> {
    match required(source, field)? {
        AnnotationValue::String(value) => Ok(value.clone()),
        other => Err(wrong_shape(field, "string", other)),
    }
}

fn required_string_array(
    source: &dyn AnnotationSource,
    field: &'static str,
) -> Result<Vec<String>, DecodeError> {
    match required(source, field)? {
        AnnotationValue::StringArray(values) => Ok(values.clone()),
        other => Err(wrong_shape(field, "string array", other)),
    }
}

fn optional_string(
    source: &dyn AnnotationSource,
    field: &'static str,
) -> Result<Option<String>, DecodeError> {
    match source.value(field) {
        None => Ok(None),
        Some(AnnotationValue::String(value)) => Ok(Some(value.clone())),
        Some(other) => Err(wrong_shape(field, "string", other)),
    }
}

fn optional_int(
    source: &dyn AnnotationSource,
    field: &'static str,
) -> Result<Option<i32>, DecodeError> {
    match source.value(field) {
        None => Ok(None),
        Some(AnnotationValue::Int(value)) => Ok(Some(*value)),
        Some(other) => Err(wrong_shape(field, "int", other)),
    }
}

fn read_version(source: &dyn AnnotationSource) -> Result<MetadataVersion, DecodeError> {
    let parts = match required(source, KEY_VERSION)? {
        AnnotationValue::IntArray(parts) => parts,
        other => return Err(wrong_shape(KEY_VERSION, "int array", other)),
    };
    if parts.len() < 3 {
        return Err(malformed(
            KEY_VERSION,
            format!("needs 3 components, found {}", parts.len()),
        ));
    }
    let component = |part: i32| {
        u32::try_from(part).map_err(|_| malformed(KEY_VERSION, format!("negative component {part}")))
    };
    Ok(MetadataVersion::new(
        component(parts[0])?,
        component(parts[1])?,
        component(parts[2])?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> HashMap<String, AnnotationValue> {
        let mut values = HashMap::new();
        values.insert("k".to_string(), AnnotationValue::Int(1));
        values.insert("mv".to_string(), AnnotationValue::IntArray(vec![1, 8, 0]));
        values.insert(
            "d1".to_string(),
            AnnotationValue::StringArray(vec!["\u{0}abc".to_string()]),
        );
        values.insert(
            "d2".to_string(),
            AnnotationValue::StringArray(vec!["Foo".to_string()]),
        );
        values.insert("xs".to_string(), AnnotationValue::String(String::new()));
        values
    }

    #[test]
    fn test_read_complete_header() {
        let header = Header::read(&complete()).unwrap();
        assert_eq!(header.kind, MetadataKind::Class);
        assert_eq!(header.version, MetadataVersion::new(1, 8, 0));
        assert_eq!(header.data2, vec!["Foo".to_string()]);
        assert_eq!(header.package_name, None);
        assert_eq!(header.extra_int, None);
    }

    #[test]
    fn test_optional_fields() {
        let mut values = complete();
        values.insert("pn".to_string(), AnnotationValue::String("com.example".into()));
        values.insert("xi".to_string(), AnnotationValue::Int(0b10010));

        let header = Header::read(&values).unwrap();
        assert_eq!(header.package_name.as_deref(), Some("com.example"));
        assert!(header.extra_flags().contains(ExtraFlags::PRE_RELEASE));
        assert!(header.extra_flags().contains(ExtraFlags::IR_BACKEND));
        assert!(!header.extra_flags().contains(ExtraFlags::SCRIPT));
    }

    #[test]
    fn test_missing_required_field() {
        for key in ["k", "mv", "d1", "d2", "xs"] {
            let mut values = complete();
            values.remove(key);
            let err = Header::read(&values).unwrap_err();
            assert!(
                matches!(err, DecodeError::MalformedHeader { field, .. } if field == key),
                "{key}: {err}"
            );
        }
    }

    #[test]
    fn test_wrong_shape() {
        let mut values = complete();
        values.insert("d1".to_string(), AnnotationValue::String("oops".into()));
        let err = Header::read(&values).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedHeader { field: "d1", .. }));

        let mut values = complete();
        values.insert("xi".to_string(), AnnotationValue::String("1".into()));
        let err = Header::read(&values).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedHeader { field: "xi", .. }));
    }

    #[test]
    fn test_short_version() {
        let mut values = complete();
        values.insert("mv".to_string(), AnnotationValue::IntArray(vec![1, 4]));
        let err = Header::read(&values).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedHeader { field: "mv", .. }));
    }

    #[test]
    fn test_version_parsing_and_order() {
        let version: MetadataVersion = "1.9.0".parse().unwrap();
        assert_eq!(version, MetadataVersion::new(1, 9, 0));
        assert_eq!(version.to_string(), "1.9.0");
        assert!("1.9".parse::<MetadataVersion>().is_err());
        assert!("1.x.0".parse::<MetadataVersion>().is_err());

        assert!(MetadataVersion::new(1, 0, 3) < MetadataVersion::MINIMUM_SUPPORTED);
        assert!(MetadataVersion::new(2, 0, 0) > MetadataVersion::new(1, 9, 24));
    }

    #[test]
    fn test_values_roundtrip() {
        let header = Header::read(&complete()).unwrap();
        let reread = Header::read(&header.to_values()).unwrap();
        assert_eq!(header, reread);
    }
}
