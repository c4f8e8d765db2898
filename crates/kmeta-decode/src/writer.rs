//! Metadata writer
//!
//! Encodes a [`ClassDeclaration`] back into a [`Header`] that [`decode`]
//! reads into an equal declaration. Used to produce fixtures and by tools
//! that rewrite metadata.
//!
//! [`decode`]: crate::decoder::decode

use crate::bit_encoding;
use crate::flags::Flags;
use crate::header::{Header, MetadataKind, MetadataVersion};
use crate::model::{ClassDeclaration, FunctionDeclaration, PropertyDeclaration};
use crate::token::{fields, HOST_BINDING_EXTENSION};
use crate::wire::WireWriter;
use rustc_hash::FxHashMap;

/// Packing used for `d1`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BitEncodingMode {
    /// One byte per char, marked with a leading `U+0000`
    #[default]
    Utf8,
    /// 7-bit units
    SevenBit,
}

/// Header-level settings for [`encode_class`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Version written to `mv`
    pub version: MetadataVersion,
    /// Packing of `d1`
    pub mode: BitEncodingMode,
    /// Value of `xs`
    pub extra_string: String,
    /// Value of `pn`
    pub package_name: Option<String>,
    /// Value of `xi`
    pub extra_int: Option<i32>,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            version: MetadataVersion::CURRENT,
            mode: BitEncodingMode::default(),
            extra_string: String::new(),
            package_name: None,
            extra_int: None,
        }
    }
}

/// Encode a class declaration into a metadata header
pub fn encode_class(class: &ClassDeclaration, options: &EncodeOptions) -> Header {
    let mut strings = StringTableBuilder::default();
    let mut writer = WireWriter::new();

    writer.emit_uint(fields::FLAGS, class.flags().bits().into());
    writer.emit_uint(fields::class::NAME, strings.index(class.name()));
    if let Some(companion) = class.companion_object_name() {
        writer.emit_uint(fields::class::COMPANION_OBJECT_NAME, strings.index(companion));
    }
    for constructor in class.constructors() {
        writer.emit_message(fields::class::CONSTRUCTOR, |w| {
            write_function(w, constructor, &mut strings)
        });
    }
    for function in class.functions() {
        writer.emit_message(fields::class::FUNCTION, |w| {
            write_function(w, function, &mut strings)
        });
    }
    for property in class.properties() {
        writer.emit_message(fields::class::PROPERTY, |w| {
            write_property(w, property, &mut strings)
        });
    }

    let bytes = writer.into_bytes();
    let data1 = match options.mode {
        BitEncodingMode::Utf8 => bit_encoding::encode_utf8(&bytes),
        BitEncodingMode::SevenBit => bit_encoding::encode_7bit(&bytes),
    };

    tracing::debug!(
        class = class.name(),
        bytes = bytes.len(),
        strings = strings.len(),
        "encoded class metadata"
    );

    Header {
        kind: MetadataKind::Class,
        version: options.version,
        data1,
        data2: strings.finish(),
        extra_string: options.extra_string.clone(),
        package_name: options.package_name.clone(),
        extra_int: options.extra_int,
    }
}

fn write_function(w: &mut WireWriter, function: &FunctionDeclaration, strings: &mut StringTableBuilder) {
    let parameter_field = if function.is_constructor() {
        fields::constructor::VALUE_PARAMETER
    } else {
        fields::function::VALUE_PARAMETER
    };

    write_flags(w, function.flags());
    if !function.is_constructor() {
        w.emit_uint(fields::function::NAME, strings.index(function.name()));
    }
    for parameter in function.parameters() {
        w.emit_message(parameter_field, |p| {
            write_flags(p, parameter.flags());
            p.emit_uint(fields::value_parameter::NAME, strings.index(parameter.name()));
        });
    }
    if let Some(signature) = function.signature() {
        w.emit_message(HOST_BINDING_EXTENSION, |ext| {
            write_signature(ext, signature, '(', strings)
        });
    }
}

fn write_property(w: &mut WireWriter, property: &PropertyDeclaration, strings: &mut StringTableBuilder) {
    use fields::property_signature::*;

    write_flags(w, property.flags());
    w.emit_uint(fields::property::NAME, strings.index(property.name()));
    if let Some(flags) = property.getter_flags() {
        w.emit_uint(fields::property::GETTER_FLAGS, flags.bits().into());
    }
    if let Some(flags) = property.setter_flags() {
        w.emit_uint(fields::property::SETTER_FLAGS, flags.bits().into());
    }

    let bindings = [
        (FIELD, property.field_signature(), ':'),
        (SYNTHETIC_METHOD, property.annotation_carrier_signature(), '('),
        (GETTER, property.getter_signature(), '('),
        (SETTER, property.setter_signature(), '('),
    ];
    if bindings.iter().all(|(_, signature, _)| signature.is_none()) {
        return;
    }
    w.emit_message(HOST_BINDING_EXTENSION, |ext| {
        for (field, signature, separator) in bindings {
            if let Some(signature) = signature {
                ext.emit_message(field, |s| write_signature(s, signature, separator, strings));
            }
        }
    });
}

/// Split `signature` at `separator` into name and descriptor entries
fn write_signature(w: &mut WireWriter, signature: &str, separator: char, strings: &mut StringTableBuilder) {
    let (name, desc) = match signature.find(separator) {
        Some(at) if separator == ':' => (&signature[..at], &signature[at + 1..]),
        Some(at) => signature.split_at(at),
        None => ("", signature),
    };
    if !name.is_empty() {
        w.emit_uint(fields::method_signature::NAME, strings.index(name));
    }
    w.emit_uint(fields::method_signature::DESC, strings.index(desc));
}

fn write_flags(w: &mut WireWriter, flags: Flags) {
    w.emit_uint(fields::FLAGS, flags.bits().into());
}

/// Deduplicating `d2` builder
#[derive(Default)]
struct StringTableBuilder {
    strings: Vec<String>,
    indices: FxHashMap<String, u64>,
}

impl StringTableBuilder {
    fn index(&mut self, value: &str) -> u64 {
        if let Some(&index) = self.indices.get(value) {
            return index;
        }
        let index = self.strings.len() as u64;
        self.strings.push(value.to_string());
        self.indices.insert(value.to_string(), index);
        index
    }

    fn len(&self) -> usize {
        self.strings.len()
    }

    fn finish(self) -> Vec<String> {
        self.strings
    }
}
