//! Metadata decoder
//!
//! Turns a [`Header`] into a [`ClassDeclaration`]. The header's version,
//! kind and extra flags are checked first; then `d1` is unpacked into bytes
//! and the token stream is folded into one pending record per open
//! declaration. A pending record is sealed into its immutable declaration
//! when its `Exit` token arrives.

use crate::bit_encoding;
use crate::config::DecoderConfig;
use crate::error::DecodeError;
use crate::flags::Flags;
use crate::header::{ExtraFlags, Header, MetadataKind};
use crate::model::{
    ClassBuilder, ClassDeclaration, FunctionBuilder, PropertyBuilder, ValueParameterDeclaration,
    CONSTRUCTOR_NAME,
};
use crate::token::{fields, NodeKind, Token, TokenReader, HOST_BINDING_EXTENSION};
use crate::wire::{WireReader, WireType};

/// Suffix of the synthetic method carrying a property's annotations
pub const ANNOTATION_CARRIER_SUFFIX: &str = "$annotations";

/// Decode a class header with the default configuration
pub fn decode(header: &Header) -> Result<ClassDeclaration, DecodeError> {
    decode_with(header, &DecoderConfig::default())
}

/// Decode a class header
pub fn decode_with(header: &Header, config: &DecoderConfig) -> Result<ClassDeclaration, DecodeError> {
    check_header(header, config)?;

    let bytes = bit_encoding::decode_bytes(&header.data1)?;
    let strings = StringTable::new(&header.data2);
    let mut assembler = Assembler::new(strings);
    for token in TokenReader::new(&bytes) {
        assembler.accept(token?)?;
    }
    let class = assembler.finish()?;

    tracing::debug!(
        class = class.name(),
        version = %header.version,
        constructors = class.constructors().len(),
        functions = class.functions().len(),
        properties = class.properties().len(),
        "decoded class metadata"
    );
    Ok(class)
}

fn check_header(header: &Header, config: &DecoderConfig) -> Result<(), DecodeError> {
    if header.version < config.min_version {
        return Err(DecodeError::UnsupportedVersion {
            version: header.version,
            minimum: config.min_version,
        });
    }
    if let Some(maximum) = config.max_version {
        if header.version > maximum {
            return Err(DecodeError::IncompatibleVersion {
                version: header.version,
                maximum,
            });
        }
    }
    if header.kind != MetadataKind::Class {
        return Err(DecodeError::UnsupportedKind(header.kind.to_raw()));
    }
    if !config.allow_pre_release && header.extra_flags().contains(ExtraFlags::PRE_RELEASE) {
        return Err(DecodeError::PreRelease);
    }
    Ok(())
}

/// Name lookup into `d2`
#[derive(Clone, Copy)]
struct StringTable<'a> {
    strings: &'a [String],
}

impl<'a> StringTable<'a> {
    fn new(strings: &'a [String]) -> Self {
        Self { strings }
    }

    fn get(&self, index: u64) -> Result<&'a str, DecodeError> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.strings.get(i))
            .map(String::as_str)
            .ok_or(DecodeError::InvalidStringIndex {
                index,
                len: self.strings.len(),
            })
    }
}

/// Name/descriptor pair from the host-binding extension
#[derive(Debug, Default)]
struct RawSignature {
    name: Option<String>,
    desc: Option<String>,
}

impl RawSignature {
    fn read(payload: &[u8], strings: StringTable<'_>) -> Result<Self, DecodeError> {
        let mut signature = RawSignature::default();
        let mut reader = WireReader::new(payload);
        while reader.has_more() {
            match reader.read_key()? {
                (fields::method_signature::NAME, WireType::Varint) => {
                    signature.name = Some(strings.get(reader.read_varint()?)?.to_string());
                }
                (fields::method_signature::DESC, WireType::Varint) => {
                    signature.desc = Some(strings.get(reader.read_varint()?)?.to_string());
                }
                (_, wire_type) => reader.skip(wire_type)?,
            }
        }
        Ok(signature)
    }

    /// `name` + descriptor; absent without a descriptor
    fn method(self, default_name: impl FnOnce() -> String) -> Option<String> {
        let desc = self.desc?;
        let name = self.name.unwrap_or_else(default_name);
        Some(format!("{name}{desc}"))
    }

    /// `name:descriptor`; absent without a descriptor
    fn field(self, default_name: impl FnOnce() -> String) -> Option<String> {
        let desc = self.desc?;
        let name = self.name.unwrap_or_else(default_name);
        Some(format!("{name}:{desc}"))
    }
}

/// Host-binding data of a property
#[derive(Debug, Default)]
struct PropertyBinding {
    field: Option<RawSignature>,
    annotation_carrier: Option<RawSignature>,
    getter: Option<RawSignature>,
    setter: Option<RawSignature>,
}

impl PropertyBinding {
    fn read(payload: &[u8], strings: StringTable<'_>) -> Result<Self, DecodeError> {
        use fields::property_signature::*;

        let mut binding = PropertyBinding::default();
        let mut reader = WireReader::new(payload);
        while reader.has_more() {
            let (field, wire_type) = reader.read_key()?;
            if wire_type != WireType::LengthDelimited {
                reader.skip(wire_type)?;
                continue;
            }
            let slot = match field {
                FIELD => &mut binding.field,
                SYNTHETIC_METHOD => &mut binding.annotation_carrier,
                GETTER => &mut binding.getter,
                SETTER => &mut binding.setter,
                _ => {
                    reader.skip(wire_type)?;
                    continue;
                }
            };
            *slot = Some(RawSignature::read(reader.read_bytes()?, strings)?);
        }
        Ok(binding)
    }
}

#[derive(Debug)]
struct PendingParameter {
    flags: Flags,
    name: Option<String>,
}

#[derive(Debug)]
struct PendingFunction {
    flags: Flags,
    name: Option<String>,
    parameters: Vec<ValueParameterDeclaration>,
    signature: Option<RawSignature>,
}

impl PendingFunction {
    fn new(name: Option<String>) -> Self {
        Self {
            flags: Flags::DEFAULT,
            name,
            parameters: Vec::new(),
            signature: None,
        }
    }

    fn seal(self, kind: NodeKind) -> Result<crate::model::FunctionDeclaration, DecodeError> {
        let name = self.name.ok_or(DecodeError::MissingName(kind))?;
        let signature = self.signature.and_then(|s| s.method(|| name.clone()));
        let mut builder = FunctionBuilder::new(self.flags, name);
        if let Some(signature) = signature {
            builder = builder.signature(signature);
        }
        Ok(self
            .parameters
            .into_iter()
            .fold(builder, FunctionBuilder::parameter)
            .build())
    }
}

#[derive(Debug)]
struct PendingProperty {
    flags: Flags,
    name: Option<String>,
    getter_flags: Option<Flags>,
    setter_flags: Option<Flags>,
    binding: Option<PropertyBinding>,
}

impl PendingProperty {
    fn new() -> Self {
        Self {
            flags: Flags::DEFAULT_PROPERTY,
            name: None,
            getter_flags: None,
            setter_flags: None,
            binding: None,
        }
    }

    fn seal(self) -> Result<crate::model::PropertyDeclaration, DecodeError> {
        let name = self.name.ok_or(DecodeError::MissingName(NodeKind::Property))?;
        let binding = self.binding.unwrap_or_default();

        let field = binding.field.and_then(|s| s.field(|| name.clone()));
        let getter = binding.getter.and_then(|s| s.method(|| getter_name(&name)));
        let setter = binding.setter.and_then(|s| s.method(|| setter_name(&name)));
        let carrier = binding
            .annotation_carrier
            .and_then(|s| s.method(|| format!("{name}{ANNOTATION_CARRIER_SUFFIX}")));

        let mut builder = PropertyBuilder::new(self.flags, name)
            .field_signature(field)
            .getter_signature(getter)
            .setter_signature(setter)
            .annotation_carrier_signature(carrier);
        if let Some(flags) = self.getter_flags {
            builder = builder.getter_flags(flags);
        }
        if let Some(flags) = self.setter_flags {
            builder = builder.setter_flags(flags);
        }
        Ok(builder.build())
    }
}

#[derive(Debug)]
enum PendingMember {
    Constructor(PendingFunction),
    Function(PendingFunction),
    Property(PendingProperty),
}

/// Folds tokens into declarations
struct Assembler<'a> {
    strings: StringTable<'a>,
    class: ClassBuilder,
    class_named: bool,
    member: Option<PendingMember>,
    parameter: Option<PendingParameter>,
    finished: bool,
}

impl<'a> Assembler<'a> {
    fn new(strings: StringTable<'a>) -> Self {
        Self {
            strings,
            class: ClassBuilder::new(Flags::DEFAULT, String::new()),
            class_named: false,
            member: None,
            parameter: None,
            finished: false,
        }
    }

    fn accept(&mut self, token: Token<'_>) -> Result<(), DecodeError> {
        match token {
            Token::Enter(kind) => self.enter(kind),
            Token::Exit(kind) => self.exit(kind)?,
            Token::Flags(bits) => self.set_flags(Flags::new(bits)),
            Token::Name(index) => {
                let name = self.strings.get(index)?.to_string();
                self.set_name(name);
            }
            Token::CompanionObject(index) => {
                let name = self.strings.get(index)?;
                self.class.companion_object_name(name);
            }
            Token::GetterFlags(bits) => {
                if let Some(PendingMember::Property(property)) = &mut self.member {
                    property.getter_flags = Some(Flags::new(bits));
                }
            }
            Token::SetterFlags(bits) => {
                if let Some(PendingMember::Property(property)) = &mut self.member {
                    property.setter_flags = Some(Flags::new(bits));
                }
            }
            Token::Extension { tag, payload } => self.extension(tag, payload)?,
        }
        Ok(())
    }

    fn enter(&mut self, kind: NodeKind) {
        match kind {
            NodeKind::Class => {}
            NodeKind::Constructor => {
                self.member = Some(PendingMember::Constructor(PendingFunction::new(Some(
                    CONSTRUCTOR_NAME.to_string(),
                ))));
            }
            NodeKind::Function => {
                self.member = Some(PendingMember::Function(PendingFunction::new(None)));
            }
            NodeKind::Property => {
                self.member = Some(PendingMember::Property(PendingProperty::new()));
            }
            NodeKind::ValueParameter => {
                self.parameter = Some(PendingParameter {
                    flags: Flags::new(0),
                    name: None,
                });
            }
        }
    }

    fn exit(&mut self, kind: NodeKind) -> Result<(), DecodeError> {
        match kind {
            NodeKind::Class => {
                self.finished = true;
            }
            NodeKind::ValueParameter => {
                if let Some(parameter) = self.parameter.take() {
                    let name = parameter.name.ok_or(DecodeError::MissingName(kind))?;
                    let parameter = ValueParameterDeclaration::new(parameter.flags, name);
                    match &mut self.member {
                        Some(PendingMember::Constructor(f)) | Some(PendingMember::Function(f)) => {
                            f.parameters.push(parameter);
                        }
                        _ => {}
                    }
                }
            }
            NodeKind::Constructor | NodeKind::Function | NodeKind::Property => {
                match self.member.take() {
                    Some(PendingMember::Constructor(f)) => {
                        self.class.add_constructor(f.seal(NodeKind::Constructor)?);
                    }
                    Some(PendingMember::Function(f)) => {
                        self.class.add_function(f.seal(NodeKind::Function)?);
                    }
                    Some(PendingMember::Property(p)) => {
                        self.class.add_property(p.seal()?);
                    }
                    None => {}
                }
            }
        }
        Ok(())
    }

    fn set_flags(&mut self, flags: Flags) {
        if let Some(parameter) = &mut self.parameter {
            parameter.flags = flags;
            return;
        }
        match &mut self.member {
            Some(PendingMember::Constructor(f)) | Some(PendingMember::Function(f)) => f.flags = flags,
            Some(PendingMember::Property(p)) => p.flags = flags,
            None => {
                self.class.flags(flags);
            }
        }
    }

    fn set_name(&mut self, name: String) {
        if let Some(parameter) = &mut self.parameter {
            parameter.name = Some(name);
            return;
        }
        match &mut self.member {
            Some(PendingMember::Constructor(_)) => {}
            Some(PendingMember::Function(f)) => f.name = Some(name),
            Some(PendingMember::Property(p)) => p.name = Some(name),
            None => {
                self.class.name(name);
                self.class_named = true;
            }
        }
    }

    fn extension(&mut self, tag: u32, payload: &[u8]) -> Result<(), DecodeError> {
        if tag != HOST_BINDING_EXTENSION {
            tracing::trace!(tag, len = payload.len(), "skipping unknown extension");
            return Ok(());
        }
        match &mut self.member {
            Some(PendingMember::Constructor(f)) | Some(PendingMember::Function(f)) => {
                f.signature = Some(RawSignature::read(payload, self.strings)?);
            }
            Some(PendingMember::Property(p)) => {
                p.binding = Some(PropertyBinding::read(payload, self.strings)?);
            }
            None => {}
        }
        Ok(())
    }

    fn finish(self) -> Result<ClassDeclaration, DecodeError> {
        if !self.finished || !self.class_named {
            return Err(DecodeError::MissingName(NodeKind::Class));
        }
        Ok(self.class.build())
    }
}

/// Default getter name of a property
fn getter_name(property: &str) -> String {
    if is_boolean_prefixed(property) {
        property.to_string()
    } else {
        format!("get{}", capitalize(property))
    }
}

/// Default setter name of a property
fn setter_name(property: &str) -> String {
    match property.strip_prefix("is") {
        Some(rest) if is_boolean_prefixed(property) => format!("set{rest}"),
        _ => format!("set{}", capitalize(property)),
    }
}

/// `isFoo` style names keep their prefix in accessor names
fn is_boolean_prefixed(name: &str) -> bool {
    name.strip_prefix("is")
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| !c.is_lowercase())
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::Flag;
    use crate::header::MetadataVersion;
    use crate::wire::WireWriter;

    fn header(bytes: &[u8], strings: &[&str]) -> Header {
        Header {
            kind: MetadataKind::Class,
            version: MetadataVersion::new(1, 9, 0),
            data1: bit_encoding::encode_utf8(bytes),
            data2: strings.iter().map(|s| s.to_string()).collect(),
            extra_string: String::new(),
            package_name: None,
            extra_int: None,
        }
    }

    fn method_signature(name: Option<u64>, desc: Option<u64>) -> Vec<u8> {
        let mut writer = WireWriter::new();
        if let Some(name) = name {
            writer.emit_uint(fields::method_signature::NAME, name);
        }
        if let Some(desc) = desc {
            writer.emit_uint(fields::method_signature::DESC, desc);
        }
        writer.into_bytes()
    }

    #[test]
    fn test_minimal_class() {
        let mut writer = WireWriter::new();
        writer.emit_uint(fields::class::NAME, 0);

        let class = decode(&header(writer.buffer(), &["com/example/Empty"])).unwrap();
        assert_eq!(class.name(), "com/example/Empty");
        assert_eq!(class.flags(), Flags::DEFAULT);
        assert!(class.constructors().is_empty());
        assert_eq!(class.companion_object_name(), None);
    }

    #[test]
    fn test_missing_class_name() {
        let mut writer = WireWriter::new();
        writer.emit_uint(fields::FLAGS, 6);

        let err = decode(&header(writer.buffer(), &[])).unwrap_err();
        assert_eq!(err, DecodeError::MissingName(NodeKind::Class));
    }

    #[test]
    fn test_invalid_string_index() {
        let mut writer = WireWriter::new();
        writer.emit_uint(fields::class::NAME, 7);

        let err = decode(&header(writer.buffer(), &["Foo"])).unwrap_err();
        assert_eq!(err, DecodeError::InvalidStringIndex { index: 7, len: 1 });
    }

    #[test]
    fn test_parameter_order_preserved() {
        let mut writer = WireWriter::new();
        writer.emit_uint(fields::class::NAME, 0);
        writer.emit_message(fields::class::CONSTRUCTOR, |c| {
            for (flags, name) in [(0, 1), (2, 2), (0, 3)] {
                c.emit_message(fields::constructor::VALUE_PARAMETER, |p| {
                    p.emit_uint(fields::FLAGS, flags);
                    p.emit_uint(fields::value_parameter::NAME, name);
                });
            }
            c.emit_bytes(HOST_BINDING_EXTENSION, &method_signature(None, Some(4)));
        });

        let class = decode(&header(writer.buffer(), &["Foo", "a", "b", "c", "(IJZ)V"])).unwrap();
        let constructor = &class.constructors()[0];
        let names: Vec<_> = constructor.parameters().iter().map(|p| p.name()).collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert!(constructor.parameters()[1].has(Flag::DeclaresDefaultValue));
        assert!(!constructor.parameters()[0].has(Flag::DeclaresDefaultValue));
        assert_eq!(constructor.signature(), Some("<init>(IJZ)V"));
        assert!(class.function_by_signature("<init>(IJZ)V").is_some());
    }

    #[test]
    fn test_function_without_extension_is_tolerated() {
        let mut writer = WireWriter::new();
        writer.emit_uint(fields::class::NAME, 0);
        writer.emit_message(fields::class::FUNCTION, |f| {
            f.emit_uint(fields::function::NAME, 1);
        });

        let class = decode(&header(writer.buffer(), &["Foo", "run"])).unwrap();
        assert_eq!(class.functions().len(), 1);
        assert_eq!(class.functions()[0].signature(), None);
        assert_eq!(class.functions_by_signature().count(), 0);
    }

    #[test]
    fn test_unknown_extension_is_skipped() {
        let mut writer = WireWriter::new();
        writer.emit_uint(fields::class::NAME, 0);
        writer.emit_message(fields::class::FUNCTION, |f| {
            f.emit_uint(fields::function::NAME, 1);
            f.emit_bytes(170, b"\xff\xff garbage for another platform");
            f.emit_bytes(HOST_BINDING_EXTENSION, &method_signature(Some(1), Some(2)));
        });

        let class = decode(&header(writer.buffer(), &["Foo", "run", "()V"])).unwrap();
        assert_eq!(class.functions()[0].signature(), Some("run()V"));
    }

    #[test]
    fn test_property_binding_defaults() {
        let mut writer = WireWriter::new();
        writer.emit_uint(fields::class::NAME, 0);
        writer.emit_message(fields::class::PROPERTY, |p| {
            p.emit_uint(fields::property::NAME, 1);
            p.emit_uint(fields::property::GETTER_FLAGS, 6);
            p.emit_message(HOST_BINDING_EXTENSION, |ext| {
                use fields::property_signature::*;
                ext.emit_message(FIELD, |s| s.emit_uint(fields::field_signature::DESC, 2));
                ext.emit_message(GETTER, |s| s.emit_uint(fields::method_signature::DESC, 3));
                ext.emit_message(SYNTHETIC_METHOD, |s| {
                    s.emit_uint(fields::method_signature::DESC, 4)
                });
            });
        });

        let strings = ["Foo", "count", "I", "()I", "()V"];
        let class = decode(&header(writer.buffer(), &strings)).unwrap();
        let property = &class.properties()[0];
        assert_eq!(property.field_signature(), Some("count:I"));
        assert_eq!(property.getter_signature(), Some("getCount()I"));
        assert_eq!(property.setter_signature(), None);
        assert_eq!(
            property.annotation_carrier_signature(),
            Some("count$annotations()V")
        );
        assert_eq!(property.getter_flags(), Some(Flags::DEFAULT));
        assert!(class.property_by_field_signature("count:I").is_some());
    }

    #[test]
    fn test_signature_without_descriptor_is_absent() {
        let mut writer = WireWriter::new();
        writer.emit_uint(fields::class::NAME, 0);
        writer.emit_message(fields::class::PROPERTY, |p| {
            p.emit_uint(fields::property::NAME, 1);
            p.emit_message(HOST_BINDING_EXTENSION, |ext| {
                ext.emit_message(fields::property_signature::FIELD, |s| {
                    s.emit_uint(fields::field_signature::NAME, 1)
                });
            });
        });

        let class = decode(&header(writer.buffer(), &["Foo", "total"])).unwrap();
        assert_eq!(class.properties()[0].field_signature(), None);
        assert_eq!(class.properties_by_field_signature().count(), 0);
    }

    #[test]
    fn test_unsupported_version() {
        let mut writer = WireWriter::new();
        writer.emit_uint(fields::class::NAME, 0);
        let mut header = header(writer.buffer(), &["Foo"]);
        header.version = MetadataVersion::new(1, 0, 3);

        let err = decode(&header).unwrap_err();
        assert!(matches!(err, DecodeError::UnsupportedVersion { .. }));
        assert!(err.to_string().contains("1.0.3"));
    }

    #[test]
    fn test_configured_version_range() {
        let mut writer = WireWriter::new();
        writer.emit_uint(fields::class::NAME, 0);
        let header = header(writer.buffer(), &["Foo"]);

        let config = DecoderConfig {
            max_version: Some(MetadataVersion::new(1, 8, 0)),
            ..DecoderConfig::default()
        };
        assert!(matches!(
            decode_with(&header, &config),
            Err(DecodeError::IncompatibleVersion { .. })
        ));

        let config = DecoderConfig {
            min_version: MetadataVersion::new(2, 0, 0),
            ..DecoderConfig::default()
        };
        assert!(matches!(
            decode_with(&header, &config),
            Err(DecodeError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn test_non_class_kind_rejected() {
        let mut header = header(&[], &[]);
        header.kind = MetadataKind::FileFacade;
        assert_eq!(decode(&header), Err(DecodeError::UnsupportedKind(2)));
    }

    #[test]
    fn test_pre_release_policy() {
        let mut writer = WireWriter::new();
        writer.emit_uint(fields::class::NAME, 0);
        let mut header = header(writer.buffer(), &["Foo"]);
        header.extra_int = Some(ExtraFlags::PRE_RELEASE.bits() as i32);

        assert!(decode(&header).is_ok());
        let config = DecoderConfig {
            allow_pre_release: false,
            ..DecoderConfig::default()
        };
        assert_eq!(decode_with(&header, &config), Err(DecodeError::PreRelease));
    }

    #[test]
    fn test_truncated_data() {
        let mut writer = WireWriter::new();
        writer.emit_uint(fields::class::NAME, 0);
        writer.emit_message(fields::class::FUNCTION, |f| {
            f.emit_uint(fields::function::NAME, 0);
        });
        let bytes = writer.into_bytes();
        let truncated = &bytes[..bytes.len() - 1];

        assert!(matches!(
            decode(&header(truncated, &["Foo"])),
            Err(DecodeError::Wire(_))
        ));
    }

    #[test]
    fn test_accessor_names() {
        assert_eq!(getter_name("count"), "getCount");
        assert_eq!(getter_name("isEnabled"), "isEnabled");
        assert_eq!(getter_name("island"), "getIsland");
        assert_eq!(setter_name("isEnabled"), "setEnabled");
        assert_eq!(setter_name("count"), "setCount");
    }
}
