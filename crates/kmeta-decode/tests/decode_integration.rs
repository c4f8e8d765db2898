//! Integration tests for metadata decoding

use kmeta_decode::{
    decode, decode_with, encode_class, AnnotationValue, BitEncodingMode, ClassBuilder,
    ClassDeclaration, DecodeError, DecoderConfig, EncodeOptions, Flag, Flags, FunctionBuilder,
    Header, MetadataKind, MetadataVersion, PropertyBuilder, ValueParameterDeclaration,
};
use std::collections::{BTreeMap, HashMap};

fn repository_class() -> ClassDeclaration {
    let mut class = ClassBuilder::new(Flags::DEFAULT, "com/example/UserRepository");
    class.add_constructor(
        FunctionBuilder::constructor(Flags::DEFAULT)
            .parameter(ValueParameterDeclaration::new(Flags::new(0), "api"))
            .parameter(ValueParameterDeclaration::new(
                Flags::of(&[Flag::DeclaresDefaultValue]),
                "cacheSize",
            ))
            .signature("<init>(Lcom/example/Api;I)V")
            .build(),
    );
    class.add_constructor(
        FunctionBuilder::constructor(Flags::DEFAULT.with(Flag::IsSecondary))
            .signature("<init>()V")
            .build(),
    );
    class.add_function(
        FunctionBuilder::new(Flags::DEFAULT, "find")
            .parameter(ValueParameterDeclaration::new(Flags::new(0), "id"))
            .signature("find(J)Lcom/example/User;")
            .build(),
    );
    class.add_property(
        PropertyBuilder::new(Flags::DEFAULT_PROPERTY, "api")
            .field_signature(Some("api:Lcom/example/Api;".into()))
            .getter_signature(Some("getApi()Lcom/example/Api;".into()))
            .build(),
    );
    class.add_property(
        PropertyBuilder::new(Flags::DEFAULT_PROPERTY.with(Flag::IsDelegated), "cache")
            .field_signature(Some("cache$delegate:Lkotlin/Lazy;".into()))
            .getter_signature(Some("getCache()Ljava/util/Map;".into()))
            .annotation_carrier_signature(Some("cache$annotations()V".into()))
            .build(),
    );
    class.build()
}

#[test]
fn test_decode_from_annotation_values() {
    let class = repository_class();
    let header = encode_class(&class, &EncodeOptions::default());

    let values: HashMap<String, AnnotationValue> = header.to_values().into_iter().collect();
    let read = Header::read(&values).expect("header should be readable");
    assert_eq!(read, header);

    let decoded = decode(&read).expect("Failed to decode");
    assert_eq!(decoded, class);
    assert_eq!(decoded.constructors().len(), 2);
    assert!(decoded.constructors()[1].has(Flag::IsSecondary));
    assert_eq!(
        decoded
            .property_by_field_signature("cache$delegate:Lkotlin/Lazy;")
            .map(|p| p.name()),
        Some("cache")
    );
}

#[test]
fn test_every_indexed_member_is_reachable() {
    let header = encode_class(
        &repository_class(),
        &EncodeOptions {
            mode: BitEncodingMode::SevenBit,
            ..EncodeOptions::default()
        },
    );
    let decoded = decode(&header).unwrap();

    for constructor in decoded.constructors() {
        let signature = constructor.signature().unwrap();
        assert_eq!(decoded.function_by_signature(signature), Some(constructor));
    }
    for function in decoded.functions() {
        let signature = function.signature().unwrap();
        assert_eq!(decoded.function_by_signature(signature), Some(function));
    }
    for (signature, property) in decoded.properties_by_field_signature() {
        assert_eq!(property.field_signature(), Some(signature));
    }
    assert_eq!(decoded.functions_by_signature().count(), 3);
}

#[test]
fn test_decoding_is_deterministic() {
    let header = encode_class(&repository_class(), &EncodeOptions::default());
    let first = decode(&header).unwrap();
    let second = decode(&header).unwrap();
    assert_eq!(first, second);

    let names = |class: &ClassDeclaration| -> Vec<String> {
        class.functions_by_signature().map(|(s, _)| s.to_string()).collect()
    };
    assert_eq!(names(&first), names(&second));
}

#[test]
fn test_old_version_is_rejected() {
    let options = EncodeOptions {
        version: MetadataVersion::new(1, 0, 0),
        ..EncodeOptions::default()
    };
    let header = encode_class(&repository_class(), &options);

    let err = decode(&header).unwrap_err();
    assert_eq!(
        err,
        DecodeError::UnsupportedVersion {
            version: MetadataVersion::new(1, 0, 0),
            minimum: MetadataVersion::MINIMUM_SUPPORTED,
        }
    );
}

#[test]
fn test_file_facade_is_rejected() {
    let mut header = encode_class(&repository_class(), &EncodeOptions::default());
    header.kind = MetadataKind::FileFacade;
    assert!(matches!(decode(&header), Err(DecodeError::UnsupportedKind(2))));
}

#[test]
fn test_missing_header_field() {
    let mut values = encode_class(&repository_class(), &EncodeOptions::default()).to_values();
    values.remove("d2");
    assert!(matches!(
        Header::read(&values),
        Err(DecodeError::MalformedHeader { field: "d2", .. })
    ));
}

#[test]
fn test_config_from_toml() {
    let config = DecoderConfig::from_toml_str(
        r#"
        max_version = "1.8.0"
        allow_pre_release = false
        "#,
    )
    .unwrap();
    let header = encode_class(&repository_class(), &EncodeOptions::default());

    assert!(matches!(
        decode_with(&header, &config),
        Err(DecodeError::IncompatibleVersion { .. })
    ));
}

#[test]
fn test_corrupted_data_reports_error() {
    let mut header = encode_class(&repository_class(), &EncodeOptions::default());
    let truncated: String = header.data1[0].chars().take(12).collect();
    header.data1 = vec![truncated];

    let values: BTreeMap<_, _> = header.to_values();
    let header = Header::read(&values).unwrap();
    assert!(decode(&header).is_err());
}
