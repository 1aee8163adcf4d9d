use testwire::{Serializer, TypeName, TypeRegistry, Value};

fn name_table() -> Vec<(TypeName, &'static str)> {
    vec![
        // Intrinsic types carry no origin suffix.
        (TypeName::intrinsic("Object"), "Object"),
        (TypeName::intrinsic("String"), "String"),
        // Types outside the intrinsic namespace include their origin.
        (TypeName::new("FactCheck", "quickfire"), "FactCheck,quickfire"),
        // Array types.
        (
            TypeName::new("FactCheck", "quickfire").array_of(1),
            "FactCheck[],quickfire",
        ),
        // Arrays of arrays with multiple dimension blocks; the last block
        // is the outermost one.
        (
            TypeName::new("FactCheck", "quickfire")
                .array_of(2)
                .array_of(1),
            "FactCheck[,][],quickfire",
        ),
        // Nullable wrapper.
        (
            TypeName::optional(TypeName::intrinsic("i32")),
            "Option[[i32]]",
        ),
        // Single-argument generic, both parts intrinsic.
        (
            TypeName::generic("Sequence", None, vec![TypeName::intrinsic("Object")]),
            "Sequence[[Object]]",
        ),
        // Single-argument generic with an origin-qualified argument.
        (
            TypeName::generic(
                "Sequence",
                Some("quickfire"),
                vec![TypeName::new("FactCheck", "quickfire")],
            ),
            "Sequence[[FactCheck,quickfire]],quickfire",
        ),
        // Multiply-nested generics.
        (
            TypeName::generic(
                "Handler",
                None,
                vec![
                    TypeName::generic(
                        "Pair",
                        None,
                        vec![
                            TypeName::intrinsic("Object"),
                            TypeName::new("FactCheck", "quickfire"),
                        ],
                    ),
                    TypeName::intrinsic("String"),
                ],
            ),
            "Handler[[Pair[[Object],[FactCheck,quickfire]]],[String]]",
        ),
        // Generics and arrays, living together.
        (
            TypeName::generic(
                "Handler",
                None,
                vec![TypeName::new("FactCheck", "quickfire")
                    .array_of(1)
                    .array_of(2)],
            )
            .array_of(2)
            .array_of(1),
            "Handler[[FactCheck[][,],quickfire]][,][]",
        ),
    ]
}

#[test]
fn render_produces_the_expected_name() {
    for (name, expected) in name_table() {
        assert_eq!(name.render(), expected);
    }
}

#[test]
fn parse_is_the_exact_inverse_of_render() {
    for (name, rendered) in name_table() {
        let parsed = TypeName::parse(rendered);
        assert_eq!(parsed, Some(name), "parsing '{rendered}'");
    }
}

#[test]
fn dictionary_of_lists_round_trips() {
    let name = TypeName::generic(
        "Dictionary",
        None,
        vec![
            TypeName::intrinsic("String"),
            TypeName::generic("Sequence", None, vec![TypeName::intrinsic("i32")]),
        ],
    );
    let rendered = name.render();
    assert_eq!(rendered, "Dictionary[[String],[Sequence[[i32]]]]");
    assert_eq!(TypeName::parse(&rendered), Some(name));
}

#[test]
fn whitespace_after_origin_commas_is_trimmed() {
    let parsed = TypeName::parse("FactCheck, quickfire").unwrap();
    assert_eq!(parsed, TypeName::new("FactCheck", "quickfire"));
}

#[test]
fn malformed_names_parse_to_none() {
    for text in [
        "",
        ",origin",
        "Name,",
        "Name,one,two",
        "[Leading",
        "Unbalanced[[i32]",
        "Unbalanced]",
        "Trailing[]junk",
        "Rank[x]",
        "Empty[[]]extra[",
        "Name,[bracketed]",
    ] {
        assert_eq!(TypeName::parse(text), None, "'{text}' should not parse");
    }
}

#[test]
fn rank_groups_distinguish_generics_from_arrays() {
    // Commas only: array-rank syntax.
    let array = TypeName::parse("Thing[,,]").unwrap();
    assert_eq!(array.ranks(), &[3]);
    assert!(array.args().is_empty());

    // Any other character at depth: a generic-argument list.
    let generic = TypeName::parse("Thing[[i32]]").unwrap();
    assert_eq!(generic.args().len(), 1);
    assert_eq!(generic.args()[0], TypeName::intrinsic("i32"));
    assert!(generic.ranks().is_empty());
}

#[test]
fn optional_wrapper_is_detected() {
    let name = TypeName::optional(TypeName::intrinsic("i32"));
    assert!(name.is_optional());
    let (core, nullable) = name.unwrap_optional();
    assert!(nullable);
    assert_eq!(core, &TypeName::intrinsic("i32"));

    let plain = TypeName::intrinsic("i32");
    assert!(!plain.is_optional());
}

#[test]
fn type_values_resolve_through_the_registry() {
    let registry = TypeRegistry::builder()
        .generic("Sequence", Some("collections"))
        .opaque(TypeName::new("FactCheck", "quickfire"))
        .local_origin("collections")
        .local_origin("quickfire")
        .build();
    let codec = Serializer::with_registry(registry);

    // A closed generic resolves when its definition and arguments do.
    let name = TypeName::generic(
        "Sequence",
        Some("collections"),
        vec![TypeName::new("FactCheck", "quickfire")],
    );
    let text = codec.serialize(Some(&Value::Type(name.clone())), None).unwrap();
    match codec.deserialize(&text).unwrap() {
        Some(Value::Type(back)) => assert_eq!(back, name),
        other => panic!("expected a type value, got {other:?}"),
    }

    // An unknown generic definition is a recoverable null.
    let unknown = TypeName::generic(
        "Sequence",
        Some("collections"),
        vec![TypeName::new("Missing", "quickfire")],
    );
    let text = codec.serialize(Some(&Value::Type(unknown)), None).unwrap();
    assert!(codec.deserialize(&text).unwrap().is_none());
}

#[test]
fn arrays_of_registered_types_resolve() {
    let registry = TypeRegistry::builder()
        .opaque(TypeName::new("FactCheck", "quickfire"))
        .local_origin("quickfire")
        .build();
    let codec = Serializer::with_registry(registry);

    let name = TypeName::new("FactCheck", "quickfire").array_of(2);
    let text = codec.serialize(Some(&Value::Type(name.clone())), None).unwrap();
    assert_eq!(text, "-5:FactCheck[,],quickfire");
    match codec.deserialize(&text).unwrap() {
        Some(Value::Type(back)) => assert_eq!(back, name),
        other => panic!("expected a type value, got {other:?}"),
    }
}

#[test]
fn non_local_type_identities_are_rejected() {
    let codec = Serializer::default();
    let err = codec
        .serialize(
            Some(&Value::Type(TypeName::new("Elsewhere", "shared-cache"))),
            None,
        )
        .unwrap_err();
    match err {
        testwire::Error::NonPortableType { type_name, origin } => {
            assert_eq!(type_name, "Elsewhere,shared-cache");
            assert_eq!(origin, "shared-cache");
        }
        other => panic!("expected a non-portable-type error, got {other}"),
    }
}

#[test]
fn non_local_generic_arguments_are_rejected() {
    let registry = TypeRegistry::builder()
        .generic("Sequence", None)
        .local_origin("quickfire")
        .build();
    let codec = Serializer::with_registry(registry);

    let name = TypeName::generic(
        "Sequence",
        None,
        vec![TypeName::new("Elsewhere", "shared-cache")],
    );
    let err = codec
        .serialize(Some(&Value::Type(name)), None)
        .unwrap_err();
    assert!(matches!(err, testwire::Error::NonPortableType { .. }));
}
