use testwire::{
    escape, ArrayValue, ElementType, Serializer, TypeIndex, TypeName, TypeRegistry, Value,
};

fn codec() -> Serializer {
    Serializer::default()
}

fn int_elements(values: &[i32]) -> Vec<Option<Value>> {
    values.iter().map(|&v| Some(Value::I32(v))).collect()
}

#[test]
fn int_vector_wire_format() {
    let text = testwire::serialize(&vec![1i32, 2, 3]).unwrap();
    let expected_bag = "r:6:1\ntl:6:3\nl0:6:3\nlb0:6:0\ni0:6:1\ni1:6:2\ni2:6:3";
    assert_eq!(text, format!("6[]:{}", escape(expected_bag)));

    let back: Vec<i32> = testwire::deserialize(&text).unwrap();
    assert_eq!(back, vec![1, 2, 3]);
}

#[test]
fn nullable_int_vector_keeps_the_nullable_path() {
    let values = vec![Some(1i32), None, Some(3)];
    let text = testwire::serialize(&values).unwrap();
    let expected_bag = "r:6:1\ntl:6:3\nl0:6:3\nlb0:6:0\ni0:6:1\ni1:6?\ni2:6:3";
    assert_eq!(text, format!("6?[]:{}", escape(expected_bag)));

    let back: Vec<Option<i32>> = testwire::deserialize(&text).unwrap();
    assert_eq!(back, values);
}

#[test]
fn two_dimensional_array_with_lower_bounds_round_trips() {
    // Bounds [2, 3], lengths [3, 2]: indices run [2..5, 3..5].
    let array = ArrayValue::with_layout(
        ElementType::of(TypeIndex::I32),
        vec![3, 2],
        vec![2, 3],
        int_elements(&[10, 11, 20, 21, 30, 31]),
    )
    .unwrap();

    let codec = codec();
    let text = codec.serialize(Some(&Value::Array(array)), None).unwrap();
    assert!(text.starts_with("6[]:"));

    let back = match codec.deserialize(&text).unwrap() {
        Some(Value::Array(array)) => array,
        other => panic!("expected an array, got {other:?}"),
    };
    assert_eq!(back.rank(), 2);
    assert_eq!(back.lengths(), &[3, 2]);
    assert_eq!(back.lower_bounds(), &[2, 3]);
    assert_eq!(back.len(), 6);

    // Row-major order relative to the lower bounds.
    match back.get(&[2, 3]) {
        Some(Some(Value::I32(v))) => assert_eq!(*v, 10),
        other => panic!("unexpected element {other:?}"),
    }
    match back.get(&[2, 4]) {
        Some(Some(Value::I32(v))) => assert_eq!(*v, 11),
        other => panic!("unexpected element {other:?}"),
    }
    match back.get(&[4, 4]) {
        Some(Some(Value::I32(v))) => assert_eq!(*v, 31),
        other => panic!("unexpected element {other:?}"),
    }
    assert!(back.get(&[1, 3]).is_none());
    assert!(back.get(&[5, 3]).is_none());
    assert!(back.get(&[2]).is_none());
}

#[test]
fn zero_length_arrays_keep_their_layout() {
    let array = ArrayValue::with_layout(
        ElementType::of(TypeIndex::String),
        vec![0],
        vec![0],
        Vec::new(),
    )
    .unwrap();
    let codec = codec();
    let text = codec.serialize(Some(&Value::Array(array)), None).unwrap();

    let back = match codec.deserialize(&text).unwrap() {
        Some(Value::Array(array)) => array,
        other => panic!("expected an array, got {other:?}"),
    };
    assert_eq!(back.rank(), 1);
    assert_eq!(back.lengths(), &[0]);
    assert_eq!(back.lower_bounds(), &[0]);
    assert!(back.is_empty());
}

#[test]
fn untyped_arrays_hold_mixed_values() {
    let elements = vec![
        Some(Value::I32(1)),
        Some(Value::String("2".into())),
        Some(Value::Bool(true)),
        None,
    ];
    let array = ArrayValue::vector(ElementType::of(TypeIndex::Object), elements).unwrap();

    let codec = codec();
    let text = codec.serialize(Some(&Value::Array(array)), None).unwrap();
    assert!(text.starts_with("-1[]:"));

    let back = match codec.deserialize(&text).unwrap() {
        Some(Value::Array(array)) => array,
        other => panic!("expected an array, got {other:?}"),
    };
    let items: Vec<_> = back.iter().collect();
    assert!(matches!(items[0], Some(Value::I32(1))));
    assert!(matches!(items[1], Some(Value::String(s)) if s == "2"));
    assert!(matches!(items[2], Some(Value::Bool(true))));
    assert!(items[3].is_none());
}

#[test]
fn untyped_arrays_nest_other_arrays() {
    let inner: Vec<Option<Value>> = int_elements(&[1, 2]);
    let elements = vec![
        Some(Value::Array(
            ArrayValue::vector(ElementType::of(TypeIndex::I32), inner).unwrap(),
        )),
        None,
    ];
    let array = ArrayValue::vector(ElementType::of(TypeIndex::Object), elements).unwrap();

    let codec = codec();
    let text = codec.serialize(Some(&Value::Array(array)), None).unwrap();

    let back = match codec.deserialize(&text).unwrap() {
        Some(Value::Array(array)) => array,
        other => panic!("expected an array, got {other:?}"),
    };
    let items: Vec<_> = back.iter().collect();
    match items[0] {
        Some(Value::Array(nested)) => {
            assert_eq!(nested.rank(), 1);
            assert_eq!(nested.len(), 2);
        }
        other => panic!("expected a nested array, got {other:?}"),
    }
    assert!(items[1].is_none());
}

#[test]
fn vectors_of_vectors_declare_untyped_elements() {
    let text = testwire::serialize(&vec![vec![1i32, 2], vec![3]]).unwrap();
    assert!(text.starts_with("-1[]:"));

    let back: Vec<Vec<i32>> = testwire::deserialize(&text).unwrap();
    assert_eq!(back, vec![vec![1, 2], vec![3]]);
}

#[test]
fn string_vectors_distinguish_null_and_empty_elements() {
    let values = vec![Some(String::from("a")), None, Some(String::new())];
    let text = testwire::serialize(&values).unwrap();
    let back: Vec<Option<String>> = testwire::deserialize(&text).unwrap();
    assert_eq!(back, values);
}

#[test]
fn typed_arrays_reject_null_elements() {
    let err = ArrayValue::vector(
        ElementType::of(TypeIndex::I32),
        vec![Some(Value::I32(1)), None],
    )
    .unwrap_err();
    assert!(matches!(err, testwire::Error::Malformed(_)));
}

#[test]
fn typed_arrays_reject_mismatched_elements() {
    let err = ArrayValue::vector(
        ElementType::of(TypeIndex::I32),
        vec![Some(Value::String("nope".into()))],
    )
    .unwrap_err();
    assert!(matches!(err, testwire::Error::Malformed(_)));
}

#[test]
fn layout_validation_catches_bad_shapes() {
    // Length/bound dimension mismatch.
    assert!(ArrayValue::with_layout(
        ElementType::of(TypeIndex::I32),
        vec![2],
        vec![0, 0],
        int_elements(&[1, 2]),
    )
    .is_err());

    // Element count not matching the dimension product.
    assert!(ArrayValue::with_layout(
        ElementType::of(TypeIndex::I32),
        vec![2, 2],
        vec![0, 0],
        int_elements(&[1, 2, 3]),
    )
    .is_err());

    // Negative length.
    assert!(ArrayValue::with_layout(
        ElementType::of(TypeIndex::I32),
        vec![-1],
        vec![0],
        Vec::new(),
    )
    .is_err());
}

#[test]
fn decode_rejects_inconsistent_layouts() {
    let codec = codec();
    // A bag whose element count disagrees with its dimension lengths.
    let bag = "r:6:1\ntl:6:2\nl0:6:3\nlb0:6:0\ni0:6:1\ni1:6:2";
    let err = codec.deserialize(&format!("6[]:{}", escape(bag))).unwrap_err();
    assert!(matches!(err, testwire::Error::Malformed(_)));

    // Rank zero is not an array.
    let bag = "r:6:0\ntl:6:0";
    let err = codec.deserialize(&format!("6[]:{}", escape(bag))).unwrap_err();
    assert!(matches!(err, testwire::Error::Malformed(_)));
}

#[test]
fn jagged_declared_types_are_unsupported() {
    let codec = codec();
    let declared = TypeName::intrinsic("i32").array_of(1).array_of(1);
    let err = codec.serialize(None, Some(&declared)).unwrap_err();
    assert!(matches!(err, testwire::Error::UnsupportedType(_)));
}

#[test]
fn declared_array_type_must_match_the_value() {
    let codec = codec();
    let array = ArrayValue::vector(
        ElementType::of(TypeIndex::I32),
        int_elements(&[1]),
    )
    .unwrap();
    let declared = TypeName::intrinsic("u8").array_of(1);
    let err = codec
        .serialize(Some(&Value::Array(array)), Some(&declared))
        .unwrap_err();
    assert!(matches!(err, testwire::Error::IncompatibleValue { .. }));
}

#[test]
fn is_serializable_checks_array_contents() {
    let registry = TypeRegistry::builder().build();
    let codec = Serializer::with_registry(registry);

    let good = ArrayValue::vector(
        ElementType::of(TypeIndex::Object),
        vec![Some(Value::I32(1)), None],
    )
    .unwrap();
    assert!(codec.is_serializable(Some(&Value::Array(good))));

    // An enum from a non-local origin poisons the whole array.
    let bad = ArrayValue::vector(
        ElementType::of(TypeIndex::Object),
        vec![Some(Value::Enum(testwire::EnumValue::signed(
            TypeName::new("Remote", "shared-cache"),
            1,
        )))],
    )
    .unwrap();
    assert!(!codec.is_serializable(Some(&Value::Array(bad))));
}
