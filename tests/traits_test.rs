use testwire::{escape, Serializer, TraitMap, Value};

fn codec() -> Serializer {
    Serializer::default()
}

#[test]
fn trait_map_wire_format() {
    let mut map = TraitMap::new();
    map.add("foo", "bar");
    map.add("foo", "");
    map.add("biff", "hello");

    let text = codec().serialize(Some(&Value::TraitMap(map)), None).unwrap();
    let expected = format!(
        "-2:{}",
        escape(&format!(
            "{}\n{}\n{}",
            escape(&format!("{}\n{}", escape("foo"), escape("biff"))),
            escape(&format!("{}\n{}", escape("bar"), escape(""))),
            escape(&escape("hello")),
        ))
    );
    assert_eq!(text, expected);
}

#[test]
fn trait_map_round_trips() {
    let mut map = TraitMap::new();
    map.add("Category", "fast");
    map.add("Category", "network");
    map.add("Owner", "infra");

    let codec = codec();
    let text = codec.serialize(Some(&Value::TraitMap(map.clone())), None).unwrap();
    match codec.deserialize(&text).unwrap() {
        Some(Value::TraitMap(back)) => assert_eq!(back, map),
        other => panic!("expected a trait map, got {other:?}"),
    }
}

#[test]
fn empty_trait_map_and_null_are_distinct() {
    let codec = codec();

    let empty = codec
        .serialize(Some(&Value::TraitMap(TraitMap::new())), None)
        .unwrap();
    assert_eq!(empty, "-2:");
    match codec.deserialize(&empty).unwrap() {
        Some(Value::TraitMap(back)) => assert!(back.is_empty()),
        other => panic!("expected a trait map, got {other:?}"),
    }

    assert!(codec.deserialize("-2").unwrap().is_none());
}

#[test]
fn keys_are_case_insensitive_but_preserve_first_casing() {
    let mut map = TraitMap::new();
    map.add("Category", "fast");
    map.add("category", "slow");

    assert_eq!(map.len(), 1);
    let values = map.get("CATEGORY").unwrap();
    assert!(values.contains("fast"));
    assert!(values.contains("slow"));
    assert_eq!(map.keys().collect::<Vec<_>>(), ["Category"]);
    assert!(map.contains_key("cAtEgOrY"));
    assert!(!map.contains_key("owner"));
}

#[test]
fn insertion_order_survives_round_trip() {
    let mut map = TraitMap::new();
    map.add("zeta", "1");
    map.add("alpha", "2");
    map.add("mid", "3");

    let codec = codec();
    let text = codec.serialize(Some(&Value::TraitMap(map)), None).unwrap();
    match codec.deserialize(&text).unwrap() {
        Some(Value::TraitMap(back)) => {
            assert_eq!(back.keys().collect::<Vec<_>>(), ["zeta", "alpha", "mid"]);
        }
        other => panic!("expected a trait map, got {other:?}"),
    }
}

#[test]
fn values_keep_order_and_uniqueness() {
    let mut map = TraitMap::new();
    map.add("k", "b");
    map.add("k", "a");
    map.add("k", "b");

    let codec = codec();
    let text = codec.serialize(Some(&Value::TraitMap(map)), None).unwrap();
    match codec.deserialize(&text).unwrap() {
        Some(Value::TraitMap(back)) => {
            let values: Vec<_> = back.get("k").unwrap().iter().collect();
            assert_eq!(values, ["b", "a"]);
        }
        other => panic!("expected a trait map, got {other:?}"),
    }
}

#[test]
fn embedded_delimiters_in_keys_and_values_survive() {
    let mut map = TraitMap::new();
    map.add("colon:key", "line\nbreak");
    map.add("colon:key", "plain");

    let codec = codec();
    let text = codec.serialize(Some(&Value::TraitMap(map.clone())), None).unwrap();
    match codec.deserialize(&text).unwrap() {
        Some(Value::TraitMap(back)) => assert_eq!(back, map),
        other => panic!("expected a trait map, got {other:?}"),
    }
}

#[test]
fn mismatched_payload_counts_decode_to_an_empty_map() {
    // Two keys but only one value list: missing data decodes as empty.
    let body = format!(
        "{}\n{}",
        escape(&format!("{}\n{}", escape("a"), escape("b"))),
        escape(&escape("only-one")),
    );
    let text = format!("-2:{}", escape(&body));
    match codec().deserialize(&text).unwrap() {
        Some(Value::TraitMap(back)) => assert!(back.is_empty()),
        other => panic!("expected a trait map, got {other:?}"),
    }
}
