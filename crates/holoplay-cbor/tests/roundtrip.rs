use bytes::Bytes;
use holoplay_cbor::{decode, encode, Decoder, KeepTags, Value, MAX_EXACT_INTEGER};
use proptest::prelude::*;

fn leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Undefined),
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (-MAX_EXACT_INTEGER..=MAX_EXACT_INTEGER).prop_map(Value::Integer),
        any::<f64>().prop_map(Value::Float),
        any::<String>().prop_map(Value::Text),
        proptest::collection::vec(any::<u8>(), 0..64).prop_map(|b| Value::Bytes(Bytes::from(b))),
    ]
}

fn value() -> impl Strategy<Value = Value> {
    leaf().prop_recursive(4, 64, 8, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..8).prop_map(Value::Array),
            // Distinct text keys so decode's last-write-wins cannot merge entries.
            proptest::collection::btree_map("[a-z]{1,6}", inner.clone(), 0..8).prop_map(|m| {
                Value::Map(m.into_iter().map(|(k, v)| (Value::Text(k), v)).collect())
            }),
            (0u64..1 << 20, inner).prop_map(|(tag, v)| Value::Tag(tag, Box::new(v))),
        ]
    })
}

proptest! {
    #[test]
    fn encode_then_decode_is_identity(v in value()) {
        let bytes = encode(&v);
        let decoded = Decoder::new().with_tag_transform(KeepTags).decode(&bytes).unwrap();
        prop_assert_eq!(decoded, v);
    }

    #[test]
    fn decoding_arbitrary_bytes_never_panics(data in proptest::collection::vec(any::<u8>(), 0..128)) {
        let _ = decode(&data);
    }
}

#[test]
fn driver_reply_shape_round_trips() {
    let reply = Value::map([
        ("error", Value::from(0)),
        ("data", Value::from("ok")),
        (
            "devices",
            Value::array([Value::map([
                ("state", Value::from("ok")),
                ("calibration", Value::map([("pitch", Value::from(49.8))])),
            ])]),
        ),
    ]);
    assert_eq!(decode(&encode(&reply)).unwrap(), reply);
}

#[test]
fn astral_text_survives() {
    let text = Value::from("looking \u{1F440} glass \u{10FFFF}");
    assert_eq!(decode(&encode(&text)).unwrap(), text);
}

#[test]
fn large_blob_forces_buffer_growth() {
    let blob = Value::Bytes(Bytes::from(vec![0xa5; 10_000]));
    let bytes = encode(&blob);
    assert_eq!(bytes.len(), 3 + 10_000);
    assert_eq!(decode(&bytes).unwrap(), blob);
}
