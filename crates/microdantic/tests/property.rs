pub mod fixtures;

use fixtures::*;
use microdantic::{FrameBuffer, Target, Value};
use proptest::prelude::*;

fn fruit_name() -> impl Strategy<Value = String> {
    // Any unicode, up to the ten characters the fixture allows.
    proptest::collection::vec(any::<char>(), 0..=10).prop_map(|chars| chars.into_iter().collect())
}

proptest! {
    #[test]
    fn test_valid_values_are_stored_as_given(name in fruit_name(), quantity in 0_i64..=i64::MAX) {
        let (_, fruit) = setup_fruit();

        let mut apple = fruit.construct([("name", "apple")]).unwrap();
        apple.set("name", name.as_str()).unwrap();
        apple.set("quantity", quantity).unwrap();

        prop_assert_eq!(apple.get("name").and_then(Value::as_text), Some(name.as_str()));
        prop_assert_eq!(apple.get("quantity"), Some(&Value::Int(quantity)));
    }

    #[test]
    fn test_negative_quantity_is_always_rejected(quantity in i64::MIN..0) {
        let (_, fruit) = setup_fruit();
        let mut apple = fruit.construct([("name", "apple")]).unwrap();

        let err = apple.set("quantity", quantity).unwrap_err();

        prop_assert!(err.validation().unwrap().field("quantity").unwrap().mentions("greater than or equal to 0"));
        prop_assert_eq!(apple.get("quantity"), Some(&Value::Int(10)));
    }

    #[test]
    fn test_text_round_trip(name in fruit_name(), quantity in 0_i64..1_000_000, quarters in -4000_i32..4000) {
        let (registry, fruit) = setup_fruit();
        let original = fruit
            .construct([
                ("name", Value::from(name)),
                ("quantity", Value::Int(quantity)),
                ("weight", Value::Float(f64::from(quarters) / 4.0)),
            ])
            .unwrap();

        let text = original.to_text().unwrap();
        let decoded = registry.from_text(&text, Target::from(&fruit)).unwrap();

        prop_assert_eq!(&decoded, &original);
        prop_assert_eq!(decoded.content_hash(), original.content_hash());
    }

    #[test]
    fn test_frames_survive_arbitrary_chunking(
        names in proptest::collection::vec(fruit_name(), 1..5),
        chunk in 1_usize..17,
    ) {
        let (registry, fruit) = setup_fruit();
        let sent: Vec<_> = names
            .into_iter()
            .map(|name| fruit.construct([("name", name)]).unwrap())
            .collect();
        let stream: Vec<u8> = sent.iter().flat_map(|i| i.to_framed_bytes().unwrap()).collect();

        let mut buffer = FrameBuffer::new();
        let mut received = Vec::new();
        for piece in stream.chunks(chunk) {
            buffer.push(piece);
            while let Some(frame) = buffer.next_frame().unwrap() {
                received.push(registry.from_framed_bytes(&frame, Target::Family).unwrap());
            }
        }

        prop_assert!(buffer.is_empty());
        prop_assert_eq!(received, sent);
    }
}
