//! Item codec: MessagePack encoding of primary records.

use crate::error::CodecError;
use crate::item::Item;

/// Encode an item into its primary-record bytes.
pub fn encode_item(item: &Item) -> Result<Vec<u8>, CodecError> {
    Ok(rmp_serde::to_vec(item)?)
}

/// Decode primary-record bytes back into an item.
///
/// Round-trip law: `decode_item(&encode_item(x)?) == x` for every valid item,
/// including items with empty field maps. Variant tags survive exactly, so a
/// stored `Int64` never comes back as `Float64`.
pub fn decode_item(bytes: &[u8]) -> Result<Item, CodecError> {
    Ok(rmp_serde::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{Item, ItemValue};
    use proptest::prelude::*;

    #[test]
    fn test_roundtrip_all_field_types() {
        let item = Item::new("user", "u1")
            .with_i64("count", -42)
            .with_i64_indexed("age", 30)
            .with_f64("ratio", 0.25)
            .with_f64_indexed("rank", -1.5)
            .with_string("name", "Ann")
            .with_opaque("blob", vec![0x00, 0xff, 0x7f]);

        let decoded = decode_item(&encode_item(&item).unwrap()).unwrap();
        assert_eq!(decoded, item);
    }

    #[test]
    fn test_roundtrip_empty_fields() {
        let item = Item::new("user", "u1");
        let decoded = decode_item(&encode_item(&item).unwrap()).unwrap();
        assert_eq!(decoded, item);
    }

    #[test]
    fn test_int_tag_not_widened_to_float() {
        let item = Item::new("k", "i").with_i64("n", 7);
        let decoded = decode_item(&encode_item(&item).unwrap()).unwrap();
        // A lookup by the wrong type must report absent.
        assert_eq!(decoded.i64_field("n"), Some(7));
        assert_eq!(decoded.f64_field("n"), None);
        assert_eq!(
            decoded.field("n").unwrap().value,
            ItemValue::Int64(7),
        );
    }

    #[test]
    fn test_indexed_flag_preserved() {
        let item = Item::new("k", "i")
            .with_i64_indexed("a", 1)
            .with_i64("b", 2);
        let decoded = decode_item(&encode_item(&item).unwrap()).unwrap();
        assert!(decoded.field("a").unwrap().indexed);
        assert!(!decoded.field("b").unwrap().indexed);
    }

    #[test]
    fn test_malformed_input_fails() {
        assert!(decode_item(&[]).is_err());
        assert!(decode_item(&[0xc1]).is_err());
        assert!(decode_item(b"not messagepack at all").is_err());
    }

    #[test]
    fn test_truncated_record_fails() {
        let item = Item::new("user", "u1").with_string("name", "Ann");
        let bytes = encode_item(&item).unwrap();
        assert!(decode_item(&bytes[..bytes.len() - 1]).is_err());
    }

    fn arb_value() -> impl Strategy<Value = ItemValue> {
        prop_oneof![
            any::<i64>().prop_map(ItemValue::Int64),
            // Finite floats: NaN breaks the equality check, not the codec.
            (-1e12f64..1e12).prop_map(ItemValue::Float64),
            ".{0,24}".prop_map(ItemValue::String),
            proptest::collection::vec(any::<u8>(), 0..32).prop_map(ItemValue::Opaque),
        ]
    }

    proptest! {
        #[test]
        fn prop_roundtrip(
            id in "[a-z0-9:]{1,12}",
            fields in proptest::collection::btree_map("[a-z]{1,8}", (arb_value(), any::<bool>()), 0..6),
        ) {
            let mut item = Item::new("kind", id);
            for (name, (value, indexed)) in fields {
                item.set_field(name, crate::item::ItemField { value, indexed });
            }
            let decoded = decode_item(&encode_item(&item).unwrap()).unwrap();
            prop_assert_eq!(decoded, item);
        }
    }
}
