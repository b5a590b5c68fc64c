//! Canonical serialization
//!
//! Every value that is hashed or signed goes through this module. Values are
//! lowered to a `serde_json::Value`, excluded fields are dropped from the
//! copy, and the result is written as compact JSON with object keys sorted
//! at every depth. Two equal values always produce identical bytes.

use serde::Serialize;
use serde_json::Value;

/// Fields dropped from a value before it is encoded
#[derive(Debug, Clone, Copy)]
pub struct FieldExclusion {
    /// Fields removed from the top-level object
    pub top: &'static [&'static str],
    /// Fields removed from every object inside the named array field
    pub nested: &'static [(&'static str, &'static [&'static str])],
}

/// Block hash input: everything except the stored hash, and no dedup markers
pub const BLOCK_HASH: FieldExclusion = FieldExclusion {
    top: &["hash"],
    nested: &[("transactions", &["claim"])],
};

/// Transaction signing input: the signed payload only
///
/// The timestamp is stamped by the receiving node after the author signed.
pub const TX_SIGNING: FieldExclusion = FieldExclusion {
    top: &["signature", "claim", "timestamp"],
    nested: &[],
};

/// Lower a value to JSON with the excluded fields removed
pub fn canonical_value<T: Serialize>(
    value: &T,
    exclusion: &FieldExclusion,
) -> Result<Value, serde_json::Error> {
    let mut value = serde_json::to_value(value)?;

    if let Value::Object(map) = &mut value {
        for field in exclusion.top {
            map.remove(*field);
        }
        for (array, fields) in exclusion.nested {
            if let Some(Value::Array(items)) = map.get_mut(*array) {
                for item in items.iter_mut() {
                    if let Value::Object(inner) = item {
                        for field in *fields {
                            inner.remove(*field);
                        }
                    }
                }
            }
        }
    }

    Ok(value)
}

/// Encode a JSON value deterministically
pub fn encode(value: &Value) -> Result<Vec<u8>, serde_json::Error> {
    let mut out = String::new();
    write_value(value, &mut out)?;
    Ok(out.into_bytes())
}

/// Canonical bytes of a value under an exclusion rule
pub fn canonical_bytes<T: Serialize>(
    value: &T,
    exclusion: &FieldExclusion,
) -> Result<Vec<u8>, serde_json::Error> {
    encode(&canonical_value(value, exclusion)?)
}

fn write_value(value: &Value, out: &mut String) -> Result<(), serde_json::Error> {
    match value {
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out)?;
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));

            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(key)?);
                out.push(':');
                write_value(item, out)?;
            }
            out.push('}');
        }
        scalar => out.push_str(&serde_json::to_string(scalar)?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_keys_sorted_at_every_depth() {
        let value = json!({"b": 1, "a": {"z": true, "m": [{"y": 1, "x": 2}]}});
        let bytes = encode(&value).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"a":{"m":[{"x":2,"y":1}],"z":true},"b":1}"#
        );
    }

    #[test]
    fn test_insertion_order_does_not_matter() {
        let first = json!({"index": 1, "nonce": 7, "previous_hash": "00ab"});
        let mut map = serde_json::Map::new();
        map.insert("previous_hash".into(), json!("00ab"));
        map.insert("nonce".into(), json!(7));
        map.insert("index".into(), json!(1));

        assert_eq!(encode(&first).unwrap(), encode(&Value::Object(map)).unwrap());
    }

    #[test]
    fn test_exclusion_rules() {
        let block = json!({
            "hash": "00ff",
            "index": 3,
            "transactions": [{"author": "a", "claim": ["n1"], "signature": "s"}]
        });

        let value = canonical_value(&block, &BLOCK_HASH).unwrap();
        assert!(value.get("hash").is_none());
        assert!(value["transactions"][0].get("claim").is_none());
        assert_eq!(value["transactions"][0]["signature"], "s");

        // The input snapshot is left alone
        assert_eq!(block["hash"], "00ff");
    }

    #[test]
    fn test_signing_exclusion() {
        let tx = json!({
            "author": "a",
            "content": "hello",
            "signature": "s",
            "claim": ["n1"],
            "timestamp": 10
        });
        let bytes = canonical_bytes(&tx, &TX_SIGNING).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"author":"a","content":"hello"}"#
        );
    }

    const NONE: FieldExclusion = FieldExclusion {
        top: &[],
        nested: &[],
    };

    #[test]
    fn test_strings_are_escaped() {
        let bytes = canonical_bytes(&json!({"k": "a\"b\n"}), &NONE).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), r#"{"k":"a\"b\n"}"#);
    }
}
