//! Canonical JSON codec (C4).
//!
//! A contract with the wire, not a convenience: digests are computed over
//! this exact byte stream, so the encoder cannot rely on whatever key order
//! `serde`'s default serializer happens to produce. Keys are sorted at
//! every level and the output is two-space-indented with a trailing
//! newline; unknown fields are tolerated on decode for forward
//! compatibility.

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Encode `value` to its canonical byte representation. Because
/// `serde_json::Map` is a `BTreeMap` by default, keys are already sorted in
/// the decoded `Value` tree; this function only has to control
/// indentation/newline style, which it does with a dedicated pretty
/// formatter so the result is stable across `serde_json` versions.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let v: Value = serde_json::to_value(value)?;
    encode_value(&v)
}

/// Encode an already-decoded `Value`, re-sorting object keys at every level
/// so that canonicalization does not depend on insertion order even if the
/// value passed through a map type that preserves it.
pub fn encode_value(value: &Value) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    write_value(&mut out, value, 0);
    out.push(b'\n');
    Ok(out)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(bytes)?)
}

fn write_indent(out: &mut Vec<u8>, depth: usize) {
    for _ in 0..depth {
        out.extend_from_slice(b"  ");
    }
}

fn write_value(out: &mut Vec<u8>, value: &Value, depth: usize) {
    match value {
        Value::Null => out.extend_from_slice(b"null"),
        Value::Bool(b) => out.extend_from_slice(if *b { b"true" } else { b"false" }),
        Value::Number(n) => out.extend_from_slice(n.to_string().as_bytes()),
        Value::String(s) => write_json_string(out, s),
        Value::Array(items) => {
            if items.is_empty() {
                out.extend_from_slice(b"[]");
                return;
            }
            out.push(b'[');
            out.push(b'\n');
            for (i, item) in items.iter().enumerate() {
                write_indent(out, depth + 1);
                write_value(out, item, depth + 1);
                if i + 1 < items.len() {
                    out.push(b',');
                }
                out.push(b'\n');
            }
            write_indent(out, depth);
            out.push(b']');
        }
        Value::Object(map) => {
            if map.is_empty() {
                out.extend_from_slice(b"{}");
                return;
            }
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push(b'{');
            out.push(b'\n');
            for (i, key) in keys.iter().enumerate() {
                write_indent(out, depth + 1);
                write_json_string(out, key);
                out.extend_from_slice(b": ");
                write_value(out, &map[*key], depth + 1);
                if i + 1 < keys.len() {
                    out.push(b',');
                }
                out.push(b'\n');
            }
            write_indent(out, depth);
            out.push(b'}');
        }
    }
}

fn write_json_string(out: &mut Vec<u8>, s: &str) {
    out.push(b'"');
    for c in s.chars() {
        match c {
            '"' => out.extend_from_slice(b"\\\""),
            '\\' => out.extend_from_slice(b"\\\\"),
            '\n' => out.extend_from_slice(b"\\n"),
            '\r' => out.extend_from_slice(b"\\r"),
            '\t' => out.extend_from_slice(b"\\t"),
            c if (c as u32) < 0x20 => {
                out.extend_from_slice(format!("\\u{:04x}", c as u32).as_bytes());
            }
            c => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
        }
    }
    out.push(b'"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Sample {
        zeta: u32,
        alpha: String,
        nested: Vec<u32>,
    }

    #[test]
    fn keys_are_sorted_regardless_of_struct_field_order() {
        let s = Sample {
            zeta: 1,
            alpha: "x".to_string(),
            nested: vec![1, 2],
        };
        let bytes = encode(&s).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.find("\"alpha\"").unwrap() < text.find("\"zeta\"").unwrap());
    }

    #[test]
    fn decode_encode_roundtrips_byte_for_byte() {
        let s = Sample {
            zeta: 42,
            alpha: "hello".to_string(),
            nested: vec![3, 2, 1],
        };
        let bytes = encode(&s).unwrap();
        let decoded: Sample = decode(&bytes).unwrap();
        assert_eq!(decoded, s);
        let reencoded = encode(&decoded).unwrap();
        assert_eq!(bytes, reencoded);
    }

    #[test]
    fn decode_tolerates_unknown_fields() {
        #[derive(Deserialize)]
        struct Narrow {
            alpha: String,
        }
        let wide = serde_json::json!({"alpha": "x", "extra": 123});
        let bytes = serde_json::to_vec(&wide).unwrap();
        let narrow: Narrow = decode(&bytes).unwrap();
        assert_eq!(narrow.alpha, "x");
    }

    #[test]
    fn empty_containers_render_compact() {
        let v = serde_json::json!({"a": [], "b": {}});
        let bytes = encode_value(&v).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("\"a\": []"));
        assert!(text.contains("\"b\": {}"));
    }
}
