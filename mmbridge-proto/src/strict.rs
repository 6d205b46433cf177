//! JSON parsing that refuses repeated object keys.
//!
//! `serde_json::Value` keeps the last of two equal keys; the codec parses
//! through these types instead.

use std::fmt;

use serde::de::{self, Deserialize, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde_json::{Map, Number, Value as J};

/// Top-level payload: object entries in arrival order, duplicates kept so
/// the caller can name them, or the type name of a non-object.
#[derive(Debug)]
pub(crate) enum Parsed {
    /// The payload is an object.
    Entries(Vec<(String, J)>),
    /// The payload is some other JSON value.
    Other(&'static str),
}

impl<'de> Deserialize<'de> for Parsed {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        d.deserialize_any(ParsedVisitor)
    }
}

/// Visitor for [`Parsed`].
struct ParsedVisitor;

impl<'de> Visitor<'de> for ParsedVisitor {
    type Value = Parsed;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON value")
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> Result<Parsed, E> {
        Ok(Parsed::Other("boolean"))
    }

    fn visit_i64<E: de::Error>(self, _: i64) -> Result<Parsed, E> {
        Ok(Parsed::Other("integer"))
    }

    fn visit_u64<E: de::Error>(self, _: u64) -> Result<Parsed, E> {
        Ok(Parsed::Other("integer"))
    }

    fn visit_f64<E: de::Error>(self, _: f64) -> Result<Parsed, E> {
        Ok(Parsed::Other("float"))
    }

    fn visit_str<E: de::Error>(self, _: &str) -> Result<Parsed, E> {
        Ok(Parsed::Other("string"))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Parsed, E> {
        Ok(Parsed::Other("null"))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Parsed, A::Error> {
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(Parsed::Other("list"))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Parsed, A::Error> {
        let mut entries = Vec::new();
        while let Some(key) = map.next_key::<String>()? {
            let Strict(value) = map.next_value()?;
            entries.push((key, value));
        }
        Ok(Parsed::Entries(entries))
    }
}

/// A JSON value whose objects, at any depth, have unique keys.
#[derive(Debug)]
pub(crate) struct Strict(pub(crate) J);

impl<'de> Deserialize<'de> for Strict {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        d.deserialize_any(StrictVisitor).map(Strict)
    }
}

/// Visitor for [`Strict`].
struct StrictVisitor;

impl<'de> Visitor<'de> for StrictVisitor {
    type Value = J;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON value")
    }

    fn visit_bool<E: de::Error>(self, b: bool) -> Result<J, E> {
        Ok(J::Bool(b))
    }

    fn visit_i64<E: de::Error>(self, i: i64) -> Result<J, E> {
        Ok(J::from(i))
    }

    fn visit_u64<E: de::Error>(self, u: u64) -> Result<J, E> {
        Ok(J::from(u))
    }

    fn visit_f64<E: de::Error>(self, f: f64) -> Result<J, E> {
        Number::from_f64(f)
            .map(J::Number)
            .ok_or_else(|| E::custom("non-finite number"))
    }

    fn visit_str<E: de::Error>(self, s: &str) -> Result<J, E> {
        Ok(J::String(s.to_owned()))
    }

    fn visit_string<E: de::Error>(self, s: String) -> Result<J, E> {
        Ok(J::String(s))
    }

    fn visit_unit<E: de::Error>(self) -> Result<J, E> {
        Ok(J::Null)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<J, A::Error> {
        let mut items = Vec::new();
        while let Some(Strict(item)) = seq.next_element()? {
            items.push(item);
        }
        Ok(J::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<J, A::Error> {
        let mut object = Map::new();
        while let Some(key) = map.next_key::<String>()? {
            if object.contains_key(&key) {
                return Err(de::Error::custom(format_args!("duplicate key `{key}`")));
            }
            let Strict(value) = map.next_value()?;
            object.insert(key, value);
        }
        Ok(J::Object(object))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_top_level_entries_in_order() {
        let Parsed::Entries(entries) =
            serde_json::from_slice::<Parsed>(br#"{"b":1,"a":{"x":[true,null]},"b":2}"#).unwrap()
        else {
            panic!("expected an object");
        };
        let keys: Vec<_> = entries.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["b", "a", "b"]);
        assert_eq!(entries[1].1, serde_json::json!({"x": [true, null]}));
    }

    #[test]
    fn names_non_objects() {
        for (text, name) in [
            ("[1, {\"a\": 1}]", "list"),
            ("\"x\"", "string"),
            ("-3", "integer"),
            ("18446744073709551615", "integer"),
            ("2.5", "float"),
            ("null", "null"),
            ("false", "boolean"),
        ] {
            let payload: Parsed = serde_json::from_str(text).unwrap();
            assert!(matches!(payload, Parsed::Other(n) if n == name), "{text}");
        }
    }

    #[test]
    fn nested_duplicates_are_rejected() {
        let err = serde_json::from_str::<Strict>(r#"{"a":{"k":1,"k":2}}"#).unwrap_err();
        assert!(err.to_string().contains("duplicate key `k`"), "{err}");
        let err = serde_json::from_str::<Strict>(r#"[{"k":1,"k":1}]"#).unwrap_err();
        assert!(err.to_string().contains("duplicate key `k`"), "{err}");
    }

    #[test]
    fn matches_serde_json_on_unique_keys() {
        let text = r#"{"s":"x","i":-4,"u":9007199254740993,"f":0.1,"l":[1,2.5,"y"],"d":{"n":null}}"#;
        let Strict(strict) = serde_json::from_str::<Strict>(text).unwrap();
        let plain: J = serde_json::from_str(text).unwrap();
        assert_eq!(strict, plain);
    }
}
