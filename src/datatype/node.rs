//! A parsed payload that keeps every field of every object.
//!
//! `serde_json::Value` stores objects in a map, so a key repeated within one
//! object keeps only its last value. `Node` stores objects as a list of
//! fields in document order instead. Anything that is not an object is kept
//! as a plain `Value`.

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde_json::Value;
use serde_json::map::Map;
use std::fmt;

/// One parsed JSON node.
///
/// A `Leaf` never holds an object, those always become `Object`. Arrays stay
/// leaves; their elements are read as numbers and never descended into.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Fields in document order, repeated keys included.
    Object(Vec<(String, Node)>),
    /// Any other JSON value.
    Leaf(Value),
}

impl Node {
    /// Convert the fields of an already parsed object.
    pub fn fields(obj: &Map<String, Value>) -> Vec<(String, Node)> {
        obj.iter()
            .map(|(k, v)| (k.clone(), Node::from(v.clone())))
            .collect()
    }

    /// The leaf value, if this is not an object.
    pub fn as_leaf(&self) -> Option<&Value> {
        match *self {
            Node::Leaf(ref v) => Some(v),
            Node::Object(_) => None,
        }
    }
}

impl From<Value> for Node {
    fn from(value: Value) -> Node {
        match value {
            Value::Object(obj) => Node::Object(
                obj.into_iter()
                    .map(|(k, v)| (k, Node::from(v)))
                    .collect(),
            ),
            other => Node::Leaf(other),
        }
    }
}

struct NodeVisitor;

impl<'de> Visitor<'de> for NodeVisitor {
    type Value = Node;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("any JSON value")
    }

    fn visit_bool<E>(self, v: bool) -> Result<Node, E>
    where
        E: de::Error,
    {
        Ok(Node::Leaf(Value::Bool(v)))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Node, E>
    where
        E: de::Error,
    {
        Ok(Node::Leaf(Value::from(v)))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Node, E>
    where
        E: de::Error,
    {
        Ok(Node::Leaf(Value::from(v)))
    }

    fn visit_f64<E>(self, v: f64) -> Result<Node, E>
    where
        E: de::Error,
    {
        Ok(Node::Leaf(Value::from(v)))
    }

    fn visit_str<E>(self, v: &str) -> Result<Node, E>
    where
        E: de::Error,
    {
        Ok(Node::Leaf(Value::String(v.to_string())))
    }

    fn visit_string<E>(self, v: String) -> Result<Node, E>
    where
        E: de::Error,
    {
        Ok(Node::Leaf(Value::String(v)))
    }

    fn visit_unit<E>(self) -> Result<Node, E>
    where
        E: de::Error,
    {
        Ok(Node::Leaf(Value::Null))
    }

    fn visit_none<E>(self) -> Result<Node, E>
    where
        E: de::Error,
    {
        Ok(Node::Leaf(Value::Null))
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Node, D::Error>
    where
        D: Deserializer<'de>,
    {
        Node::deserialize(deserializer)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Node, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element::<Value>()? {
            items.push(item);
        }
        Ok(Node::Leaf(Value::Array(items)))
    }

    fn visit_map<A>(self, mut map: A) -> Result<Node, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut fields = Vec::new();
        while let Some((key, value)) = map.next_entry::<String, Node>()? {
            fields.push((key, value));
        }
        Ok(Node::Object(fields))
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D>(deserializer: D) -> Result<Node, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(NodeVisitor)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json;

    fn parse(s: &str) -> Node {
        serde_json::from_str(s).unwrap()
    }

    #[test]
    fn repeated_keys_are_kept_in_order() {
        match parse(r#"{"b": 1, "a": 2, "b": 3}"#) {
            Node::Object(fields) => {
                let keys: Vec<&str> = fields.iter().map(|&(ref k, _)| k.as_str()).collect();
                assert_eq!(keys, vec!["b", "a", "b"]);
                assert_eq!(fields[0].1, Node::Leaf(Value::from(1)));
                assert_eq!(fields[2].1, Node::Leaf(Value::from(3)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn nested_objects_are_nodes() {
        match parse(r#"{"m": {"x": "y", "x": null}, "l": [1, {"z": 1}]}"#) {
            Node::Object(fields) => {
                assert_eq!(
                    fields[0].1,
                    Node::Object(vec![
                        ("x".to_string(), Node::Leaf(Value::from("y"))),
                        ("x".to_string(), Node::Leaf(Value::Null)),
                    ])
                );
                assert_eq!(fields[1].1, Node::Leaf(json!([1, {"z": 1}])));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn scalars_are_leaves() {
        assert_eq!(parse("12"), Node::Leaf(Value::from(12)));
        assert_eq!(parse("-1.5"), Node::Leaf(Value::from(-1.5)));
        assert_eq!(parse("true"), Node::Leaf(Value::Bool(true)));
        assert_eq!(parse("null"), Node::Leaf(Value::Null));
        assert_eq!(parse("\"s\""), Node::Leaf(Value::from("s")));
        assert!(serde_json::from_str::<Node>("{").is_err());
    }

    #[test]
    fn from_value_matches_parse() {
        let text = r#"{"z": {"y": [1, 2]}, "a": "b"}"#;
        let value: Value = serde_json::from_str(text).unwrap();
        assert_eq!(Node::from(value), parse(text));
    }
}
