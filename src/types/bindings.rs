use std::collections::HashMap;

use super::Value;

/// Variable bindings an expression is evaluated against, keyed by
/// dot-separated paths.
///
/// Supports nested paths like `"registration.payer.state"`. JSON arrays are
/// stored under their positional index (`"camper.sessions.0"`).
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    data: HashMap<String, Slot>,
}

#[derive(Debug, Clone)]
enum Slot {
    Leaf(Value),
    /// Bound, but its producer failed. Reading it is an error rather than a
    /// silent fallback.
    Unavailable,
    Nested(HashMap<String, Slot>),
}

/// Outcome of a [`Bindings::lookup`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lookup<'a> {
    Found(&'a Value),
    Missing,
    Unavailable,
}

impl Bindings {
    /// Create empty bindings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value at a dot-separated path. Creates intermediate nested maps as needed.
    #[must_use]
    pub fn set(mut self, path: &str, value: impl Into<Value>) -> Self {
        self.insert(path, value.into());
        self
    }

    /// Insert a value at a dot-separated path (mutable reference version).
    pub fn insert(&mut self, path: &str, value: Value) {
        self.insert_slot(path, Slot::Leaf(value));
    }

    /// Mark a path as bound-but-unavailable.
    pub fn insert_unavailable(&mut self, path: &str) {
        self.insert_slot(path, Slot::Unavailable);
    }

    /// Bind every entry of a JSON object below `root`, recursing into nested
    /// objects and arrays.
    pub fn insert_json(&mut self, root: &str, object: &serde_json::Map<String, serde_json::Value>) {
        for (key, value) in object {
            self.insert_json_value(&format!("{root}.{key}"), value);
        }
    }

    fn insert_json_value(&mut self, path: &str, value: &serde_json::Value) {
        match value {
            serde_json::Value::Object(map) => self.insert_json(path, map),
            serde_json::Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    self.insert_json_value(&format!("{path}.{i}"), item);
                }
            }
            // A number `Decimal` cannot hold is bound but unusable.
            scalar => match Value::from_json(scalar) {
                Some(v) => self.insert(path, v),
                None => self.insert_unavailable(path),
            },
        }
    }

    fn insert_slot(&mut self, path: &str, slot: Slot) {
        let segments: Vec<&str> = path.split('.').collect();
        Self::insert_recursive(&mut self.data, &segments, slot);
    }

    /// Look up a value by dot-separated path.
    /// Returns `None` if the path does not exist, points to a nested map, or
    /// is unavailable.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Value> {
        match self.lookup(path) {
            Lookup::Found(v) => Some(v),
            Lookup::Missing | Lookup::Unavailable => None,
        }
    }

    /// Look up a path, distinguishing missing from unavailable.
    #[must_use]
    pub fn lookup(&self, path: &str) -> Lookup<'_> {
        let segments: Vec<&str> = path.split('.').collect();
        Self::lookup_recursive(&self.data, &segments)
    }

    fn insert_recursive(map: &mut HashMap<String, Slot>, segments: &[&str], slot: Slot) {
        match segments {
            [] => {}
            [last] => {
                map.insert((*last).to_owned(), slot);
            }
            [first, rest @ ..] => {
                let entry = map
                    .entry((*first).to_owned())
                    .or_insert_with(|| Slot::Nested(HashMap::new()));
                match entry {
                    Slot::Nested(nested) => {
                        Self::insert_recursive(nested, rest, slot);
                    }
                    Slot::Leaf(_) | Slot::Unavailable => {
                        let mut nested = HashMap::new();
                        Self::insert_recursive(&mut nested, rest, slot);
                        *entry = Slot::Nested(nested);
                    }
                }
            }
        }
    }

    fn lookup_recursive<'a>(map: &'a HashMap<String, Slot>, segments: &[&str]) -> Lookup<'a> {
        match segments {
            [] => Lookup::Missing,
            [last] => match map.get(*last) {
                Some(Slot::Leaf(v)) => Lookup::Found(v),
                Some(Slot::Unavailable) => Lookup::Unavailable,
                Some(Slot::Nested(_)) | None => Lookup::Missing,
            },
            [first, rest @ ..] => match map.get(*first) {
                Some(Slot::Nested(nested)) => Self::lookup_recursive(nested, rest),
                Some(Slot::Leaf(_) | Slot::Unavailable) | None => Lookup::Missing,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_and_get_simple() {
        let b = Bindings::new().set("name", "alice");
        assert_eq!(b.get("name"), Some(&Value::from("alice")));
    }

    #[test]
    fn set_and_get_nested() {
        let b = Bindings::new().set("camper.profile.age", 25_i64);
        assert_eq!(b.get("camper.profile.age"), Some(&Value::from(25_i64)));
    }

    #[test]
    fn get_missing_returns_none() {
        let b = Bindings::new().set("camper.age", 25_i64);
        assert_eq!(b.get("camper.name"), None);
        assert_eq!(b.get("nonexistent"), None);
        assert_eq!(b.lookup("camper.name"), Lookup::Missing);
    }

    #[test]
    fn get_intermediate_path_returns_none() {
        let b = Bindings::new().set("camper.age", 25_i64);
        assert_eq!(b.get("camper"), None);
    }

    #[test]
    fn overwrite_leaf_with_nested() {
        let b = Bindings::new().set("user", "old").set("user.age", 30_i64);
        assert_eq!(b.get("user.age"), Some(&Value::from(30_i64)));
        assert_eq!(b.get("user"), None);
    }

    #[test]
    fn overwrite_value() {
        let b = Bindings::new().set("score", 10_i64).set("score", 20_i64);
        assert_eq!(b.get("score"), Some(&Value::from(20_i64)));
    }

    #[test]
    fn unavailable_is_distinct_from_missing() {
        let mut b = Bindings::new();
        b.insert_unavailable("campers.subtotal");
        assert_eq!(b.lookup("campers.subtotal"), Lookup::Unavailable);
        assert_eq!(b.get("campers.subtotal"), None);
        assert_eq!(b.lookup("campers.other"), Lookup::Missing);
    }

    #[test]
    fn insert_json_object_and_arrays() {
        let camper = json!({
            "age": 12,
            "name": "Ada",
            "sessions": ["week1", "week2"],
            "address": { "state": "CA" },
            "notes": null
        });
        let mut b = Bindings::new();
        b.insert_json("camper", camper.as_object().unwrap());

        assert_eq!(b.get("camper.age"), Some(&Value::from(12_i64)));
        assert_eq!(b.get("camper.name"), Some(&Value::from("Ada")));
        assert_eq!(b.get("camper.sessions.1"), Some(&Value::from("week2")));
        assert_eq!(b.get("camper.address.state"), Some(&Value::from("CA")));
        assert_eq!(b.get("camper.notes"), Some(&Value::Null));
    }

    #[test]
    fn out_of_range_number_is_unavailable() {
        let camper = json!({ "nights": 1e30, "age": 9 });
        let mut b = Bindings::new();
        b.insert_json("camper", camper.as_object().unwrap());

        assert_eq!(b.lookup("camper.nights"), Lookup::Unavailable);
        assert_eq!(b.get("camper.age"), Some(&Value::from(9_i64)));
    }

    #[test]
    fn empty_bindings_return_none() {
        let b = Bindings::new();
        assert_eq!(b.get("anything"), None);
    }
}
