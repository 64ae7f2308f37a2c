use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

/// One camper's answers: field name to JSON value.
pub type Camper = Map<String, Json>;

/// The registration form as the renderer reports it.
///
/// Registration-level fields sit beside `campers` in the JSON shape and are
/// bound under `registration.*` during pricing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormData {
    #[serde(default)]
    pub campers: Vec<Camper>,
    #[serde(flatten)]
    pub fields: Map<String, Json>,
}

impl FormData {
    /// Empty form data with no campers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The form a freshly loaded registration page starts with: one empty
    /// camper.
    #[must_use]
    pub fn with_default_camper() -> Self {
        Self {
            campers: vec![Camper::new()],
            fields: Map::new(),
        }
    }

    /// Append a camper.
    #[must_use]
    pub fn camper(mut self, camper: Camper) -> Self {
        self.campers.push(camper);
        self
    }

    /// Set a registration-level field.
    #[must_use]
    pub fn field(mut self, key: &str, value: impl Into<Json>) -> Self {
        self.fields.insert(key.to_owned(), value.into());
        self
    }

    #[must_use]
    pub fn camper_count(&self) -> usize {
        self.campers.len()
    }
}
