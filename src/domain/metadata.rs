//! Ordered, multi-valued document metadata

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Pseudo-field resolving to the document reference
pub const REFERENCE: &str = "document.reference";
/// Content type determined before extraction
pub const CONTENT_TYPE: &str = "document.contentType";
/// Reference of the document a child was split from
pub const EMBEDDED_PARENT_REFERENCE: &str = "document.embedded.parent.reference";
/// Position of a child within its parent
pub const EMBEDDED_REFERENCE: &str = "document.embedded.reference";
/// Chunk position and character offsets within the parent text
pub const CHUNK_INDEX: &str = "document.chunk.index";
pub const CHUNK_TOTAL: &str = "document.chunk.total";
pub const CHUNK_CHAR_START: &str = "document.chunk.charStart";
pub const CHUNK_CHAR_END: &str = "document.chunk.charEnd";

#[derive(Debug, Clone, PartialEq, Eq)]
struct Field {
    name: String,
    values: Vec<String>,
}

/// Field name to ordered values mapping
///
/// Field names keep the case they were first stored with; lookups fold
/// case. A field without values is treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    fields: Vec<Field>,
}

/// Case-insensitive field name comparison
pub fn same_field(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

impl Metadata {
    /// Create empty metadata
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| same_field(&f.name, name))
    }

    /// Values of a field, `None` when absent or empty
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.position(name)
            .map(|i| self.fields[i].values.as_slice())
            .filter(|values| !values.is_empty())
    }

    /// First value of a field
    pub fn get_first(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|v| v.first()).map(String::as_str)
    }

    /// Whether the field holds at least one value
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Append a value, creating the field if needed
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();

        match self.position(&name) {
            Some(i) => self.fields[i].values.push(value),
            None => self.fields.push(Field {
                name,
                values: vec![value],
            }),
        }
    }

    /// Append several values in order
    pub fn add_all<I, S>(&mut self, name: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        for value in values {
            self.add(name.clone(), value);
        }
    }

    /// Replace all values of a field
    pub fn set<I, S>(&mut self, name: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        let values: Vec<String> = values.into_iter().map(Into::into).collect();

        match self.position(&name) {
            Some(i) => self.fields[i].values = values,
            None => self.fields.push(Field { name, values }),
        }
    }

    /// Remove a field, returning its values
    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        self.position(name).map(|i| self.fields.remove(i).values)
    }

    /// Append every field of `other`, keeping existing values
    pub fn merge(&mut self, other: Metadata) {
        for field in other.fields {
            self.add_all(field.name, field.values);
        }
    }

    /// Iterate over non-empty fields in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields
            .iter()
            .filter(|f| !f.values.is_empty())
            .map(|f| (f.name.as_str(), f.values.as_slice()))
    }

    /// Number of non-empty fields
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> FromIterator<(K, V)> for Metadata
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut metadata = Metadata::new();
        for (key, value) in iter {
            metadata.add(key, value);
        }
        metadata
    }
}

impl Serialize for Metadata {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (name, values) in self.iter() {
            map.serialize_entry(name, values)?;
        }
        map.end()
    }
}
