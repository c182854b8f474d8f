use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    pub id: i32,
    pub name: String,
}

impl KeyValue {
    pub fn new(id: i32, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
        }
    }
}

/// Owner directory: users and roles that tasks can be assigned to.
///
/// Loaded once and only read afterwards. Entries keep the order they were
/// loaded in, which decides ties between prefix matches.
#[derive(Debug, Clone, Default)]
pub struct KeyValueList {
    entries: Vec<KeyValue>,
}

impl KeyValueList {
    pub fn new(entries: Vec<KeyValue>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[KeyValue] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn name_from_id(&self, id: i32) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.name.as_str())
    }

    /// Name shown in the owner field, empty when the id is unknown.
    pub fn display_name(&self, id: i32) -> String {
        self.name_from_id(id).unwrap_or_default().to_string()
    }

    /// Resolve typed owner text to an id.
    ///
    /// An exact name wins. Otherwise the first entry whose name starts with
    /// the text, ignoring case, is taken.
    pub fn id_from_name(&self, name: &str) -> Option<i32> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        if let Some(entry) = self.entries.iter().find(|entry| entry.name == name) {
            return Some(entry.id);
        }

        let lowered = name.to_lowercase();
        self.entries
            .iter()
            .find(|entry| entry.name.to_lowercase().starts_with(&lowered))
            .map(|entry| entry.id)
    }
}

impl FromIterator<KeyValue> for KeyValueList {
    fn from_iter<I: IntoIterator<Item = KeyValue>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
