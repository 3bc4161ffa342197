use serde::Serialize;
use std::collections::BTreeMap;

/// Placeholder id → server id mappings produced by the container phase.
///
/// Built once per pass and handed to the member phase explicitly; nothing
/// else rewrites container references.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RemapTable {
    entries: BTreeMap<String, String>,
}

impl RemapTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, placeholder: impl Into<String>, server_id: impl Into<String>) {
        self.entries.insert(placeholder.into(), server_id.into());
    }

    #[must_use]
    pub fn get(&self, placeholder: &str) -> Option<&str> {
        self.entries.get(placeholder).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(from, to)| (from.as_str(), to.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::RemapTable;

    #[test]
    fn lookup_and_serialize() {
        let mut table = RemapTable::new();
        assert!(table.is_empty());
        table.insert("local-aa", "srv-1");

        assert_eq!(table.get("local-aa"), Some("srv-1"));
        assert_eq!(table.get("local-bb"), None);
        assert_eq!(table.len(), 1);

        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(json, r#"{"local-aa":"srv-1"}"#);
    }
}
