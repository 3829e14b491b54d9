use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// The `[formats]` table: format name to space-separated extensions.
///
/// Entries are kept in the order they appear in the settings file, later
/// entries take precedence when an extension is claimed by several formats.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatTable(Vec<(String, String)>);

impl FormatTable {
    /// Iterates over `(format, extensions)` in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .map(|(format, extensions)| (format.as_str(), extensions.as_str()))
    }

    /// Returns the names of all registered formats.
    pub fn format_names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(format, _)| format.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormatTable {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl Serialize for FormatTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (format, extensions) in &self.0 {
            map.serialize_entry(format, extensions)?;
        }
        map.end()
    }
}

struct FormatTableVisitor;

impl<'de> Visitor<'de> for FormatTableVisitor {
    type Value = FormatTable;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a table of format names to space-separated extensions")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((format, extensions)) = access.next_entry::<String, String>()? {
            entries.push((format, extensions));
        }
        Ok(FormatTable(entries))
    }
}

impl<'de> Deserialize<'de> for FormatTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(FormatTableVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Wrapper {
        formats: FormatTable,
    }

    #[test]
    fn test_registration_order_is_kept() {
        let wrapper: Wrapper = toml::from_str(
            r#"
            [formats]
            textile = "textile"
            markdown = "md txt"
            creole = "txt"
            "#,
        )
        .unwrap();

        let names: Vec<_> = wrapper.formats.format_names().collect();
        assert_eq!(names, vec!["textile", "markdown", "creole"]);
    }
}
