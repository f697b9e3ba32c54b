//! Translation tables
//!
//! One flat JSON object per locale, `{"key": "text", ...}`. Lookups that miss
//! return the key so an untranslated UI still shows something readable.

use rustc_hash::FxHashMap;

#[derive(Clone, Debug, Default)]
pub struct Translations {
    locale: String,
    table: FxHashMap<String, String>,
}

impl Translations {
    pub fn new(locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            table: FxHashMap::default(),
        }
    }

    /// Parse a locale document. Non-string values are skipped.
    pub fn from_json_str(locale: impl Into<String>, json: &str) -> serde_json::Result<Self> {
        let doc: serde_json::Map<String, serde_json::Value> = serde_json::from_str(json)?;
        let mut out = Self::new(locale);
        for (key, value) in doc {
            match value {
                serde_json::Value::String(text) => {
                    out.table.insert(key, text);
                }
                other => {
                    tracing::debug!(key = %key, value = %other, "skipping non-string translation");
                }
            }
        }
        Ok(out)
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn insert(&mut self, key: impl Into<String>, text: impl Into<String>) {
        self.table.insert(key.into(), text.into());
    }

    pub fn get<'a>(&'a self, key: &'a str) -> &'a str {
        self.table.get(key).map(String::as_str).unwrap_or(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_falls_back_to_key() {
        let t = Translations::from_json_str("de", r#"{"save": "Speichern", "n": 3}"#).unwrap();
        assert_eq!(t.locale(), "de");
        assert_eq!(t.len(), 1);
        assert_eq!(t.get("save"), "Speichern");
        assert_eq!(t.get("cancel"), "cancel");
    }

    #[test]
    fn test_rejects_non_object() {
        assert!(Translations::from_json_str("en", "[1, 2]").is_err());
    }
}
