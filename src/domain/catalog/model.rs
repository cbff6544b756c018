use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Deserialize;

use super::error::CatalogError;

/// Nested word list: level -> ordered groups -> words.
///
/// The JSON shape is `{"A1": [{"G1 - saludos": ["hola", ...]}, ...], ...}`.
/// Group order inside a level follows the file; that ordering is what makes
/// repeated runs process words in the same sequence.
#[derive(Debug, Clone, Deserialize)]
pub struct WordCatalog(HashMap<String, Vec<BTreeMap<String, Vec<String>>>>);

/// One word to synthesize, flattened out of the catalog. Derived data only,
/// never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordEntry {
    pub text: String,
    pub level: String,
    pub group_name: String,
    pub group_number: u32,
}

impl WordEntry {
    /// Storage object path: `<level>/<group>/<sanitized-word>.wav`.
    pub fn artifact_path(&self) -> String {
        format!(
            "{}/{}/{}.wav",
            self.level,
            self.group_name,
            sanitize_filename(&self.text)
        )
    }
}

impl WordCatalog {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|_| CatalogError::NotFound(path.display().to_string()))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        serde_json::from_str(raw).map_err(|e| CatalogError::Malformed(e.to_string()))
    }

    /// Flattens one level into catalog-ordered entries, keeping only groups
    /// whose number falls inside the inclusive range. Groups without a digit
    /// in their name are silently skipped.
    pub fn entries_in_range(&self, level: &str, group_min: u32, group_max: u32) -> Vec<WordEntry> {
        let Some(groups) = self.0.get(level) else {
            tracing::warn!(target_level = level, "level not present in word catalog");
            return Vec::new();
        };

        let mut entries = Vec::new();
        for group in groups {
            for (group_name, words) in group {
                let Some(group_number) = extract_group_number(group_name) else {
                    continue;
                };
                if group_number < group_min || group_number > group_max {
                    continue;
                }
                for word in words {
                    entries.push(WordEntry {
                        text: word.clone(),
                        level: level.to_string(),
                        group_name: group_name.clone(),
                        group_number,
                    });
                }
            }
        }
        entries
    }
}

/// First run of digits in the group name, e.g. "G12 - comida" -> 12.
pub fn extract_group_number(name: &str) -> Option<u32> {
    let digit_pattern = regex::Regex::new(r"\d+").unwrap();
    digit_pattern.find(name).and_then(|m| m.as_str().parse().ok())
}

/// Strip path separators and anything that is not alphanumeric, space,
/// dash or underscore, so the word is safe as an object-path segment.
pub fn sanitize_filename(text: &str) -> String {
    let safe = text.replace(['/', '\\'], "_");
    safe.trim()
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect::<String>()
        .trim()
        .to_string()
}
