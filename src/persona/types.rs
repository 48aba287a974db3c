//! Core persona types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::storage::safe_name;

/// One simulated individual with a fixed personality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    /// Display name, also used (sanitized) as the artifact file name.
    pub name: String,

    /// System prompt that keeps the model in character.
    pub system_prompt: String,
}

impl Persona {
    pub fn new(name: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            system_prompt: system_prompt.into(),
        }
    }

    /// File stem for this persona's artifacts.
    pub fn file_stem(&self) -> String {
        safe_name(&self.name)
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// On-disk catalog shape: `{"characters": [...]}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct CatalogFile {
    pub characters: Vec<Persona>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_stem_is_sanitized() {
        let persona = Persona::new("Sherlock Holmes", "You are Sherlock Holmes.");
        assert_eq!(persona.file_stem(), "Sherlock_Holmes");
        assert_eq!(persona.to_string(), "Sherlock Holmes");
    }

    #[test]
    fn test_catalog_file_shape() {
        let json = r#"{"characters": [{"name": "Ada", "system_prompt": "You are Ada."}]}"#;
        let file: CatalogFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.characters.len(), 1);
        assert_eq!(file.characters[0].name, "Ada");
    }
}
