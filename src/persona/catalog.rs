//! Persona catalog loading and selection.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Error, Result};

use super::types::{CatalogFile, Persona};

/// Validated, ordered list of personas.
#[derive(Debug, Clone)]
pub struct PersonaCatalog {
    source: PathBuf,
    personas: Vec<Persona>,
}

impl PersonaCatalog {
    /// Load and validate a catalog file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::IoRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        let file: CatalogFile = serde_json::from_str(&content)
            .map_err(|e| Error::malformed(path, e.to_string()))?;

        let catalog = Self::from_personas(path, file.characters)?;
        info!(
            path = %path.display(),
            personas = catalog.len(),
            "Loaded persona catalog"
        );
        Ok(catalog)
    }

    /// Build a catalog from already-parsed personas, applying the same checks as [`load`](Self::load).
    pub fn from_personas(source: impl Into<PathBuf>, personas: Vec<Persona>) -> Result<Self> {
        let source = source.into();
        if personas.is_empty() {
            return Err(Error::EmptyData {
                path: source,
                what: "personas",
            });
        }

        let mut seen = HashSet::new();
        for persona in &personas {
            validate(persona)?;
            if !seen.insert(persona.file_stem()) {
                return Err(Error::persona_invalid(
                    &persona.name,
                    "duplicate name (artifact file names would collide)",
                ));
            }
        }

        debug!(count = personas.len(), "Persona catalog validated");
        Ok(Self { source, personas })
    }

    /// Keep only the named personas, preserving catalog order.
    ///
    /// An empty filter keeps everything. Unknown names are an error.
    pub fn select(self, names: &[String]) -> Result<Self> {
        if names.is_empty() {
            return Ok(self);
        }

        for name in names {
            if self.get(name).is_none() {
                return Err(Error::persona_invalid(name, "not found in catalog"));
            }
        }

        let personas = self
            .personas
            .into_iter()
            .filter(|p| names.contains(&p.name))
            .collect();
        Ok(Self {
            source: self.source,
            personas,
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn get(&self, name: &str) -> Option<&Persona> {
        self.personas.iter().find(|p| p.name == name)
    }

    pub fn len(&self) -> usize {
        self.personas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Persona> {
        self.personas.iter()
    }
}

fn validate(persona: &Persona) -> Result<()> {
    if persona.name.trim().is_empty() {
        return Err(Error::persona_invalid(&persona.name, "name is blank"));
    }
    if persona.file_stem() == "conversation" && persona.name != "conversation" {
        return Err(Error::persona_invalid(
            &persona.name,
            "name has no characters usable in a file name",
        ));
    }
    if persona.system_prompt.trim().is_empty() {
        return Err(Error::persona_invalid(&persona.name, "system_prompt is empty"));
    }
    Ok(())
}
