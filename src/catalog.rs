//! Category catalog: index → canonical and display names
//!
//! Loaded once at startup from a JSON definition of the form
//! `{"breeds": [{"id": 0, "name": "afghan_hound", ...}, ...]}`. Extra fields on
//! each entry are ignored. Ids must be unique and cover `0..N` so that model
//! output indices line up with catalog entries.

use crate::error::{ClassifierError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Display name for indices the catalog does not know
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// One catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: usize,
    pub name: String,
    pub pretty_name: String,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    breeds: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    id: CatalogId,
    name: String,
}

/// Ids appear both as JSON integers and as numeric strings
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CatalogId {
    Number(i64),
    Text(String),
}

impl CatalogId {
    fn resolve(self) -> Result<i64> {
        match self {
            Self::Number(id) => Ok(id),
            Self::Text(text) => text.trim().parse().map_err(|_| {
                ClassifierError::catalog(format!("category id '{text}' is not an integer"))
            }),
        }
    }
}

/// Immutable, ordered category catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCatalog {
    categories: Vec<Category>,
}

impl CategoryCatalog {
    /// Load and validate the catalog file
    ///
    /// # Errors
    /// - `Catalog` when the file is missing, unreadable or malformed
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ClassifierError::catalog(format!(
                "failed to read catalog '{}': {e}",
                path.display()
            ))
        })?;

        let catalog = Self::from_json(&contents).map_err(|e| match e {
            ClassifierError::Catalog(msg) => {
                ClassifierError::catalog(format!("{} ({msg})", path.display()))
            },
            other => other,
        })?;

        info!(
            path = %path.display(),
            categories = catalog.len(),
            "loaded category catalog"
        );
        Ok(catalog)
    }

    /// Parse a catalog from its JSON text
    ///
    /// # Errors
    /// - `Catalog` for invalid JSON, non-integer ids, empty catalogs, negative,
    ///   duplicate or missing ids
    pub fn from_json(json: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(json)
            .map_err(|e| ClassifierError::catalog(format!("malformed catalog JSON: {e}")))?;

        let entries = file
            .breeds
            .into_iter()
            .map(|e| Ok((e.id.resolve()?, e.name)))
            .collect::<Result<Vec<_>>>()?;
        Self::from_entries(entries)
    }

    /// Build a catalog from `(id, canonical name)` pairs in any order
    ///
    /// # Errors
    /// - `Catalog` for empty input, negative, duplicate or missing ids
    pub fn from_entries<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (i64, String)>,
    {
        let entries: Vec<(i64, String)> = entries.into_iter().collect();
        if entries.is_empty() {
            return Err(ClassifierError::catalog("catalog contains no categories"));
        }

        let mut slots: Vec<Option<String>> = vec![None; entries.len()];
        for (raw_id, name) in entries {
            let id = usize::try_from(raw_id)
                .map_err(|_| ClassifierError::catalog(format!("negative category id {raw_id}")))?;
            let slot = slots.get_mut(id).ok_or_else(|| {
                ClassifierError::catalog(format!(
                    "category id {id} is out of range; ids must cover 0..N without gaps"
                ))
            })?;
            if slot.is_some() {
                return Err(ClassifierError::catalog(format!(
                    "duplicate category id {id}"
                )));
            }
            *slot = Some(name);
        }

        let categories = slots
            .into_iter()
            .enumerate()
            .map(|(id, name)| {
                let name = name.ok_or_else(|| {
                    ClassifierError::catalog(format!("category id {id} is missing"))
                })?;
                Ok(Category {
                    id,
                    pretty_name: prettify(&name),
                    name,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { categories })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Category> {
        self.categories.get(index)
    }

    #[must_use]
    pub fn name(&self, index: usize) -> Option<&str> {
        self.get(index).map(|c| c.name.as_str())
    }

    #[must_use]
    pub fn pretty_name(&self, index: usize) -> Option<&str> {
        self.get(index).map(|c| c.pretty_name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter()
    }
}

/// Turn a canonical name into a display name
///
/// `"german_shepherd-dog"` becomes `"German Shepherd Dog"`.
#[must_use]
pub fn prettify(raw_name: &str) -> String {
    raw_name
        .replace(['-', '_'], " ")
        .split_whitespace()
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
