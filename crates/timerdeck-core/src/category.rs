//! Category identifiers and the category registry.
//!
//! Categories are append-only: they can be added but never renamed or
//! removed. Uniqueness is case-insensitive, so "Work" and "work" are the
//! same category; the casing of the first add wins for display.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Typed category identifier.
///
/// Wraps the trimmed display name. Equality and hashing fold case, so two
/// ids that differ only in casing compare equal and collide in maps.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(String);

impl CategoryId {
    /// Build an id from raw user input. Trims whitespace; blank input is a
    /// validation error.
    pub fn new(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyField { field: "category" });
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn folded(&self) -> String {
        self.0.to_lowercase()
    }
}

impl PartialEq for CategoryId {
    fn eq(&self, other: &Self) -> bool {
        self.folded() == other.folded()
    }
}

impl Eq for CategoryId {}

impl Hash for CategoryId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.folded().hash(state);
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered sequence of unique category names.
///
/// Persisted independently of the timer collection, as a JSON array of
/// strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryRegistry {
    names: Vec<CategoryId>,
}

impl CategoryRegistry {
    /// Validate and append a category. Rejects blank input and
    /// case-insensitive duplicates without changing the registry.
    pub fn add(&mut self, raw: &str) -> Result<CategoryId, ValidationError> {
        let id = CategoryId::new(raw)?;
        if self.names.contains(&id) {
            return Err(ValidationError::DuplicateCategory(id.as_str().to_string()));
        }
        self.names.push(id.clone());
        Ok(id)
    }

    /// The registered id equal to `probe`, in its original casing.
    pub fn canonical(&self, probe: &CategoryId) -> Option<&CategoryId> {
        self.names.iter().find(|id| *id == probe)
    }

    pub fn contains(&self, id: &CategoryId) -> bool {
        self.names.contains(id)
    }

    pub fn names(&self) -> &[CategoryId] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Drop case-insensitive duplicates, keeping the first occurrence.
    /// Applied after rehydration in case a stored list predates validation.
    pub fn dedup(&mut self) {
        let mut seen: Vec<CategoryId> = Vec::with_capacity(self.names.len());
        self.names.retain(|id| {
            if seen.contains(id) {
                false
            } else {
                seen.push(id.clone());
                true
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_trims_whitespace() {
        let mut registry = CategoryRegistry::default();
        let id = registry.add("  Work  ").unwrap();
        assert_eq!(id.as_str(), "Work");
        assert_eq!(registry.names()[0].as_str(), "Work");
    }

    #[test]
    fn add_rejects_blank() {
        let mut registry = CategoryRegistry::default();
        assert_eq!(
            registry.add("   "),
            Err(ValidationError::EmptyField { field: "category" })
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn add_rejects_case_insensitive_duplicate() {
        let mut registry = CategoryRegistry::default();
        registry.add("Work").unwrap();
        assert_eq!(
            registry.add("work"),
            Err(ValidationError::DuplicateCategory("work".to_string()))
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn insertion_order_is_preserved() {
        let mut registry = CategoryRegistry::default();
        for name in ["Work", "Home", "Gym"] {
            registry.add(name).unwrap();
        }
        let names: Vec<&str> = registry.names().iter().map(CategoryId::as_str).collect();
        assert_eq!(names, vec!["Work", "Home", "Gym"]);
    }

    #[test]
    fn canonical_returns_first_casing() {
        let mut registry = CategoryRegistry::default();
        registry.add("Work").unwrap();
        let probe = CategoryId::new("WORK").unwrap();
        assert_eq!(registry.canonical(&probe).unwrap().as_str(), "Work");
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let raw = r#"["Work", "work", "Home", "WORK"]"#;
        let mut registry: CategoryRegistry = serde_json::from_str(raw).unwrap();
        registry.dedup();
        let names: Vec<&str> = registry.names().iter().map(CategoryId::as_str).collect();
        assert_eq!(names, vec!["Work", "Home"]);
    }

    #[test]
    fn serializes_as_plain_string_array() {
        let mut registry = CategoryRegistry::default();
        registry.add("Work").unwrap();
        registry.add("Home").unwrap();
        let json = serde_json::to_string(&registry).unwrap();
        assert_eq!(json, r#"["Work","Home"]"#);
    }
}
