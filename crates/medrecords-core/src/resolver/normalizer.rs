//! Specialty text normalizer.
//!
//! Handles:
//! - Orthographic tolerance (trailing ة / ه, surrounding whitespace)
//! - Alias expansion (free-text names the backend uses for a catalog entry)
//! - Catalog id lookup with a fallback id for unresolved text

use std::collections::HashMap;
use std::sync::Arc;

use crate::models::{specialty_key, SpecialtyCatalog, SpecialtyEntry, FALLBACK_SPECIALTY_ID};

/// Normalizer for specialty strings.
#[derive(Debug, Clone)]
pub struct SpecialtyNormalizer {
    catalog: Arc<SpecialtyCatalog>,
    /// Alias map: tolerant key → canonical catalog name
    aliases: HashMap<String, String>,
    fallback_id: u32,
}

impl Default for SpecialtyNormalizer {
    fn default() -> Self {
        Self::new(SpecialtyCatalog::standard())
    }
}

impl SpecialtyNormalizer {
    /// Create a normalizer over `catalog` with the standard fallback id.
    pub fn new(catalog: SpecialtyCatalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
            aliases: HashMap::new(),
            fallback_id: FALLBACK_SPECIALTY_ID,
        }
    }

    /// Override the id sent for unresolved specialties.
    pub fn with_fallback_id(mut self, fallback_id: u32) -> Self {
        self.fallback_id = fallback_id;
        self
    }

    pub fn catalog(&self) -> &SpecialtyCatalog {
        &self.catalog
    }

    pub fn fallback_id(&self) -> u32 {
        self.fallback_id
    }

    /// Catalog entry behind the fallback id, if the catalog has one.
    pub fn fallback_entry(&self) -> Option<&SpecialtyEntry> {
        self.catalog.entries().iter().find(|e| e.id == self.fallback_id)
    }

    /// Find the catalog entry `raw` refers to, if any.
    pub fn resolve(&self, raw: &str) -> Option<&SpecialtyEntry> {
        if let Some(entry) = self.catalog.find_tolerant(raw) {
            return Some(entry);
        }
        self.aliases
            .get(&specialty_key(raw))
            .and_then(|canonical| self.catalog.get(canonical))
    }

    /// Canonical catalog name for `raw`, or `raw` unchanged when unresolved.
    pub fn normalize(&self, raw: &str) -> String {
        match self.resolve(raw) {
            Some(entry) => entry.name.clone(),
            None => raw.to_string(),
        }
    }

    /// Catalog id to submit for `raw`.
    pub fn specialty_id(&self, raw: &str) -> u32 {
        self.resolve(raw)
            .map(|entry| entry.id)
            .unwrap_or(self.fallback_id)
    }

    /// Add a custom alias mapping.
    ///
    /// Ignored when `canonical` is not a catalog name.
    pub fn add_alias(&mut self, alias: &str, canonical: &str) {
        if self.catalog.get(canonical).is_none() {
            tracing::warn!(alias, canonical, "alias target not in specialty catalog");
            return;
        }
        self.aliases
            .insert(specialty_key(alias), canonical.to_string());
    }
}
