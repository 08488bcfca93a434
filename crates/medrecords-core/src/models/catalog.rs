//! Specialty catalog models.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Catalog id sent when a specialty does not resolve to any entry.
pub const FALLBACK_SPECIALTY_ID: u32 = 1;

/// A canonical specialty name and its stable numeric id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpecialtyEntry {
    /// Stable identifier sent as `specialtyId`
    pub id: u32,
    /// Canonical Arabic name
    pub name: String,
}

impl SpecialtyEntry {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Closed set of medical specialties known at build time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecialtyCatalog {
    entries: Vec<SpecialtyEntry>,
}

impl Default for SpecialtyCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl SpecialtyCatalog {
    /// Create a catalog from explicit entries.
    pub fn new(entries: Vec<SpecialtyEntry>) -> Self {
        Self { entries }
    }

    /// The catalog the backend's `specialtyId` values refer to.
    pub fn standard() -> Self {
        let names = [
            (1, "باطنه"),
            (2, "قلب"),
            (3, "جراحة"),
            (4, "أطفال"),
            (5, "نساء وتوليد"),
            (6, "عيون"),
            (7, "أنف وأذن وحنجرة"),
            (8, "جلدية"),
            (9, "عظام"),
            (10, "مسالك بولية"),
            (11, "طب أعصاب"),
            (12, "طب نفسي"),
            (13, "غدد صماء"),
            (14, "أورام"),
            (15, "جهاز هضمي"),
            (16, "تخدير"),
            (17, "طب طوارئ"),
            (18, "رعاية مركزة"),
            (19, "طب أسنان"),
            (20, "أشعة"),
            (21, "مستشفي"),
            (22, "صيدليه"),
        ];
        Self::new(
            names
                .into_iter()
                .map(|(id, name)| SpecialtyEntry::new(id, name))
                .collect(),
        )
    }

    /// All entries in catalog order (the order of the specialty picker).
    pub fn entries(&self) -> &[SpecialtyEntry] {
        &self.entries
    }

    /// Canonical names in catalog order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Exact lookup by canonical name.
    pub fn get(&self, name: &str) -> Option<&SpecialtyEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Lookup by the tolerant key (see [`specialty_key`]).
    pub fn find_tolerant(&self, raw: &str) -> Option<&SpecialtyEntry> {
        let key = specialty_key(raw);
        if key.is_empty() {
            return None;
        }
        self.entries.iter().find(|e| specialty_key(&e.name) == key)
    }

    /// Check that no two entries collide under the tolerant key.
    pub fn is_tolerant_unique(&self) -> bool {
        let mut seen = HashSet::new();
        self.entries.iter().all(|e| seen.insert(specialty_key(&e.name)))
    }
}

/// Comparison key for specialty text: trimmed, with a trailing taa marbuta
/// (ة) folded to haa (ه).
pub fn specialty_key(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.strip_suffix('ة') {
        Some(stem) => format!("{stem}ه"),
        None => trimmed.to_string(),
    }
}
