//! Editable text fields of a record form.

use std::fmt;

use crate::models::Record;

/// A field that must be non-blank before submitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequiredField {
    Title,
    DoctorName,
    Specialty,
}

impl RequiredField {
    /// Field label shown next to the inline validation message.
    pub fn label(&self) -> &'static str {
        match self {
            RequiredField::Title => "الاسم",
            RequiredField::DoctorName => "اسم الطبيب",
            RequiredField::Specialty => "التخصص",
        }
    }
}

impl fmt::Display for RequiredField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequiredField::Title => "title",
            RequiredField::DoctorName => "doctor name",
            RequiredField::Specialty => "specialty",
        };
        f.write_str(name)
    }
}

/// Text state of the form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields {
    pub title: String,
    pub doctor_name: String,
    pub specialty: String,
    pub notes: String,
}

impl FormFields {
    /// Fields of a fetched record, with the specialty already normalized.
    pub fn from_record(record: &Record, specialty: String) -> Self {
        Self {
            title: record.title.clone(),
            doctor_name: record.doctor_name.clone(),
            specialty,
            notes: record.notes.clone(),
        }
    }

    /// Required fields that are blank after trimming, in display order.
    pub fn missing(&self) -> Vec<RequiredField> {
        [
            (RequiredField::Title, &self.title),
            (RequiredField::DoctorName, &self.doctor_name),
            (RequiredField::Specialty, &self.specialty),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect()
    }

    /// Copy with surrounding whitespace removed from every field.
    pub fn trimmed(&self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            doctor_name: self.doctor_name.trim().to_string(),
            specialty: self.specialty.trim().to_string(),
            notes: self.notes.trim().to_string(),
        }
    }
}
