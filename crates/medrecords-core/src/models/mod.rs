//! Domain models for the medical records client.

mod catalog;
mod doctor;
mod ids;
mod patient;
mod record;

pub use catalog::*;
pub use doctor::*;
pub use ids::*;
pub use patient::*;
pub use record::*;
