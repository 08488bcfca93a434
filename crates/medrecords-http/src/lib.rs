//! REST transport for the medical-records client.
//!
//! [`HttpBackend`] implements [`medrecords_core::backend::RecordsBackend`]
//! over `reqwest`. Paths live in [`endpoints`], response decoding in
//! [`decode`].

pub mod client;
pub mod decode;
pub mod endpoints;

pub use client::HttpBackend;
pub use decode::{DecodeError, DecodeResult};
pub use endpoints::Endpoints;
