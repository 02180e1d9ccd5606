//! The BARCH container: versioned layout constants and framing.

pub mod container;
pub mod schema;

pub use container::{frame, Container, Header};
pub use schema::FormatSchema;
