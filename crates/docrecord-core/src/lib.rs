//! Core engine: schema-validated models, relations, composable scopes, and
//! the callback-wrapped persistence pipeline over a pluggable document store.

pub mod db;
pub mod error;
pub mod model;
pub mod names;
pub mod schema;
pub mod store;
pub mod value;


pub use error::Error;
