//! Schema types: the basic type table and the schema node model

pub mod basic;
pub mod schema;

pub use basic::basic_type;
pub use schema::{Definitions, Schema, SchemaKind};
