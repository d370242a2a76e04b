//! Core binding pipeline — syntax, types, schema lookup, binding, traversal.

pub mod binder;
pub mod diagnostics;
pub mod model;
pub mod resolver;
pub mod schema;
pub mod syntax;
pub mod token;
pub mod traverse;
pub mod types;
