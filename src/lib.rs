//! infrabind — typed binding for declarative infrastructure programs.
//!
//! Syntax blocks are bound against package schemas into a typed model.
//! Bad input degrades to `any` with a diagnostic instead of failing.
//! Per-language adapters describe the model (doc links, type strings, names).

pub mod cli;
pub mod core;
pub mod languages;
