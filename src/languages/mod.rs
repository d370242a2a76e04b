//! Language descriptor adapters — doc links, type strings and naming for
//! each target language.
//!
//! Each adapter implements `DocLanguageHelper`:
//! 1. doc links for resource, input/output, function and built-in types
//! 2. a language type string for a schema type, given module contexts
//! 3. property and lookup-result naming conventions
//!
//! Module contexts are computed once per package and passed in by the
//! caller, so a single adapter value can serve many packages and threads.

pub mod dotnet;
pub mod go;
pub mod nodejs;
pub mod python;

use crate::core::schema::{token_module, Package};
use crate::core::types::Type;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Failures producing a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    #[error("cannot calculate type string for type {type_name:?}: no module context for module {module:?}")]
    MissingModuleContext { module: String, type_name: String },
}

/// Supported target languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Go,
    Nodejs,
    Python,
    Dotnet,
}

impl Language {
    pub const ALL: [Language; 4] = [Language::Go, Language::Nodejs, Language::Python, Language::Dotnet];

    /// The adapter for this language.
    pub fn helper(self) -> Box<dyn DocLanguageHelper> {
        match self {
            Language::Go => Box::new(go::GoDocHelper),
            Language::Nodejs => Box::new(nodejs::NodejsDocHelper),
            Language::Python => Box::new(python::PythonDocHelper),
            Language::Dotnet => Box::new(dotnet::DotnetDocHelper),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::Go => write!(f, "go"),
            Language::Nodejs => write!(f, "nodejs"),
            Language::Python => write!(f, "python"),
            Language::Dotnet => write!(f, "dotnet"),
        }
    }
}

/// The types and resources declared by one module of a package.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleContext {
    /// Normalized module name (`""` for the package root).
    pub module: String,
    /// Object type names declared in this module.
    pub types: Vec<String>,
    /// Resource type names declared in this module.
    pub resources: Vec<String>,
}

impl ModuleContext {
    pub fn declares(&self, type_name: &str) -> bool {
        self.types.iter().chain(&self.resources).any(|t| t == type_name)
    }
}

/// Per-module contexts for one package, keyed by normalized module name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleContexts {
    pub package: String,
    modules: IndexMap<String, ModuleContext>,
}

impl ModuleContexts {
    /// Partition every type and resource of `package` by declaring module.
    pub fn from_package(package: &Package) -> Self {
        let mut contexts = Self {
            package: package.name.clone(),
            modules: IndexMap::new(),
        };
        for token in package.types.keys() {
            contexts.entry(token).types.push(token_type_name(token).to_string());
        }
        for token in package.resources.keys().chain(package.provider.as_ref().map(|p| &p.token)) {
            contexts.entry(token).resources.push(token_type_name(token).to_string());
        }
        contexts
    }

    fn entry(&mut self, token: &str) -> &mut ModuleContext {
        let module = token_module(token).unwrap_or_default().to_string();
        self.modules.entry(module.clone()).or_insert_with(|| ModuleContext {
            module,
            ..ModuleContext::default()
        })
    }

    pub fn get(&self, module: &str) -> Option<&ModuleContext> {
        self.modules.get(module)
    }

    pub fn modules(&self) -> impl Iterator<Item = &ModuleContext> {
        self.modules.values()
    }

    /// The context for `module`, or the error every adapter reports when it
    /// is missing.
    pub fn require(&self, module: &str, ty: &Type) -> Result<&ModuleContext, DescriptorError> {
        self.get(module).ok_or_else(|| DescriptorError::MissingModuleContext {
            module: module.to_string(),
            type_name: ty.to_string(),
        })
    }
}

/// Shared descriptor contract implemented once per target language.
pub trait DocLanguageHelper: Send + Sync {
    fn language(&self) -> Language;

    /// Doc link for a resource or type of a provider package.
    fn resource_type_doc_link(&self, package: &str, module: &str, type_name: &str) -> String;

    /// Doc link for the input or output shape of a resource type.
    fn resource_io_doc_link(&self, package: &str, module: &str, type_name: &str, input: bool) -> String;

    /// Doc link for the argument or result type of a function.
    fn function_io_doc_link(&self, package: &str, module: &str, type_name: &str, input: bool) -> String;

    /// Doc link for a language built-in type.
    fn builtin_type_doc_link(&self, type_name: &str) -> String;

    /// Render `ty` the way code in `module` would spell it.
    fn language_type_string(
        &self,
        contexts: &ModuleContexts,
        module: &str,
        ty: &Type,
        input: bool,
        optional: bool,
    ) -> Result<String, DescriptorError>;

    fn property_name(&self, name: &str) -> String;

    /// Name of the result type returned when a resource is looked up.
    fn resource_lookup_result_name(&self, resource_name: &str) -> String;

    fn generate_module_contexts(&self, package: &Package) -> ModuleContexts {
        ModuleContexts::from_package(package)
    }
}

/// Strip pointer/optional markers and keep the last dotted segment.
pub fn normalize_type_name(type_name: &str) -> &str {
    let last = type_name.rsplit('.').next().unwrap_or(type_name);
    last.trim_start_matches('*').trim_end_matches('?')
}

/// The `Type` part of a `package:module:Type` token.
pub fn token_type_name(token: &str) -> &str {
    token.rsplit(':').next().unwrap_or(token)
}

/// Where an object type lives, relative to the module being rendered.
pub(crate) struct ObjectRef<'a> {
    pub name: &'a str,
    /// `None` when the type is declared in the current module.
    pub module: Option<&'a str>,
}

/// Resolve an object type's name and module for rendering from `current`.
/// A type is local only when `current` declares it.
pub(crate) fn object_ref<'a>(token: Option<&'a str>, current: &ModuleContext) -> Option<ObjectRef<'a>> {
    let token = token?;
    let module = token_module(token).unwrap_or_default();
    let name = token_type_name(token);
    let local = module == current.module && current.declares(name);
    Some(ObjectRef {
        name,
        module: (!local).then_some(module),
    })
}

/// Uppercase the first character (`forceDestroy` -> `ForceDestroy`).
pub fn title_case(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Lowercase the first character (`ForceDestroy` -> `forceDestroy`).
pub fn camel_case(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `forceDestroy` -> `force_destroy`, `HTTPServer` -> `http_server`.
pub fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_lower) {
                out.push('_');
            }
        }
        out.extend(c.to_lowercase());
    }
    out
}
