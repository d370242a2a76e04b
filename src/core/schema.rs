//! IB-005: Schema registry — resolves type tokens to resource descriptors.
//!
//! The binder only sees the `SchemaRegistry` trait. `Registry` is the
//! in-memory implementation, built from package specs in the usual package
//! schema shape (`resources`, `types`, `provider`, properties with `type`,
//! `items`, `additionalProperties` or `$ref`). The registry is read-only
//! once binding starts and is shared between binding threads.

use super::token::DEFAULT_MODULE;
use super::types::{ObjectKind, Type};
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

/// Package that owns provider tokens (`pulumi:providers:<pkg>`).
pub const PROVIDERS_PACKAGE: &str = "pulumi";
pub const PROVIDERS_MODULE: &str = "providers";

/// What the binder needs to know about a resource type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    pub token: String,
    pub kind: ObjectKind,
    pub input_type: Type,
    pub output_type: Type,
}

/// Read-only schema lookup consumed by the binder.
pub trait SchemaRegistry: Send + Sync {
    /// Resolve a decomposed token to a resource descriptor.
    fn lookup_type(&self, package: &str, module: &str, type_name: &str) -> Option<&TypeDescriptor>;

    /// The canonical module path for a package module (`aws/s3`, or just
    /// `aws` for the package root).
    fn module_path(&self, package: &str, module: &str) -> String;
}

/// Normalize a module token: drop any `/suffix` and map `index` to the root.
pub fn module_name(module: &str) -> &str {
    let name = module.split('/').next().unwrap_or_default();
    if name == DEFAULT_MODULE {
        ""
    } else {
        name
    }
}

/// The normalized module of a full `package:module:Type` token.
pub fn token_module(token: &str) -> Option<&str> {
    let mut parts = token.split(':');
    let _package = parts.next()?;
    let module = parts.next()?;
    parts.next()?;
    Some(module_name(module))
}

/// Errors converting a package spec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("package {package:?}: property {property:?} has unknown type {type_name:?}")]
    UnknownPrimitive {
        package: String,
        property: String,
        type_name: String,
    },
    #[error("package {package:?}: property {property:?} has neither a type nor a $ref")]
    MissingType { package: String, property: String },
    #[error("package {package:?}: reference {reference:?} does not name a type in this package")]
    DanglingRef { package: String, reference: String },
}

// ============================================================================
// Package spec (serde)
// ============================================================================

/// A package schema document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageSpec {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub resources: IndexMap<String, ResourceSpec>,
    #[serde(default)]
    pub types: IndexMap<String, ObjectTypeSpec>,
    #[serde(default)]
    pub provider: Option<ResourceSpec>,
}

/// A resource (or provider) declaration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSpec {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub input_properties: IndexMap<String, PropertySpec>,
    #[serde(default)]
    pub properties: IndexMap<String, PropertySpec>,
}

/// A named object type.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectTypeSpec {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub properties: IndexMap<String, PropertySpec>,
}

/// A property's type.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertySpec {
    #[serde(rename = "type", default)]
    pub type_name: Option<String>,
    #[serde(default)]
    pub items: Option<Box<PropertySpec>>,
    #[serde(default)]
    pub additional_properties: Option<Box<PropertySpec>>,
    #[serde(rename = "$ref", default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

// ============================================================================
// Bound package
// ============================================================================

/// A package with every property type resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct Package {
    pub name: String,
    /// Resources keyed by token, in schema order.
    pub resources: IndexMap<String, TypeDescriptor>,
    /// Object types keyed by token, in schema order.
    pub types: IndexMap<String, Type>,
    pub provider: Option<TypeDescriptor>,
}

impl Package {
    /// Resolve every property type of `spec`.
    pub fn from_spec(spec: &PackageSpec) -> Result<Self, SchemaError> {
        let mut binder = SpecBinder {
            spec,
            resolved: IndexMap::new(),
            in_progress: HashSet::new(),
        };

        let mut types = IndexMap::new();
        for token in spec.types.keys() {
            types.insert(token.clone(), binder.object_type(token)?);
        }

        let mut resources = IndexMap::new();
        for (token, res) in &spec.resources {
            let desc = binder.resource(token, res, ObjectKind::Resource)?;
            resources.insert(token.clone(), desc);
        }

        let provider = match &spec.provider {
            Some(res) => {
                let token = format!("{}:{}:{}", PROVIDERS_PACKAGE, PROVIDERS_MODULE, spec.name);
                Some(binder.resource(&token, res, ObjectKind::Provider)?)
            }
            None => None,
        };

        Ok(Self {
            name: spec.name.clone(),
            resources,
            types,
            provider,
        })
    }

    /// Find a resource by module and type name, ignoring the `/suffix` of
    /// the schema's module token.
    fn find_resource(&self, module: &str, type_name: &str) -> Option<&TypeDescriptor> {
        let wanted = module_name(module);
        self.resources.iter().find_map(|(token, desc)| {
            let mut parts = token.splitn(3, ':');
            let _package = parts.next()?;
            let m = parts.next()?;
            let t = parts.next()?;
            (t == type_name && module_name(m) == wanted).then_some(desc)
        })
    }
}

struct SpecBinder<'a> {
    spec: &'a PackageSpec,
    resolved: IndexMap<String, Type>,
    in_progress: HashSet<String>,
}

impl SpecBinder<'_> {
    fn resource(&mut self, token: &str, res: &ResourceSpec, kind: ObjectKind) -> Result<TypeDescriptor, SchemaError> {
        let inputs = self.properties(&res.input_properties)?;
        let mut outputs = IndexMap::from([
            ("id".to_string(), Type::String),
            ("urn".to_string(), Type::String),
        ]);
        outputs.extend(self.properties(&res.properties)?);

        Ok(TypeDescriptor {
            token: token.to_string(),
            kind,
            input_type: Type::object(Some(token), ObjectKind::Plain, inputs),
            output_type: Type::object(Some(token), kind, outputs),
        })
    }

    fn properties(&mut self, props: &IndexMap<String, PropertySpec>) -> Result<IndexMap<String, Type>, SchemaError> {
        let mut out = IndexMap::with_capacity(props.len());
        for (name, prop) in props {
            out.insert(name.clone(), self.property(name, prop)?);
        }
        Ok(out)
    }

    fn property(&mut self, name: &str, prop: &PropertySpec) -> Result<Type, SchemaError> {
        if let Some(reference) = &prop.reference {
            return self.reference(reference);
        }
        let type_name = prop.type_name.as_deref().ok_or_else(|| SchemaError::MissingType {
            package: self.spec.name.clone(),
            property: name.to_string(),
        })?;
        match type_name {
            "string" => Ok(Type::String),
            "integer" => Ok(Type::Int),
            "number" => Ok(Type::Number),
            "boolean" => Ok(Type::Bool),
            "array" => match &prop.items {
                Some(items) => Ok(Type::list(self.property(name, items)?)),
                None => Ok(Type::list(Type::Any)),
            },
            "object" => match &prop.additional_properties {
                Some(el) => Ok(Type::map(self.property(name, el)?)),
                None => Ok(Type::map(Type::Any)),
            },
            other => Err(SchemaError::UnknownPrimitive {
                package: self.spec.name.clone(),
                property: name.to_string(),
                type_name: other.to_string(),
            }),
        }
    }

    fn reference(&mut self, reference: &str) -> Result<Type, SchemaError> {
        if reference.starts_with("pulumi.json#/") {
            // Any, Archive, Asset and friends have no structure to traverse.
            return Ok(Type::Any);
        }
        let token = reference
            .strip_prefix("#/types/")
            .filter(|t| self.spec.types.contains_key(*t))
            .ok_or_else(|| SchemaError::DanglingRef {
                package: self.spec.name.clone(),
                reference: reference.to_string(),
            })?;
        self.object_type(token)
    }

    fn object_type(&mut self, token: &str) -> Result<Type, SchemaError> {
        if let Some(t) = self.resolved.get(token) {
            return Ok(t.clone());
        }
        // A type that refers back to itself degrades to any at the cycle.
        if !self.in_progress.insert(token.to_string()) {
            return Ok(Type::Any);
        }
        let spec = self.spec;
        let properties = match spec.types.get(token) {
            Some(obj) => self.properties(&obj.properties)?,
            None => IndexMap::new(),
        };
        self.in_progress.remove(token);
        let ty = Type::object(Some(token), ObjectKind::Plain, properties);
        self.resolved.insert(token.to_string(), ty.clone());
        Ok(ty)
    }
}

// ============================================================================
// Registry
// ============================================================================

/// In-memory registry of bound packages.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    packages: IndexMap<String, Package>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_package(&mut self, package: Package) {
        self.packages.insert(package.name.clone(), package);
    }

    pub fn package(&self, name: &str) -> Option<&Package> {
        self.packages.get(name)
    }

    pub fn packages(&self) -> impl Iterator<Item = &Package> {
        self.packages.values()
    }
}

impl SchemaRegistry for Registry {
    fn lookup_type(&self, package: &str, module: &str, type_name: &str) -> Option<&TypeDescriptor> {
        if package == PROVIDERS_PACKAGE && module == PROVIDERS_MODULE {
            return self.packages.get(type_name)?.provider.as_ref();
        }
        let pkg = self.packages.get(package)?;
        let token = format!("{}:{}:{}", package, module, type_name);
        pkg.resources
            .get(&token)
            .or_else(|| pkg.find_resource(module, type_name))
    }

    fn module_path(&self, package: &str, module: &str) -> String {
        match (package, module_name(module)) {
            (p, "") => p.to_string(),
            ("", m) => m.to_string(),
            (p, m) => format!("{}/{}", p, m),
        }
    }
}

/// Parse and bind a package schema from a YAML (or JSON) string.
pub fn parse_package(yaml: &str) -> Result<Package, String> {
    let spec: PackageSpec =
        serde_yaml_ng::from_str(yaml).map_err(|e| format!("schema parse error: {}", e))?;
    Package::from_spec(&spec).map_err(|e| e.to_string())
}

/// Load a package schema from disk.
pub fn load_package_file(path: &Path) -> Result<Package, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    parse_package(&content)
}
