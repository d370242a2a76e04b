//! IB-002: The bound type system.
//!
//! Types are resolved eagerly at bind time. Resource types are not known
//! ahead of time: object types come from package schemas and carry the
//! schema token they were resolved from. `Type::Any` is the degraded type
//! assigned whenever resolution fails.

use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// A resolved type.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    /// The universal permissive type.
    Any,
    Bool,
    Int,
    Number,
    String,
    List(Box<Type>),
    Map(Box<Type>),
    Object(Arc<ObjectType>),
}

/// What an object type describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// A schema object type or an object literal.
    Plain,
    /// The outputs of a resource.
    Resource,
    /// The outputs of a provider resource.
    Provider,
}

/// An object type: ordered named properties.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectType {
    /// Schema token, `None` for object literals.
    pub token: Option<String>,
    pub kind: ObjectKind,
    pub properties: IndexMap<String, Type>,
}

impl Type {
    pub fn list(element: Type) -> Self {
        Self::List(Box::new(element))
    }

    pub fn map(element: Type) -> Self {
        Self::Map(Box::new(element))
    }

    pub fn object(token: Option<&str>, kind: ObjectKind, properties: IndexMap<String, Type>) -> Self {
        Self::Object(Arc::new(ObjectType {
            token: token.map(str::to_string),
            kind,
            properties,
        }))
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }

    pub fn as_object(&self) -> Option<&ObjectType> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    /// True for values that denote a resource (or provider) instance.
    pub fn is_resource(&self) -> bool {
        matches!(self, Self::Object(o) if o.kind != ObjectKind::Plain)
    }

    pub fn is_provider(&self) -> bool {
        matches!(self, Self::Object(o) if o.kind == ObjectKind::Provider)
    }

    /// Whether a value of type `from` may be used where `self` is expected.
    pub fn assignable_from(&self, from: &Type) -> bool {
        match (self, from) {
            (Self::Any, _) | (_, Self::Any) => true,
            (Self::Bool, Self::Bool) | (Self::Int, Self::Int) | (Self::String, Self::String) => true,
            (Self::Number, Self::Number | Self::Int) => true,
            // Primitives convert to strings implicitly.
            (Self::String, Self::Bool | Self::Int | Self::Number) => true,
            (Self::List(to), Self::List(el)) => to.assignable_from(el),
            (Self::Map(to), Self::Map(el)) => to.assignable_from(el),
            (Self::Map(to), Self::Object(obj)) if obj.token.is_none() => {
                obj.properties.values().all(|t| to.assignable_from(t))
            }
            (Self::Object(to), Self::Object(obj)) => match (&to.token, &obj.token) {
                (Some(a), Some(b)) => a == b,
                _ => obj.properties.iter().all(|(name, t)| {
                    to.properties
                        .get(name)
                        .is_some_and(|expected| expected.assignable_from(t))
                }),
            },
            _ => false,
        }
    }

    /// The narrowest type both `self` and `other` are assignable to, or `Any`.
    pub fn unify(&self, other: &Type) -> Type {
        if self == other {
            return self.clone();
        }
        match (self, other) {
            (Self::Int, Self::Number) | (Self::Number, Self::Int) => Self::Number,
            (Self::List(a), Self::List(b)) => Self::list(a.unify(b)),
            (Self::Map(a), Self::Map(b)) => Self::map(a.unify(b)),
            _ => Self::Any,
        }
    }

    /// Parse a config type annotation: `string`, `int`, `number`, `bool`,
    /// `any`, `list(T)`, `map(T)`.
    pub fn parse_annotation(text: &str) -> Result<Type, String> {
        let text = text.trim();
        match text {
            "any" => return Ok(Self::Any),
            "bool" => return Ok(Self::Bool),
            "int" => return Ok(Self::Int),
            "number" => return Ok(Self::Number),
            "string" => return Ok(Self::String),
            _ => {}
        }
        let (ctor, rest) = text
            .split_once('(')
            .ok_or_else(|| format!("unknown type '{}'", text))?;
        let inner = rest
            .strip_suffix(')')
            .ok_or_else(|| format!("unclosed type constructor in '{}'", text))?;
        let element = Self::parse_annotation(inner)?;
        match ctor.trim() {
            "list" => Ok(Self::list(element)),
            "map" => Ok(Self::map(element)),
            other => Err(format!("unknown type constructor '{}'", other)),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "any"),
            Self::Bool => write!(f, "bool"),
            Self::Int => write!(f, "int"),
            Self::Number => write!(f, "number"),
            Self::String => write!(f, "string"),
            Self::List(el) => write!(f, "list({})", el),
            Self::Map(el) => write!(f, "map({})", el),
            Self::Object(obj) => match &obj.token {
                Some(token) => write!(f, "{}", token),
                None => {
                    let props: Vec<String> = obj
                        .properties
                        .iter()
                        .map(|(k, v)| format!("{}={}", k, v))
                        .collect();
                    write!(f, "object({{{}}})", props.join(", "))
                }
            },
        }
    }
}
