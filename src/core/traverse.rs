//! IB-006: Structural traversal.
//!
//! Every bound node and every type supports the same single-step
//! `traverse`, so a reference like `bucket.corsRules[0].maxAgeSeconds`
//! resolves the same way whether its root is a resource, a config
//! variable, or an intermediate property. Traversal into `any` always
//! succeeds and yields `any`; a failing step reports a diagnostic and
//! continues with `any`.

use super::diagnostics::{Diagnostic, Diagnostics};
use super::model::ResourceProperty;
use super::syntax::{Accessor, Key, Traverser};
use super::types::Type;

/// The result of one traversal step.
#[derive(Debug, Clone, PartialEq)]
pub enum Traversed {
    Type(Type),
    Property(ResourceProperty),
}

impl Traversed {
    /// The type of the traversed value.
    pub fn value_type(&self) -> &Type {
        match self {
            Self::Type(t) => t,
            Self::Property(p) => &p.property_type,
        }
    }

    pub fn into_type(self) -> Type {
        match self {
            Self::Type(t) => t,
            Self::Property(p) => p.property_type,
        }
    }
}

/// Capability to resolve a single structural access into a narrower value.
pub trait Traversable {
    fn traverse(&self, traverser: &Traverser) -> (Traversed, Diagnostics);

    /// The value a zero-step traversal yields.
    fn start(&self) -> Traversed;
}

impl Traversable for Type {
    fn traverse(&self, traverser: &Traverser) -> (Traversed, Diagnostics) {
        let (ty, diagnostic) = step(self, traverser);
        let mut diagnostics = Diagnostics::new();
        if let Some(d) = diagnostic {
            diagnostics.push(d);
        }
        (Traversed::Type(ty), diagnostics)
    }

    fn start(&self) -> Traversed {
        Traversed::Type(self.clone())
    }
}

impl Traversable for Traversed {
    fn traverse(&self, traverser: &Traverser) -> (Traversed, Diagnostics) {
        match self {
            Self::Type(t) => t.traverse(traverser),
            Self::Property(p) => p.traverse(traverser),
        }
    }

    fn start(&self) -> Traversed {
        self.clone()
    }
}

/// Apply `traversal` left to right starting at `root`. Each step may add
/// diagnostics; the walk never stops early.
pub fn traverse_all(root: &dyn Traversable, traversal: &[Traverser]) -> (Traversed, Diagnostics) {
    let mut diagnostics = Diagnostics::new();
    let mut current = root.start();
    for traverser in traversal {
        let (next, diags) = current.traverse(traverser);
        diagnostics.extend(diags);
        current = next;
    }
    (current, diagnostics)
}

/// Resolve one accessor against a type.
fn step(ty: &Type, traverser: &Traverser) -> (Type, Option<Diagnostic>) {
    let fail = |message: String| (Type::Any, Some(Diagnostic::error(traverser.range, message)));

    match (ty, &traverser.accessor) {
        (Type::Any, _) => (Type::Any, None),

        (Type::Object(obj), Accessor::Attr(name) | Accessor::Index(Key::Str(name))) => {
            match obj.properties.get(name) {
                Some(t) => (t.clone(), None),
                None => fail(format!("unknown property '{}' on object type {}", name, ty)),
            }
        }
        (Type::Object(_), Accessor::Index(Key::Int(i))) => {
            fail(format!("cannot index object type {} with number {}", ty, i))
        }

        (Type::List(el), Accessor::Index(Key::Int(i))) => {
            if *i < 0 {
                fail(format!("list index {} must not be negative", i))
            } else {
                ((**el).clone(), None)
            }
        }
        (Type::List(_), Accessor::Index(Key::Str(key))) => {
            fail(format!("cannot index list type {} with string \"{}\"", ty, key))
        }
        (Type::List(_), Accessor::Attr(name)) => {
            fail(format!("cannot access attribute '{}' on list type {}", name, ty))
        }

        (Type::Map(el), _) => ((**el).clone(), None),

        (_, accessor) => fail(format!("cannot traverse value of type {} with '{}'", ty, accessor)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::diagnostics::SourceRange;
    use crate::core::syntax::parse_traversal;
    use crate::core::types::ObjectKind;
    use indexmap::IndexMap;
    use proptest::prelude::*;

    fn steps(path: &str) -> Vec<Traverser> {
        parse_traversal(&format!("root{}", path), SourceRange::line(1, 1)).unwrap().1
    }

    fn bucket_outputs() -> Type {
        let rule = Type::object(
            Some("aws:s3/BucketCorsRule:BucketCorsRule"),
            ObjectKind::Plain,
            IndexMap::from([("maxAgeSeconds".to_string(), Type::Int)]),
        );
        Type::object(
            Some("aws:s3/bucket:Bucket"),
            ObjectKind::Resource,
            IndexMap::from([
                ("arn".to_string(), Type::String),
                ("corsRules".to_string(), Type::list(rule)),
                ("tags".to_string(), Type::map(Type::String)),
            ]),
        )
    }

    #[test]
    fn test_ib006_object_field() {
        let (t, diags) = traverse_all(&bucket_outputs(), &steps(".arn"));
        assert!(diags.is_empty());
        assert_eq!(t.into_type(), Type::String);
    }

    #[test]
    fn test_ib006_nested_path() {
        let (t, diags) = traverse_all(&bucket_outputs(), &steps(".corsRules[0].maxAgeSeconds"));
        assert!(diags.is_empty());
        assert_eq!(t.into_type(), Type::Int);
    }

    #[test]
    fn test_ib006_map_access() {
        let (t, diags) = traverse_all(&bucket_outputs(), &steps(".tags.Owner"));
        assert!(diags.is_empty());
        assert_eq!(t.into_type(), Type::String);
        let (t, diags) = traverse_all(&bucket_outputs(), &steps(".tags[\"Owner\"]"));
        assert!(diags.is_empty());
        assert_eq!(t.into_type(), Type::String);
    }

    #[test]
    fn test_ib006_string_index_on_object() {
        let (t, diags) = traverse_all(&bucket_outputs(), &steps("[\"arn\"]"));
        assert!(diags.is_empty());
        assert_eq!(t.into_type(), Type::String);
    }

    #[test]
    fn test_ib006_unknown_field_continues_as_any() {
        let (t, diags) = traverse_all(&bucket_outputs(), &steps(".nope.deeper[3]"));
        assert_eq!(diags.len(), 1);
        assert!(diags.iter().next().unwrap().message.contains("unknown property 'nope'"));
        assert_eq!(t.into_type(), Type::Any);
    }

    #[test]
    fn test_ib006_each_failing_step_reports() {
        let (_, diags) = traverse_all(&Type::list(Type::String), &steps(".first"));
        assert_eq!(diags.len(), 1);
        let (_, diags) = traverse_all(&Type::list(Type::list(Type::Int)), &steps("[0][\"x\"]"));
        assert_eq!(diags.len(), 1);
        let (_, diags) = traverse_all(&Type::String, &steps(".length"));
        assert!(diags.iter().next().unwrap().message.contains("cannot traverse value of type string"));
    }

    #[test]
    fn test_ib006_negative_list_index() {
        let (t, diags) = traverse_all(&Type::list(Type::Int), &steps("[-1]"));
        assert_eq!(diags.len(), 1);
        assert_eq!(t.into_type(), Type::Any);
    }

    #[test]
    fn test_ib006_zero_steps_yields_root() {
        let (t, diags) = traverse_all(&Type::Bool, &[]);
        assert!(diags.is_empty());
        assert_eq!(t, Traversed::Type(Type::Bool));
    }

    fn accessor() -> impl Strategy<Value = Traverser> {
        prop_oneof![
            "[a-zA-Z_][a-zA-Z0-9_]{0,8}".prop_map(|n| Traverser::attr(&n, SourceRange::default())),
            any::<i64>().prop_map(|i| Traverser::index(Key::Int(i), SourceRange::default())),
            "[a-z]{0,6}".prop_map(|s| Traverser::index(Key::Str(s), SourceRange::default())),
        ]
    }

    proptest! {
        #[test]
        fn prop_ib006_any_is_idempotent(path in prop::collection::vec(accessor(), 0..12)) {
            let (t, diags) = traverse_all(&Type::Any, &path);
            prop_assert!(diags.is_empty());
            prop_assert_eq!(t.into_type(), Type::Any);
        }
    }
}
