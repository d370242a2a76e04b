//! IB-007: The typed node model.
//!
//! Bound nodes are immutable once the binder returns them. Each node keeps
//! a `SyntaxId` back to the block it came from rather than a pointer into
//! the syntax tree, plus the diagnostics raised while binding it.

use super::diagnostics::{Diagnostics, SourceRange};
use super::syntax::{Accessor, Expression, SyntaxId, Traverser};
use super::token::{decompose_token, TokenParts};
use super::traverse::{Traversable, Traversed};
use super::types::Type;
use indexmap::IndexMap;

/// Common capabilities of every bound declaration.
pub trait Node {
    /// Back-reference to the originating block.
    fn syntax(&self) -> SyntaxId;
    fn name(&self) -> &str;
    /// The type a reference to this node evaluates to.
    fn node_type(&self) -> &Type;
}

/// An expression together with its resolved type.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundExpression {
    pub expression: Expression,
    pub ty: Type,
    pub range: SourceRange,
}

/// A bound `name = value` attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundAttribute {
    pub name: String,
    pub value: BoundExpression,
}

// ============================================================================
// Config variables
// ============================================================================

/// A program input whose value comes from stack configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigVariable {
    pub syntax: SyntaxId,
    pub range: SourceRange,
    pub variable_name: String,
    pub ty: Type,
    pub default_value: Option<BoundExpression>,
    /// Set when an earlier declaration already owns this name.
    pub shadowed: bool,
    pub diagnostics: Diagnostics,
}

impl Node for ConfigVariable {
    fn syntax(&self) -> SyntaxId {
        self.syntax
    }

    fn name(&self) -> &str {
        &self.variable_name
    }

    fn node_type(&self) -> &Type {
        &self.ty
    }
}

impl Traversable for ConfigVariable {
    fn traverse(&self, traverser: &Traverser) -> (Traversed, Diagnostics) {
        self.ty.traverse(traverser)
    }

    fn start(&self) -> Traversed {
        Traversed::Type(self.ty.clone())
    }
}

// ============================================================================
// Resources
// ============================================================================

/// One option slot. `Absent` (not written) and `Invalid` (written but
/// rejected) are distinct states.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionSlot<T> {
    Absent,
    Bound(T),
    Invalid,
}

impl<T> Default for OptionSlot<T> {
    fn default() -> Self {
        Self::Absent
    }
}

impl<T> OptionSlot<T> {
    pub fn bound(&self) -> Option<&T> {
        match self {
            Self::Bound(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid)
    }
}

/// A resource's `options` block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceOptions {
    pub syntax_range: SourceRange,
    /// Collection (or count, or condition) to instantiate over.
    pub range: OptionSlot<BoundExpression>,
    /// Explicit provider resource.
    pub provider: OptionSlot<BoundExpression>,
    /// Explicit dependencies.
    pub depends_on: OptionSlot<BoundExpression>,
    pub protect: OptionSlot<BoundExpression>,
    /// Input property paths excluded from diffs.
    pub ignore_changes: OptionSlot<Vec<ResourceProperty>>,
}

impl ResourceOptions {
    /// Every bound option expression, in slot order.
    pub fn expressions(&self) -> impl Iterator<Item = &BoundExpression> {
        [&self.range, &self.provider, &self.depends_on, &self.protect]
            .into_iter()
            .filter_map(OptionSlot::bound)
    }
}

/// A resource instantiation.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub syntax: SyntaxId,
    pub range: SourceRange,
    pub name: String,
    /// The type token as written.
    pub token: String,
    pub token_range: SourceRange,
    /// Always `Any` or an object type.
    pub input_type: Type,
    /// Always `Any` or an object type.
    pub output_type: Type,
    /// What a reference to the resource evaluates to; differs from
    /// `output_type` when the resource is ranged.
    pub variable_type: Type,
    /// Input attributes in source order.
    pub inputs: Vec<BoundAttribute>,
    pub options: Option<ResourceOptions>,
    pub shadowed: bool,
    pub diagnostics: Diagnostics,
}

impl Resource {
    /// Decompose this resource's token, reporting malformed tokens at the
    /// token's source range.
    pub fn decompose_token(&self) -> (TokenParts, Diagnostics) {
        decompose_token(&self.token, self.token_range)
    }

    pub fn input(&self, name: &str) -> Option<&BoundAttribute> {
        self.inputs.iter().find(|a| a.name == name)
    }

    /// Whether the type token resolved against the schema.
    pub fn is_resolved(&self) -> bool {
        !self.output_type.is_any()
    }
}

impl Node for Resource {
    fn syntax(&self) -> SyntaxId {
        self.syntax
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn node_type(&self) -> &Type {
        &self.variable_type
    }
}

impl Traversable for Resource {
    fn traverse(&self, traverser: &Traverser) -> (Traversed, Diagnostics) {
        self.variable_type.traverse(traverser)
    }

    fn start(&self) -> Traversed {
        Traversed::Type(self.variable_type.clone())
    }
}

// ============================================================================
// Properties
// ============================================================================

/// A resolved property path. Traversing one yields a new property with the
/// accessor appended; the original is never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceProperty {
    pub path: Vec<Traverser>,
    pub property_type: Type,
}

impl ResourceProperty {
    /// The empty path rooted at `ty`.
    pub fn root(ty: Type) -> Self {
        Self {
            path: Vec::new(),
            property_type: ty,
        }
    }

    /// Render the path as written (`rules[0].id`).
    pub fn path_string(&self) -> String {
        let mut out = String::new();
        for (i, t) in self.path.iter().enumerate() {
            match &t.accessor {
                Accessor::Attr(name) if i == 0 => out.push_str(name),
                other => out.push_str(&other.to_string()),
            }
        }
        out
    }
}

impl Traversable for ResourceProperty {
    fn traverse(&self, traverser: &Traverser) -> (Traversed, Diagnostics) {
        let (next, diagnostics) = self.property_type.traverse(traverser);
        let mut path = self.path.clone();
        path.push(traverser.clone());
        let property = ResourceProperty {
            path,
            property_type: next.into_type(),
        };
        (Traversed::Property(property), diagnostics)
    }

    fn start(&self) -> Traversed {
        Traversed::Property(self.clone())
    }
}

// ============================================================================
// Program
// ============================================================================

/// Either kind of top-level declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundNode {
    Config(ConfigVariable),
    Resource(Resource),
}

impl BoundNode {
    pub fn range(&self) -> SourceRange {
        match self {
            Self::Config(c) => c.range,
            Self::Resource(r) => r.range,
        }
    }

    pub fn is_shadowed(&self) -> bool {
        match self {
            Self::Config(c) => c.shadowed,
            Self::Resource(r) => r.shadowed,
        }
    }

    pub(crate) fn set_shadowed(&mut self) {
        match self {
            Self::Config(c) => c.shadowed = true,
            Self::Resource(r) => r.shadowed = true,
        }
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        match self {
            Self::Config(c) => &c.diagnostics,
            Self::Resource(r) => &r.diagnostics,
        }
    }

    pub(crate) fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        match self {
            Self::Config(c) => &mut c.diagnostics,
            Self::Resource(r) => &mut r.diagnostics,
        }
    }

    pub fn as_resource(&self) -> Option<&Resource> {
        match self {
            Self::Resource(r) => Some(r),
            Self::Config(_) => None,
        }
    }

    pub fn as_config(&self) -> Option<&ConfigVariable> {
        match self {
            Self::Config(c) => Some(c),
            Self::Resource(_) => None,
        }
    }

    /// Every bound expression owned by this node.
    pub fn expressions(&self) -> Vec<&BoundExpression> {
        match self {
            Self::Config(c) => c.default_value.iter().collect(),
            Self::Resource(r) => {
                let mut out: Vec<&BoundExpression> = r.inputs.iter().map(|a| &a.value).collect();
                if let Some(opts) = &r.options {
                    out.extend(opts.expressions());
                }
                out
            }
        }
    }
}

impl Node for BoundNode {
    fn syntax(&self) -> SyntaxId {
        match self {
            Self::Config(c) => c.syntax(),
            Self::Resource(r) => r.syntax(),
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::Config(c) => c.name(),
            Self::Resource(r) => r.name(),
        }
    }

    fn node_type(&self) -> &Type {
        match self {
            Self::Config(c) => c.node_type(),
            Self::Resource(r) => r.node_type(),
        }
    }
}

impl Traversable for BoundNode {
    fn traverse(&self, traverser: &Traverser) -> (Traversed, Diagnostics) {
        match self {
            Self::Config(c) => c.traverse(traverser),
            Self::Resource(r) => r.traverse(traverser),
        }
    }

    fn start(&self) -> Traversed {
        match self {
            Self::Config(c) => c.start(),
            Self::Resource(r) => r.start(),
        }
    }
}

/// The result of binding a whole program.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundProgram {
    /// Nodes in source order, shadowed duplicates included.
    pub nodes: Vec<BoundNode>,
    /// Name → index of the first declaration with that name.
    pub scope: IndexMap<String, usize>,
    /// All diagnostics, sorted by source position.
    pub diagnostics: Diagnostics,
}

impl BoundProgram {
    /// The declaration that owns `name`.
    pub fn lookup(&self, name: &str) -> Option<&BoundNode> {
        self.scope.get(name).and_then(|&i| self.nodes.get(i))
    }

    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.nodes.iter().filter_map(BoundNode::as_resource)
    }

    pub fn config_variables(&self) -> impl Iterator<Item = &ConfigVariable> {
        self.nodes.iter().filter_map(BoundNode::as_config)
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::syntax::{parse_property_path, Key};
    use crate::core::traverse::traverse_all;
    use crate::core::types::ObjectKind;

    fn rules_type() -> Type {
        let rule = Type::object(
            None,
            ObjectKind::Plain,
            IndexMap::from([("id".to_string(), Type::String)]),
        );
        Type::object(
            Some("x:index:Thing"),
            ObjectKind::Plain,
            IndexMap::from([("rules".to_string(), Type::list(rule))]),
        )
    }

    #[test]
    fn test_ib007_property_extends_path() {
        let root = ResourceProperty::root(rules_type());
        let path = parse_property_path("rules[0].id", SourceRange::default()).unwrap();
        let (prop, diags) = traverse_all(&root, &path);
        assert!(diags.is_empty());
        match prop {
            Traversed::Property(p) => {
                assert_eq!(p.path.len(), 3);
                assert_eq!(p.property_type, Type::String);
                assert_eq!(p.path_string(), "rules[0].id");
            }
            other => panic!("expected property, got {:?}", other),
        }
        assert!(root.path.is_empty());
    }

    #[test]
    fn test_ib007_property_failing_step_keeps_path() {
        let root = ResourceProperty::root(rules_type());
        let (first, _) = root.traverse(&Traverser::attr("missing", SourceRange::default()));
        let (second, diags) = first.traverse(&Traverser::index(Key::Int(0), SourceRange::default()));
        assert!(diags.is_empty());
        match second {
            Traversed::Property(p) => {
                assert_eq!(p.path_string(), "missing[0]");
                assert_eq!(p.property_type, Type::Any);
            }
            other => panic!("expected property, got {:?}", other),
        }
    }

    #[test]
    fn test_ib007_option_slot_states() {
        let absent: OptionSlot<i32> = OptionSlot::default();
        assert!(absent.is_absent());
        assert!(absent.bound().is_none());
        let invalid: OptionSlot<i32> = OptionSlot::Invalid;
        assert!(invalid.is_invalid());
        assert!(!invalid.is_absent());
        assert_eq!(OptionSlot::Bound(3).bound(), Some(&3));
    }

    #[test]
    fn test_ib007_config_traverses_its_type() {
        let cv = ConfigVariable {
            syntax: SyntaxId(0),
            range: SourceRange::default(),
            variable_name: "names".to_string(),
            ty: Type::list(Type::String),
            default_value: None,
            shadowed: false,
            diagnostics: Diagnostics::new(),
        };
        let (t, diags) = cv.traverse(&Traverser::index(Key::Int(2), SourceRange::default()));
        assert!(diags.is_empty());
        assert_eq!(t.into_type(), Type::String);
        assert_eq!(cv.name(), "names");
    }
}
