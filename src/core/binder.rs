//! IB-008: Binder — syntax blocks to typed nodes.
//!
//! Binding is eager and never aborts on bad input:
//! 1. declare: decompose tokens, look up schema types, fix config types
//! 2. merge: detect duplicate names (first wins, later ones are shadowed)
//! 3. refine: in source order, resolve each resource's `range` option and
//!    infer the type of each unannotated config from its default, since
//!    both change the type other blocks see when they reference them
//! 4. bodies: type inputs, options and defaults against the full scope
//!
//! Steps 1 and 4 are independent per block and run on the rayon pool when
//! `BindOptions::parallel` is set. Diagnostics are sorted by source
//! position at the end, so both paths produce identical output.

use super::diagnostics::{Diagnostic, Diagnostics, SourceRange};
use super::model::{
    BoundAttribute, BoundExpression, BoundNode, BoundProgram, ConfigVariable, Node, OptionSlot,
    Resource, ResourceOptions, ResourceProperty,
};
use super::schema::SchemaRegistry;
use super::syntax::{parse_property_path, Attribute, Block, Expression, OptionsBlock, Program, SyntaxId, TemplatePart};
use super::token::decompose_token;
use super::traverse::traverse_all;
use super::types::{ObjectKind, Type};
use indexmap::IndexMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const RESOURCE_BLOCK: &str = "resource";
pub const CONFIG_BLOCK: &str = "config";

/// Option names accepted inside a resource's `options` block.
pub const OPTION_NAMES: [&str; 5] = ["range", "provider", "dependsOn", "protect", "ignoreChanges"];

/// Name bound to the current element inside a ranged resource.
pub const RANGE_VARIABLE: &str = "range";

/// Binder settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindOptions {
    /// Fail the whole bind when any resource type is unresolved.
    pub strict: bool,
    /// Bind independent blocks on the rayon thread pool.
    pub parallel: bool,
    /// Maximum expression nesting depth.
    pub max_depth: usize,
}

impl Default for BindOptions {
    fn default() -> Self {
        Self {
            strict: false,
            parallel: false,
            max_depth: 64,
        }
    }
}

/// Strict-mode failure. The bound program is kept so callers can still
/// report its diagnostics.
#[derive(Debug, Error)]
pub enum BindError {
    #[error("unresolved resource types: {}", .tokens.join(", "))]
    Unresolved {
        tokens: Vec<String>,
        program: Box<BoundProgram>,
    },
}

/// Bind every block of `program` against `registry`.
pub fn bind_program(
    program: &Program,
    registry: &dyn SchemaRegistry,
    options: &BindOptions,
) -> Result<BoundProgram, BindError> {
    let declared = map_in_order(&program.blocks, options.parallel, |i, block| {
        declare_block(SyntaxId(i), block, registry)
    });

    let mut diagnostics = program.diagnostics.clone();
    let mut nodes = Vec::with_capacity(declared.len());
    for (node, diags) in declared {
        diagnostics.extend(diags);
        nodes.extend(node);
    }

    let scope = declare_names(&mut nodes);

    let mut ranges: Vec<Option<RangeBinding>> = Vec::with_capacity(nodes.len());
    for i in 0..nodes.len() {
        let refined = program.block(nodes[i].syntax()).and_then(|block| {
            let names = Scope::new(&nodes, &scope, options.max_depth);
            refine_node(&nodes[i], block, &names)
        });
        let binding = match (refined, &mut nodes[i]) {
            (Some(Refined::Config(ty)), BoundNode::Config(c)) => {
                debug!(config = %c.variable_name, ty = %ty, "inferred config type");
                c.ty = ty;
                None
            }
            (Some(Refined::Range(b)), BoundNode::Resource(r)) => {
                r.variable_type = b.variable_type.clone();
                Some(b)
            }
            _ => None,
        };
        ranges.push(binding);
    }

    let bodies = {
        let names = Scope::new(&nodes, &scope, options.max_depth);
        map_in_order(&nodes, options.parallel, |i, node| {
            program
                .block(node.syntax())
                .map(|block| bind_body(node, block, &names, ranges[i].as_ref()))
        })
    };
    for (node, body) in nodes.iter_mut().zip(bodies) {
        if let Some(body) = body {
            body.apply(node);
        }
    }

    for node in &nodes {
        diagnostics.extend(node.diagnostics().clone());
    }
    diagnostics.sort();

    info!(
        nodes = nodes.len(),
        diagnostics = diagnostics.len(),
        "bound program"
    );

    let bound = BoundProgram {
        nodes,
        scope,
        diagnostics,
    };

    if options.strict {
        let tokens: Vec<String> = bound
            .resources()
            .filter(|r| !r.is_resolved())
            .map(|r| r.token.clone())
            .collect();
        if !tokens.is_empty() {
            return Err(BindError::Unresolved {
                tokens,
                program: Box::new(bound),
            });
        }
    }

    Ok(bound)
}

fn map_in_order<I, T, F>(items: &[I], parallel: bool, f: F) -> Vec<T>
where
    I: Sync,
    T: Send,
    F: Fn(usize, &I) -> T + Sync + Send,
{
    if parallel {
        items.par_iter().enumerate().map(|(i, item)| f(i, item)).collect()
    } else {
        items.iter().enumerate().map(|(i, item)| f(i, item)).collect()
    }
}

// ============================================================================
// Declaration
// ============================================================================

fn declare_block(id: SyntaxId, block: &Block, registry: &dyn SchemaRegistry) -> (Option<BoundNode>, Diagnostics) {
    match block.kind.as_str() {
        RESOURCE_BLOCK => (Some(BoundNode::Resource(declare_resource(id, block, registry))), Diagnostics::new()),
        CONFIG_BLOCK => (Some(BoundNode::Config(declare_config(id, block))), Diagnostics::new()),
        other => {
            let mut diags = Diagnostics::new();
            diags.error(
                block.range,
                format!("unsupported block kind '{}'; expected 'resource' or 'config'", other),
            );
            (None, diags)
        }
    }
}

fn declare_resource(id: SyntaxId, block: &Block, registry: &dyn SchemaRegistry) -> Resource {
    let mut diagnostics = Diagnostics::new();
    let name = block.labels.first().cloned().unwrap_or_default();
    let token = block.labels.get(1).cloned();

    if block.labels.len() != 2 {
        diagnostics.error(
            block.range,
            format!(
                "resource block must have exactly two labels (name and type token), found {}",
                block.labels.len()
            ),
        );
    }

    let token_range = block.label_range(1);
    let descriptor = token.as_deref().and_then(|token| {
        let (parts, diags) = decompose_token(token, token_range);
        if !diags.is_empty() {
            diagnostics.extend(diags);
            return None;
        }
        let found = registry.lookup_type(&parts.package, &parts.module, &parts.type_name);
        if found.is_none() {
            diagnostics.error(token_range, format!("unknown resource type '{}'", token));
        }
        found
    });

    let (input_type, output_type) = match descriptor {
        Some(desc) => {
            debug!(resource = %name, token = %desc.token, "resolved resource type");
            (desc.input_type.clone(), desc.output_type.clone())
        }
        None => {
            warn!(resource = %name, "resource type unresolved; degrading to any");
            (Type::Any, Type::Any)
        }
    };

    Resource {
        syntax: id,
        range: block.range,
        name,
        token: token.unwrap_or_default(),
        token_range,
        variable_type: output_type.clone(),
        input_type,
        output_type,
        inputs: Vec::new(),
        options: None,
        shadowed: false,
        diagnostics,
    }
}

fn declare_config(id: SyntaxId, block: &Block) -> ConfigVariable {
    let mut diagnostics = Diagnostics::new();
    let variable_name = block.labels.first().cloned().unwrap_or_default();

    if block.labels.is_empty() || block.labels.len() > 2 {
        diagnostics.error(
            block.range,
            format!(
                "config block must have a name label and an optional type label, found {} labels",
                block.labels.len()
            ),
        );
    }

    for attr in &block.attributes {
        if attr.name != "default" {
            diagnostics.error(
                attr.range,
                format!("unsupported attribute '{}' in config block '{}'", attr.name, variable_name),
            );
        }
    }

    let default = block.attribute("default");
    let ty = match (block.labels.get(1), default) {
        (Some(annotation), _) => Type::parse_annotation(annotation).unwrap_or_else(|e| {
            diagnostics.error(block.label_range(1), format!("config '{}': {}", variable_name, e));
            Type::Any
        }),
        (None, Some(attr)) => {
            let mut ignored = Diagnostics::new();
            type_expression(&attr.value, attr.range, None, 0, &mut ignored)
        }
        (None, None) => {
            diagnostics.error(
                block.range,
                format!(
                    "config '{}' has neither a type annotation nor a default value",
                    variable_name
                ),
            );
            Type::Any
        }
    };

    debug!(config = %variable_name, ty = %ty, "declared config variable");

    ConfigVariable {
        syntax: id,
        range: block.range,
        variable_name,
        ty,
        default_value: None,
        shadowed: false,
        diagnostics,
    }
}

/// Build the program scope: the first declaration of each name wins, every
/// later one is marked shadowed and gets one diagnostic.
fn declare_names(nodes: &mut [BoundNode]) -> IndexMap<String, usize> {
    let mut scope: IndexMap<String, usize> = IndexMap::new();
    for i in 0..nodes.len() {
        let name = nodes[i].name().to_string();
        if name.is_empty() {
            continue;
        }
        match scope.get(&name) {
            Some(&first) => {
                let first_range = nodes[first].range();
                let node = &mut nodes[i];
                let range = node.range();
                node.set_shadowed();
                node.diagnostics_mut().error(
                    range,
                    format!("duplicate declaration of '{}'; first declared at {}", name, first_range),
                );
            }
            None => {
                scope.insert(name, i);
            }
        }
    }
    scope
}

// ============================================================================
// Expressions
// ============================================================================

/// Read-only view of everything a body can reference.
struct Scope<'a> {
    nodes: &'a [BoundNode],
    names: &'a IndexMap<String, usize>,
    range: Option<Type>,
    max_depth: usize,
}

impl<'a> Scope<'a> {
    fn new(nodes: &'a [BoundNode], names: &'a IndexMap<String, usize>, max_depth: usize) -> Self {
        Self {
            nodes,
            names,
            range: None,
            max_depth,
        }
    }

    fn with_range(&self, range: Option<Type>) -> Self {
        Self {
            nodes: self.nodes,
            names: self.names,
            range,
            max_depth: self.max_depth,
        }
    }
}

fn bind_expression(expr: &Expression, range: SourceRange, scope: &Scope<'_>, diags: &mut Diagnostics) -> BoundExpression {
    let ty = type_expression(expr, range, Some(scope), 0, diags);
    BoundExpression {
        expression: expr.clone(),
        ty,
        range,
    }
}

/// Type an expression. Without a scope, references type as `any` silently
/// (used for config defaults at declaration time, refined later).
fn type_expression(
    expr: &Expression,
    range: SourceRange,
    scope: Option<&Scope<'_>>,
    depth: usize,
    diags: &mut Diagnostics,
) -> Type {
    if let Some(s) = scope {
        if depth > s.max_depth {
            diags.error(range, format!("expression nesting exceeds the maximum depth of {}", s.max_depth));
            return Type::Any;
        }
    }

    match expr {
        Expression::Null | Expression::Invalid => Type::Any,
        Expression::Bool(_) => Type::Bool,
        Expression::Int(_) => Type::Int,
        Expression::Number(_) => Type::Number,
        Expression::String(_) => Type::String,
        Expression::Template(parts) => {
            for part in parts {
                if let TemplatePart::Interpolation(e) = part {
                    type_expression(e, range, scope, depth + 1, diags);
                }
            }
            Type::String
        }
        Expression::List(items) => {
            let element = items
                .iter()
                .map(|e| type_expression(e, range, scope, depth + 1, diags))
                .reduce(|a, b| a.unify(&b))
                .unwrap_or(Type::Any);
            Type::list(element)
        }
        Expression::Object(fields) => {
            let properties = fields
                .iter()
                .map(|(k, e)| (k.clone(), type_expression(e, range, scope, depth + 1, diags)))
                .collect();
            Type::object(None, ObjectKind::Plain, properties)
        }
        Expression::Traversal { root, traversal } => {
            let Some(scope) = scope else {
                return Type::Any;
            };
            if root == RANGE_VARIABLE {
                if let Some(range_type) = &scope.range {
                    let (t, d) = traverse_all(range_type, traversal);
                    diags.extend(d);
                    return t.into_type();
                }
            }
            match scope.names.get(root).and_then(|&i| scope.nodes.get(i)) {
                Some(node) => {
                    let (t, d) = traverse_all(node, traversal);
                    diags.extend(d);
                    t.into_type()
                }
                None => {
                    diags.error(range, format!("undefined variable '{}'", root));
                    Type::Any
                }
            }
        }
    }
}

/// A declaration-time type that depends on other declarations.
enum Refined {
    /// Inferred type of an unannotated config.
    Config(Type),
    Range(RangeBinding),
}

fn refine_node(node: &BoundNode, block: &Block, scope: &Scope<'_>) -> Option<Refined> {
    match node {
        BoundNode::Config(_) if block.labels.len() < 2 => block.attribute("default").map(|attr| {
            // Reported when the body is bound.
            let mut ignored = Diagnostics::new();
            Refined::Config(type_expression(&attr.value, attr.range, Some(scope), 0, &mut ignored))
        }),
        BoundNode::Config(_) => None,
        BoundNode::Resource(r) => option_attribute(block, RANGE_VARIABLE)
            .map(|attr| Refined::Range(bind_range(attr, &r.output_type, scope))),
    }
}

// ============================================================================
// Bodies
// ============================================================================

enum Body {
    Config {
        default_value: Option<BoundExpression>,
        diagnostics: Diagnostics,
    },
    Resource {
        inputs: Vec<BoundAttribute>,
        options: Option<ResourceOptions>,
        diagnostics: Diagnostics,
    },
}

impl Body {
    fn apply(self, node: &mut BoundNode) {
        match (self, node) {
            (Body::Config { default_value, diagnostics }, BoundNode::Config(c)) => {
                c.default_value = default_value;
                c.diagnostics.extend(diagnostics);
            }
            (Body::Resource { inputs, options, diagnostics }, BoundNode::Resource(r)) => {
                r.inputs = inputs;
                r.options = options;
                r.diagnostics.extend(diagnostics);
            }
            _ => {}
        }
    }
}

fn bind_body(node: &BoundNode, block: &Block, scope: &Scope<'_>, range: Option<&RangeBinding>) -> Body {
    match node {
        BoundNode::Config(c) => bind_config_body(c, block, scope),
        BoundNode::Resource(r) => bind_resource_body(r, block, scope, range),
    }
}

fn bind_config_body(config: &ConfigVariable, block: &Block, scope: &Scope<'_>) -> Body {
    let mut diagnostics = Diagnostics::new();
    let default_value = block.attribute("default").map(|attr| {
        let bound = bind_expression(&attr.value, attr.range, scope, &mut diagnostics);
        if block.labels.len() > 1 && !config.ty.assignable_from(&bound.ty) {
            diagnostics.error(
                attr.range,
                format!(
                    "default value of type {} is not assignable to config '{}' of type {}",
                    bound.ty, config.variable_name, config.ty
                ),
            );
        }
        bound
    });
    Body::Config {
        default_value,
        diagnostics,
    }
}

fn bind_resource_body(resource: &Resource, block: &Block, base: &Scope<'_>, range: Option<&RangeBinding>) -> Body {
    let mut diagnostics = Diagnostics::new();
    let scope = base.with_range(range.and_then(|r| r.range_variable.clone()));

    let mut inputs = Vec::with_capacity(block.attributes.len());
    for attr in &block.attributes {
        let value = bind_expression(&attr.value, attr.range, &scope, &mut diagnostics);
        check_input(resource, attr, &value.ty, &mut diagnostics);
        inputs.push(BoundAttribute {
            name: attr.name.clone(),
            value,
        });
    }

    let options = block
        .options
        .as_ref()
        .map(|opts| bind_options(resource, opts, &scope, range, &mut diagnostics));

    debug!(
        resource = %resource.name,
        inputs = inputs.len(),
        diagnostics = diagnostics.len(),
        "bound resource body"
    );

    Body::Resource {
        inputs,
        options,
        diagnostics,
    }
}

fn check_input(resource: &Resource, attr: &Attribute, ty: &Type, diags: &mut Diagnostics) {
    let Some(inputs) = resource.input_type.as_object() else {
        return;
    };
    match inputs.properties.get(&attr.name) {
        Some(expected) if !expected.assignable_from(ty) => diags.error(
            attr.range,
            format!(
                "cannot assign value of type {} to attribute '{}' of type {}",
                ty, attr.name, expected
            ),
        ),
        Some(_) => {}
        None => diags.error(
            attr.range,
            format!(
                "unsupported attribute '{}' for resource type '{}'",
                attr.name, resource.token
            ),
        ),
    }
}

// ============================================================================
// Options
// ============================================================================

fn option_attribute<'a>(block: &'a Block, name: &str) -> Option<&'a Attribute> {
    block.options.as_ref()?.attributes.iter().find(|a| a.name == name)
}

/// The bound `range` option of one resource.
struct RangeBinding {
    slot: OptionSlot<BoundExpression>,
    variable_type: Type,
    /// `{ key, value }` object bound to `range` inside the body.
    range_variable: Option<Type>,
    diagnostics: Diagnostics,
}

fn bind_range(attr: &Attribute, output_type: &Type, scope: &Scope<'_>) -> RangeBinding {
    let mut diagnostics = Diagnostics::new();
    let bound = bind_expression(&attr.value, attr.range, scope, &mut diagnostics);

    let shape = match &bound.ty {
        Type::Any => Some((Type::Any, Type::Any, Type::Any)),
        Type::Bool => Some((output_type.clone(), Type::Any, Type::Any)),
        Type::Int | Type::Number => Some((Type::list(output_type.clone()), Type::Int, Type::Int)),
        Type::List(el) => Some((Type::list(output_type.clone()), Type::Int, (**el).clone())),
        Type::Map(el) => Some((Type::map(output_type.clone()), Type::String, (**el).clone())),
        Type::Object(obj) if obj.token.is_none() => {
            let value = obj
                .properties
                .values()
                .cloned()
                .reduce(|a, b| a.unify(&b))
                .unwrap_or(Type::Any);
            Some((Type::map(output_type.clone()), Type::String, value))
        }
        _ => None,
    };

    match shape {
        Some((variable_type, key, value)) => RangeBinding {
            slot: OptionSlot::Bound(bound),
            variable_type,
            range_variable: Some(Type::object(
                None,
                ObjectKind::Plain,
                IndexMap::from([("key".to_string(), key), ("value".to_string(), value)]),
            )),
            diagnostics,
        },
        None => {
            diagnostics.error(
                attr.range,
                format!(
                    "range option must be a bool, number, list, or map; found {}",
                    bound.ty
                ),
            );
            RangeBinding {
                slot: OptionSlot::Invalid,
                variable_type: output_type.clone(),
                range_variable: None,
                diagnostics,
            }
        }
    }
}

fn bind_options(
    resource: &Resource,
    block: &OptionsBlock,
    scope: &Scope<'_>,
    range: Option<&RangeBinding>,
    diags: &mut Diagnostics,
) -> ResourceOptions {
    let mut options = ResourceOptions {
        syntax_range: block.range,
        ..ResourceOptions::default()
    };

    if let Some(r) = range {
        options.range = r.slot.clone();
        diags.extend(r.diagnostics.clone());
    }

    for attr in &block.attributes {
        match attr.name.as_str() {
            "range" => {}
            "provider" => {
                options.provider = check_option(attr, scope, diags, "a provider resource", |t| {
                    t.is_any() || t.is_provider()
                });
            }
            "dependsOn" => {
                options.depends_on = bind_depends_on(attr, scope, diags);
            }
            "protect" => {
                options.protect = check_option(attr, scope, diags, "a bool", |t| {
                    matches!(t, Type::Any | Type::Bool)
                });
            }
            "ignoreChanges" => {
                options.ignore_changes = bind_ignore_changes(resource, attr, diags);
            }
            other => diags.error(
                attr.range,
                format!(
                    "unsupported option '{}'; expected one of {}",
                    other,
                    OPTION_NAMES.join(", ")
                ),
            ),
        }
    }

    options
}

/// A resource value, or a collection of them produced by a ranged resource.
fn is_resource_like(t: &Type) -> bool {
    match t {
        Type::Any => true,
        Type::List(el) | Type::Map(el) => is_resource_like(el),
        other => other.is_resource(),
    }
}

/// A literal list is checked element by element, since unifying mixed
/// element types would yield `any`.
fn bind_depends_on(attr: &Attribute, scope: &Scope<'_>, diags: &mut Diagnostics) -> OptionSlot<BoundExpression> {
    let Expression::List(items) = &attr.value else {
        return check_option(attr, scope, diags, "a list of resources", |t| match t {
            Type::Any => true,
            Type::List(el) => is_resource_like(el),
            _ => false,
        });
    };

    let mut local = Diagnostics::new();
    let bound = bind_expression(&attr.value, attr.range, scope, &mut local);
    diags.extend(local);

    let rejected = items.iter().enumerate().find_map(|(i, item)| {
        let mut ignored = Diagnostics::new();
        let ty = type_expression(item, attr.range, Some(scope), 1, &mut ignored);
        (!is_resource_like(&ty)).then_some((i, ty))
    });
    match rejected {
        None => OptionSlot::Bound(bound),
        Some((i, ty)) => {
            diags.error(
                attr.range,
                format!(
                    "dependsOn option must be a list of resources; element {} has type {}",
                    i, ty
                ),
            );
            OptionSlot::Invalid
        }
    }
}

fn check_option(
    attr: &Attribute,
    scope: &Scope<'_>,
    diags: &mut Diagnostics,
    expected: &str,
    accepts: impl Fn(&Type) -> bool,
) -> OptionSlot<BoundExpression> {
    let mut local = Diagnostics::new();
    let bound = bind_expression(&attr.value, attr.range, scope, &mut local);
    diags.extend(local);
    if accepts(&bound.ty) {
        OptionSlot::Bound(bound)
    } else {
        diags.error(
            attr.range,
            format!("{} option must be {}; found {}", attr.name, expected, bound.ty),
        );
        OptionSlot::Invalid
    }
}

fn bind_ignore_changes(resource: &Resource, attr: &Attribute, diags: &mut Diagnostics) -> OptionSlot<Vec<ResourceProperty>> {
    let Expression::List(items) = &attr.value else {
        diags.error(attr.range, "ignoreChanges option must be a list of property path strings");
        return OptionSlot::Invalid;
    };

    let root = ResourceProperty::root(resource.input_type.clone());
    let mut properties = Vec::with_capacity(items.len());
    let mut seen: Vec<&str> = Vec::with_capacity(items.len());
    let mut failed = false;
    for item in items {
        let Expression::String(text) = item else {
            diags.error(attr.range, "ignoreChanges entries must be property path strings");
            failed = true;
            continue;
        };
        if seen.contains(&text.as_str()) {
            diags.push(Diagnostic::warning(
                attr.range,
                format!("ignoreChanges lists '{}' more than once", text),
            ));
            continue;
        }
        seen.push(text);
        match parse_property_path(text, attr.range) {
            Ok(path) => {
                let (resolved, d) = traverse_all(&root, &path);
                if !d.is_empty() {
                    failed = true;
                    diags.extend(d);
                }
                if let super::traverse::Traversed::Property(p) = resolved {
                    properties.push(p);
                }
            }
            Err(e) => {
                diags.error(attr.range, format!("invalid ignoreChanges path: {}", e));
                failed = true;
            }
        }
    }

    if failed {
        OptionSlot::Invalid
    } else {
        OptionSlot::Bound(properties)
    }
}
