//! IB-004: Program syntax — the block document consumed by the binder.
//!
//! A program is an ordered list of blocks. Each block has a kind
//! (`resource`, `config`), positional labels, attributes in source order,
//! and an optional nested `options` block. Programs are read from YAML:
//!
//! ```yaml
//! blocks:
//!   - kind: config
//!     labels: [bucketName, string]
//!     attributes:
//!       default: my-bucket
//!   - kind: resource
//!     labels: [bucket, "aws:s3/bucket:Bucket"]
//!     attributes:
//!       bucket: "${bucketName}"
//!     options:
//!       protect: true
//! ```
//!
//! A string that is exactly `${root.a[0]}` is a scope traversal; a string
//! containing `${...}` elsewhere is a template. Blocks without an explicit
//! `range` get line = ordinal (1-based); labels, then attributes, then
//! options are placed on the block's line at increasing columns so
//! diagnostics sort in source order.
//!
//! A malformed interpolation does not reject the document: the attribute
//! keeps an `Expression::Invalid` value and the problem is recorded in
//! `Program::diagnostics`.

use super::diagnostics::{Diagnostics, Pos, SourceRange};
use indexmap::IndexMap;
use serde::Deserialize;
use std::fmt;
use std::path::Path;

/// Index of a block in `Program::blocks`. Bound nodes refer back to their
/// syntax through this key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SyntaxId(pub usize);

/// A parsed program.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub blocks: Vec<Block>,
    /// Attribute values that could not be parsed.
    pub diagnostics: Diagnostics,
}

impl Program {
    pub fn block(&self, id: SyntaxId) -> Option<&Block> {
        self.blocks.get(id.0)
    }
}

/// A top-level block.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub kind: String,
    pub labels: Vec<String>,
    /// One range per label.
    pub label_ranges: Vec<SourceRange>,
    pub attributes: Vec<Attribute>,
    pub options: Option<OptionsBlock>,
    pub range: SourceRange,
}

impl Block {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Range of the label at `index`, falling back to the block's range.
    pub fn label_range(&self, index: usize) -> SourceRange {
        self.label_ranges.get(index).copied().unwrap_or(self.range)
    }
}

/// The nested `options` block of a resource.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionsBlock {
    pub attributes: Vec<Attribute>,
    pub range: SourceRange,
}

/// A `name = value` attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: Expression,
    pub range: SourceRange,
}

/// One step of a traversal.
#[derive(Debug, Clone, PartialEq)]
pub enum Accessor {
    /// `.name`
    Attr(String),
    /// `[0]` or `["key"]`
    Index(Key),
}

/// An index key.
#[derive(Debug, Clone, PartialEq)]
pub enum Key {
    Int(i64),
    Str(String),
}

/// An accessor with the source range it was written at.
#[derive(Debug, Clone, PartialEq)]
pub struct Traverser {
    pub accessor: Accessor,
    pub range: SourceRange,
}

impl Traverser {
    pub fn attr(name: &str, range: SourceRange) -> Self {
        Self {
            accessor: Accessor::Attr(name.to_string()),
            range,
        }
    }

    pub fn index(key: Key, range: SourceRange) -> Self {
        Self {
            accessor: Accessor::Index(key),
            range,
        }
    }
}

impl fmt::Display for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attr(name) => write!(f, ".{}", name),
            Self::Index(Key::Int(i)) => write!(f, "[{}]", i),
            Self::Index(Key::Str(s)) => write!(f, "[\"{}\"]", s),
        }
    }
}

/// A piece of a template string.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    Literal(String),
    Interpolation(Expression),
}

/// An unbound expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Null,
    Bool(bool),
    Int(i64),
    Number(f64),
    String(String),
    Template(Vec<TemplatePart>),
    List(Vec<Expression>),
    Object(IndexMap<String, Expression>),
    /// A reference into scope: `root` followed by accessors.
    Traversal {
        root: String,
        traversal: Vec<Traverser>,
    },
    /// A value that failed to parse; types as `any`.
    Invalid,
}

impl Expression {
    /// Names of the scope roots this expression references, in order of
    /// appearance (duplicates included).
    pub fn references(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Traversal { root, .. } => out.push(root),
            Self::List(items) => items.iter().for_each(|e| e.collect_references(out)),
            Self::Object(fields) => fields.values().for_each(|e| e.collect_references(out)),
            Self::Template(parts) => {
                for part in parts {
                    if let TemplatePart::Interpolation(e) = part {
                        e.collect_references(out);
                    }
                }
            }
            _ => {}
        }
    }
}

// ============================================================================
// YAML loading
// ============================================================================

#[derive(Debug, Deserialize)]
struct ProgramDoc {
    #[serde(default)]
    blocks: Vec<BlockDoc>,
}

#[derive(Debug, Deserialize)]
struct BlockDoc {
    kind: String,
    #[serde(default)]
    labels: Vec<String>,
    #[serde(default)]
    attributes: IndexMap<String, serde_yaml_ng::Value>,
    #[serde(default)]
    options: Option<IndexMap<String, serde_yaml_ng::Value>>,
    #[serde(default)]
    range: Option<SourceRange>,
}

/// Read a program document from disk.
pub fn parse_program_file(path: &Path) -> Result<Program, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    parse_program(&content)
}

/// Read a program document from a YAML string.
pub fn parse_program(yaml: &str) -> Result<Program, String> {
    let doc: ProgramDoc =
        serde_yaml_ng::from_str(yaml).map_err(|e| format!("YAML parse error: {}", e))?;

    let mut blocks = Vec::with_capacity(doc.blocks.len());
    let mut diagnostics = Diagnostics::new();
    for (i, block) in doc.blocks.into_iter().enumerate() {
        let line = u32::try_from(i + 1).unwrap_or(u32::MAX);
        let range = block.range.unwrap_or_else(|| SourceRange::line(line, 1));
        let label_ranges: Vec<SourceRange> = (0..block.labels.len())
            .map(|n| offset(range, column(n + 2)))
            .collect();
        let first_attribute = column(block.labels.len() + 2);
        let attributes = convert_attributes(block.attributes, range, first_attribute, &mut diagnostics);

        let options = match block.options {
            Some(opts) => {
                let options_column = first_attribute.saturating_add(column(attributes.len()));
                Some(OptionsBlock {
                    attributes: convert_attributes(opts, range, options_column + 1, &mut diagnostics),
                    range: offset(range, options_column),
                })
            }
            None => None,
        };

        blocks.push(Block {
            kind: block.kind,
            labels: block.labels,
            label_ranges,
            attributes,
            options,
            range,
        });
    }

    Ok(Program { blocks, diagnostics })
}

fn column(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

fn offset(range: SourceRange, column: u32) -> SourceRange {
    let start = Pos {
        line: range.start.line,
        column: range.start.column.saturating_add(column.saturating_sub(1)),
    };
    SourceRange { start, end: start }
}

fn convert_attributes(
    raw: IndexMap<String, serde_yaml_ng::Value>,
    base: SourceRange,
    first_column: u32,
    diagnostics: &mut Diagnostics,
) -> Vec<Attribute> {
    let mut column = first_column;
    let mut out = Vec::with_capacity(raw.len());
    for (name, value) in raw {
        let range = offset(base, column);
        let value = expression_from_yaml(&value, range).unwrap_or_else(|e| {
            diagnostics.error(range, format!("attribute '{}': {}", name, e));
            Expression::Invalid
        });
        out.push(Attribute { name, value, range });
        column = column.saturating_add(1);
    }
    out
}

/// Convert a YAML value into an expression.
pub fn expression_from_yaml(value: &serde_yaml_ng::Value, range: SourceRange) -> Result<Expression, String> {
    use serde_yaml_ng::Value;

    match value {
        Value::Null => Ok(Expression::Null),
        Value::Bool(b) => Ok(Expression::Bool(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(Expression::Int(i)),
            None => n
                .as_f64()
                .map(Expression::Number)
                .ok_or_else(|| format!("unsupported number {}", n)),
        },
        Value::String(s) => parse_string(s, range),
        Value::Sequence(items) => items
            .iter()
            .map(|v| expression_from_yaml(v, range))
            .collect::<Result<Vec<_>, _>>()
            .map(Expression::List),
        Value::Mapping(map) => {
            let mut fields = IndexMap::new();
            for (k, v) in map {
                let key = k
                    .as_str()
                    .ok_or_else(|| format!("object keys must be strings, got {:?}", k))?;
                fields.insert(key.to_string(), expression_from_yaml(v, range)?);
            }
            Ok(Expression::Object(fields))
        }
        Value::Tagged(tagged) => Err(format!("unsupported YAML tag {}", tagged.tag)),
    }
}

fn parse_string(s: &str, range: SourceRange) -> Result<Expression, String> {
    if !s.contains("${") {
        return Ok(Expression::String(s.to_string()));
    }

    let mut parts = Vec::new();
    let mut rest = s;
    while let Some(open) = rest.find("${") {
        if open > 0 {
            parts.push(TemplatePart::Literal(rest[..open].to_string()));
        }
        let close = rest[open..]
            .find('}')
            .ok_or_else(|| format!("unclosed interpolation in '{}'", s))?;
        let inner = &rest[open + 2..open + close];
        let (root, traversal) = parse_traversal(inner, range)?;
        parts.push(TemplatePart::Interpolation(Expression::Traversal { root, traversal }));
        rest = &rest[open + close + 1..];
    }
    if !rest.is_empty() {
        parts.push(TemplatePart::Literal(rest.to_string()));
    }

    match parts.as_slice() {
        [TemplatePart::Interpolation(expr)] => Ok(expr.clone()),
        _ => Ok(Expression::Template(parts)),
    }
}

/// Parse `root.a[0]["k"]` into its root name and accessors.
pub fn parse_traversal(text: &str, range: SourceRange) -> Result<(String, Vec<Traverser>), String> {
    let text = text.trim();
    let root_len = identifier_len(text);
    if root_len == 0 {
        return Err(format!("expected identifier at start of '{}'", text));
    }
    let root = text[..root_len].to_string();
    let traversal = parse_accessors(&text[root_len..], text, range)?;
    Ok((root, traversal))
}

/// Parse a property path such as `tags.Name` or `rules[0].id`. The first
/// segment becomes an attribute accessor.
pub fn parse_property_path(text: &str, range: SourceRange) -> Result<Vec<Traverser>, String> {
    let (root, rest) = parse_traversal(text, range)?;
    let mut path = vec![Traverser::attr(&root, range)];
    path.extend(rest);
    Ok(path)
}

fn identifier_len(s: &str) -> usize {
    s.char_indices()
        .take_while(|&(i, c)| {
            c == '_' || c.is_ascii_alphabetic() || (i > 0 && (c.is_ascii_digit() || c == '-'))
        })
        .count()
}

fn parse_accessors(mut rest: &str, whole: &str, range: SourceRange) -> Result<Vec<Traverser>, String> {
    let mut out = Vec::new();
    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix('.') {
            let len = identifier_len(after);
            if len == 0 {
                return Err(format!("expected attribute name after '.' in '{}'", whole));
            }
            out.push(Traverser::attr(&after[..len], range));
            rest = &after[len..];
        } else if let Some(after) = rest.strip_prefix('[') {
            let close = after
                .find(']')
                .ok_or_else(|| format!("unclosed '[' in '{}'", whole))?;
            let key = after[..close].trim();
            let key = if let Some(quoted) = key
                .strip_prefix('"')
                .and_then(|k| k.strip_suffix('"'))
                .or_else(|| key.strip_prefix('\'').and_then(|k| k.strip_suffix('\'')))
            {
                Key::Str(quoted.to_string())
            } else {
                key.parse::<i64>()
                    .map(Key::Int)
                    .map_err(|_| format!("invalid index '{}' in '{}'", key, whole))?
            };
            out.push(Traverser::index(key, range));
            rest = &after[close + 1..];
        } else {
            return Err(format!("unexpected '{}' in '{}'", rest, whole));
        }
    }
    Ok(out)
}
