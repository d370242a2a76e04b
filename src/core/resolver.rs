//! IB-009: Dependency DAG construction.
//!
//! Edges come from the references inside each node's bound expressions
//! (inputs, options, config defaults). Topological order uses Kahn's
//! algorithm with deterministic (alphabetical) tie-breaking.

use super::model::{BoundNode, BoundProgram, Node};
use std::collections::{BTreeSet, HashMap, VecDeque};

impl BoundProgram {
    /// Dependencies of the declaration that owns `name`.
    pub fn dependencies(&self, name: &str) -> Vec<String> {
        self.lookup(name)
            .map(|node| dependencies(node, self))
            .unwrap_or_default()
    }

    pub fn dependency_order(&self) -> Result<Vec<String>, String> {
        dependency_order(self)
    }
}

/// Names in scope that `node` references, sorted and deduplicated.
/// Self-references and names that resolve to nothing are skipped; the binder
/// already reported the latter.
pub fn dependencies(node: &BoundNode, program: &BoundProgram) -> Vec<String> {
    let mut deps = BTreeSet::new();
    for expr in node.expressions() {
        for name in expr.expression.references() {
            if name != node.name() && program.scope.contains_key(name) {
                deps.insert(name.to_string());
            }
        }
    }
    deps.into_iter().collect()
}

/// Every non-shadowed node with its dependencies, in declaration order.
pub fn dependency_graph(program: &BoundProgram) -> Vec<(String, Vec<String>)> {
    program
        .scope
        .iter()
        .filter_map(|(name, &i)| program.nodes.get(i).map(|node| (name.clone(), dependencies(node, program))))
        .collect()
}

/// Build a topological order of node names: every node appears after
/// everything it references.
pub fn dependency_order(program: &BoundProgram) -> Result<Vec<String>, String> {
    let graph = dependency_graph(program);
    let mut in_degree: HashMap<&str, usize> = HashMap::new();
    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();

    for (name, _) in &graph {
        in_degree.insert(name, 0);
        adjacency.insert(name, Vec::new());
    }

    for (name, deps) in &graph {
        for dep in deps {
            if let Some(dependents) = adjacency.get_mut(dep.as_str()) {
                dependents.push(name);
            }
            if let Some(degree) = in_degree.get_mut(name.as_str()) {
                *degree += 1;
            }
        }
    }

    // Kahn's algorithm with sorted tie-breaking
    let mut zero_degree: Vec<&str> = in_degree
        .iter()
        .filter(|(_, &d)| d == 0)
        .map(|(name, _)| *name)
        .collect();
    zero_degree.sort_unstable();
    let mut queue: VecDeque<&str> = zero_degree.into_iter().collect();

    let mut order = Vec::with_capacity(graph.len());
    while let Some(current) = queue.pop_front() {
        order.push(current.to_string());

        let mut next_ready: Vec<&str> = Vec::new();
        if let Some(neighbors) = adjacency.get(current) {
            for neighbor in neighbors {
                if let Some(degree) = in_degree.get_mut(neighbor) {
                    *degree -= 1;
                    if *degree == 0 {
                        next_ready.push(neighbor);
                    }
                }
            }
        }
        next_ready.sort_unstable();
        queue.extend(next_ready);
    }

    if order.len() != graph.len() {
        let mut cycle_members: Vec<&str> = in_degree
            .iter()
            .filter(|(_, &d)| d > 0)
            .map(|(name, _)| *name)
            .collect();
        cycle_members.sort_unstable();
        return Err(format!(
            "dependency cycle detected involving: {}",
            cycle_members.join(", ")
        ));
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::binder::{bind_program, BindOptions};
    use crate::core::schema::tests::aws_registry;
    use crate::core::syntax::parse_program;

    fn bind(yaml: &str) -> BoundProgram {
        let program = parse_program(yaml).unwrap();
        bind_program(&program, &aws_registry(), &BindOptions::default()).unwrap()
    }

    #[test]
    fn test_ib009_topo_linear() {
        let yaml = r#"
blocks:
  - kind: resource
    labels: [c, "aws:s3/bucketObject:BucketObject"]
    attributes:
      bucket: "${b.bucket}"
  - kind: resource
    labels: [b, "aws:s3/bucket:Bucket"]
    attributes:
      bucket: "${a}"
  - kind: config
    labels: [a, string]
"#;
        let bound = bind(yaml);
        assert_eq!(bound.dependency_order().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_ib009_topo_parallel() {
        let yaml = r#"
blocks:
  - kind: resource
    labels: [beta, "aws:s3/bucket:Bucket"]
  - kind: resource
    labels: [alpha, "aws:s3/bucket:Bucket"]
"#;
        let bound = bind(yaml);
        // Alphabetical tie-breaking: alpha before beta
        assert_eq!(dependency_order(&bound).unwrap(), vec!["alpha", "beta"]);
    }

    #[test]
    fn test_ib009_topo_diamond() {
        let yaml = r#"
blocks:
  - kind: resource
    labels: [top, "aws:s3/bucket:Bucket"]
  - kind: resource
    labels: [right, "aws:s3/bucket:Bucket"]
    attributes:
      bucket: "${top.bucket}"
  - kind: resource
    labels: [left, "aws:s3/bucket:Bucket"]
    options:
      dependsOn: ["${top}"]
  - kind: resource
    labels: [bottom, "aws:s3/bucketObject:BucketObject"]
    attributes:
      bucket: "${left.bucket}"
      key: "${right.arn}-key"
"#;
        let bound = bind(yaml);
        let order = dependency_order(&bound).unwrap();
        assert_eq!(order, vec!["top", "left", "right", "bottom"]);
    }

    #[test]
    fn test_ib009_topo_cycle() {
        let yaml = r#"
blocks:
  - kind: resource
    labels: [a, "aws:s3/bucket:Bucket"]
    attributes:
      bucket: "${b.bucket}"
  - kind: resource
    labels: [b, "aws:s3/bucket:Bucket"]
    attributes:
      bucket: "${a.bucket}"
  - kind: config
    labels: [z, int]
"#;
        let bound = bind(yaml);
        let err = dependency_order(&bound).unwrap_err();
        assert_eq!(err, "dependency cycle detected involving: a, b");
    }

    #[test]
    fn test_ib009_dependencies_skip_self_and_unknown() {
        let yaml = r#"
blocks:
  - kind: resource
    labels: [a, "aws:s3/bucket:Bucket"]
    attributes:
      bucket: "${a.arn}"
      acl: "${ghost}"
  - kind: config
    labels: [p, string]
  - kind: resource
    labels: [b, "aws:s3/bucket:Bucket"]
    attributes:
      bucket: "${p}-${a.bucket}-${p}"
"#;
        let bound = bind(yaml);
        assert!(dependencies(bound.lookup("a").unwrap(), &bound).is_empty());
        assert_eq!(dependencies(bound.lookup("b").unwrap(), &bound), vec!["a", "p"]);
        assert_eq!(bound.dependencies("b"), vec!["a", "p"]);
        assert!(bound.dependencies("missing").is_empty());
    }

    #[test]
    fn test_ib009_shadowed_nodes_excluded() {
        let yaml = r#"
blocks:
  - kind: resource
    labels: [a, "aws:s3/bucket:Bucket"]
  - kind: resource
    labels: [a, "aws:s3/bucket:Bucket"]
"#;
        let bound = bind(yaml);
        let graph = dependency_graph(&bound);
        assert_eq!(graph.len(), 1);
        assert_eq!(dependency_order(&bound).unwrap(), vec!["a"]);
    }
}
