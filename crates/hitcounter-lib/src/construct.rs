//! Construct tree: named, scoped nodes and logical-id derivation.
//!
//! Every declared entity occupies a unique [`ConstructPath`] within its stack.
//! Resources additionally receive a CloudFormation logical id derived from
//! that path, so ids are stable as long as the tree shape is.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::graph::ResourceGraph;
use crate::resource::ResourceProperties;

/// Components that never contribute to the human-readable part of a logical id.
const HIDDEN_ID: &str = "Default";
const HIDDEN_FROM_HUMAN_ID: &str = "Resource";
const MAX_HUMAN_LEN: usize = 240;
const HASH_LEN: usize = 8;

/// Path of a construct relative to its stack root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstructPath(Vec<String>);

impl ConstructPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn from_components<I, S>(components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(components.into_iter().map(Into::into).collect())
    }

    pub fn child(&self, id: &str) -> Self {
        let mut components = self.0.clone();
        components.push(id.to_string());
        Self(components)
    }

    pub fn components(&self) -> &[String] {
        &self.0
    }

    /// Last component, or the empty string for the stack root.
    pub fn id(&self) -> &str {
        self.0.last().map(String::as_str).unwrap_or("")
    }

    /// Derive the CloudFormation logical id for a resource at this path.
    pub fn logical_id(&self) -> String {
        make_logical_id(&self.0)
    }
}

impl fmt::Display for ConstructPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

/// Capability shared by everything that lives in the construct tree.
pub trait Construct {
    fn node_path(&self) -> &ConstructPath;
}

fn make_logical_id(components: &[String]) -> String {
    if components.len() == 1 {
        let candidate = sanitize(&components[0]);
        if !candidate.is_empty() && candidate.len() <= MAX_HUMAN_LEN {
            return candidate;
        }
    }

    let last = components.len().saturating_sub(1);
    let mut human: Vec<String> = Vec::with_capacity(components.len());
    for (index, component) in components.iter().enumerate() {
        if component == HIDDEN_ID || (index == last && component == HIDDEN_FROM_HUMAN_ID) {
            continue;
        }
        let cleaned = sanitize(component);
        // "Foo/Foo" reads as "Foo" rather than "FooFoo"
        if human.last() == Some(&cleaned) {
            continue;
        }
        human.push(cleaned);
    }

    let mut human = human.concat();
    human.truncate(MAX_HUMAN_LEN);
    format!("{human}{}", path_hash(components))
}

fn path_hash(components: &[String]) -> String {
    let digest = Sha256::digest(components.join("/").as_bytes());
    let mut hash = hex::encode_upper(digest);
    hash.truncate(HASH_LEN);
    hash
}

fn sanitize(component: &str) -> String {
    component
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() || id.contains('/') {
        return Err(Error::InvalidConstructId { id: id.to_string() });
    }
    Ok(())
}

/// Mutable view of a stack's resource graph positioned at one construct path.
///
/// Constructs receive a `Scope` for their parent, declare themselves with
/// [`Scope::child`], and add resources beneath their own node.
pub struct Scope<'g> {
    graph: &'g mut ResourceGraph,
    path: ConstructPath,
}

impl<'g> Scope<'g> {
    pub(crate) fn new(graph: &'g mut ResourceGraph, path: ConstructPath) -> Self {
        Self { graph, path }
    }

    pub fn path(&self) -> &ConstructPath {
        &self.path
    }

    /// Declare a child construct and return a scope positioned at it.
    pub fn child(&mut self, id: &str) -> Result<Scope<'_>> {
        let path = self.declare(id)?;
        Ok(Scope {
            graph: &mut *self.graph,
            path,
        })
    }

    /// Re-enter an already declared construct, e.g. to attach children to a
    /// construct after its constructor returned.
    pub(crate) fn reopen(&mut self, path: &ConstructPath) -> Scope<'_> {
        Scope {
            graph: &mut *self.graph,
            path: path.clone(),
        }
    }

    /// Declare a leaf node that owns no resources (e.g. an imported policy).
    pub fn declare(&mut self, id: &str) -> Result<ConstructPath> {
        validate_id(id)?;
        let path = self.path.child(id);
        self.graph.register_node(&path)?;
        Ok(path)
    }

    /// Declare a resource as a child node and return its logical id.
    pub fn add_resource(
        &mut self,
        id: &str,
        properties: impl Into<ResourceProperties>,
    ) -> Result<String> {
        validate_id(id)?;
        let path = self.path.child(id);
        self.graph.check_logical_id(&path)?;
        self.graph.register_node(&path)?;
        self.graph.insert_resource(path, properties.into())
    }

    pub fn graph(&self) -> &ResourceGraph {
        &*self.graph
    }

    pub fn graph_mut(&mut self) -> &mut ResourceGraph {
        &mut *self.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apigateway::CfnAccount;
    use crate::token::Token;

    fn account() -> CfnAccount {
        CfnAccount {
            cloud_watch_role_arn: Token::literal("arn:aws:iam::123456789012:role/logs"),
        }
    }

    #[test]
    fn single_component_uses_sanitized_id() {
        let path = ConstructPath::from_components(["Hello-Handler"]);
        assert_eq!(path.logical_id(), "HelloHandler");
    }

    #[test]
    fn nested_path_appends_hash_and_hides_resource() {
        let path = ConstructPath::from_components(["HelloHandler", "Resource"]);
        let id = path.logical_id();
        assert!(id.starts_with("HelloHandler"), "{id}");
        assert_eq!(id.len(), "HelloHandler".len() + HASH_LEN);
        assert!(id["HelloHandler".len()..]
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn default_components_are_hidden() {
        let path = ConstructPath::from_components(["Endpoint", "Default", "{proxy+}", "Resource"]);
        assert!(path.logical_id().starts_with("Endpointproxy"));
    }

    #[test]
    fn logical_ids_are_deterministic_and_distinct() {
        let a = ConstructPath::from_components(["A", "Resource"]);
        let b = ConstructPath::from_components(["A", "Other"]);
        assert_eq!(a.logical_id(), a.clone().logical_id());
        assert_ne!(a.logical_id(), b.logical_id());
    }

    #[test]
    fn rejects_invalid_ids() {
        assert!(matches!(
            validate_id("a/b"),
            Err(Error::InvalidConstructId { .. })
        ));
        assert!(validate_id("").is_err());
        assert!(validate_id("ok").is_ok());
    }

    #[test]
    fn colliding_logical_id_leaves_no_node_behind() {
        let mut graph = ResourceGraph::new();
        let mut root = Scope::new(&mut graph, ConstructPath::root());
        let first = root
            .add_resource("A-B", account())
            .unwrap();
        assert_eq!(first, "AB");

        match root.add_resource("AB", account()) {
            Err(Error::DuplicateLogicalId { logical_id, path }) => {
                assert_eq!(logical_id, "AB");
                assert_eq!(path, "AB");
            }
            other => panic!("expected logical id collision, got {other:?}"),
        }
        assert!(!graph.has_node(&ConstructPath::from_components(["AB"])));
        assert!(graph.has_node(&ConstructPath::from_components(["A-B"])));
        assert_eq!(graph.resources().len(), 1);
    }
}
