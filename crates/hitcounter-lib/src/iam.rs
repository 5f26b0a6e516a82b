//! IAM descriptors: policy statements, managed-policy lookup, roles and grants.

use std::collections::{BTreeMap, BTreeSet};

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use tracing::debug;

use crate::construct::{Construct, ConstructPath, Scope};
use crate::error::{Error, Result};
use crate::graph::ResourceGraph;
use crate::resource::ResourceProperties;
use crate::token::{Pseudo, Token};

const POLICY_VERSION: &str = "2012-10-17";
const MAX_SUGGESTIONS: usize = 3;
const SUGGESTION_THRESHOLD: f64 = 0.8;

/// Who a statement applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    /// An AWS service such as `lambda.amazonaws.com`.
    Service(String),
    /// Any principal (`"AWS": "*"`).
    Any,
}

impl Principal {
    pub fn service(name: impl Into<String>) -> Self {
        Principal::Service(name.into())
    }

    fn render(&self) -> (&'static str, &str) {
        match self {
            Principal::Service(name) => ("Service", name),
            Principal::Any => ("AWS", "*"),
        }
    }
}

/// A single `Allow` statement of an IAM policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyStatement {
    actions: Vec<String>,
    principals: Vec<Principal>,
    resources: Vec<Token>,
}

impl PolicyStatement {
    pub fn allow() -> Self {
        Self {
            actions: Vec::new(),
            principals: Vec::new(),
            resources: Vec::new(),
        }
    }

    pub fn with_actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.actions.extend(actions.into_iter().map(Into::into));
        self
    }

    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principals.push(principal);
        self
    }

    pub fn with_resources<I>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = Token>,
    {
        self.resources.extend(resources);
        self
    }

    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    pub fn principals(&self) -> &[Principal] {
        &self.principals
    }

    pub fn resources(&self) -> &[Token] {
        &self.resources
    }
}

impl Serialize for PolicyStatement {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("Action", &OneOrMany(&self.actions))?;
        map.serialize_entry("Effect", "Allow")?;
        if !self.principals.is_empty() {
            let mut grouped: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
            for principal in &self.principals {
                let (kind, value) = principal.render();
                grouped.entry(kind).or_default().push(value);
            }
            let rendered: BTreeMap<&str, OneOrMany<'_, &str>> = grouped
                .iter()
                .map(|(kind, values)| (*kind, OneOrMany(values.as_slice())))
                .collect();
            map.serialize_entry("Principal", &rendered)?;
        }
        if !self.resources.is_empty() {
            map.serialize_entry("Resource", &OneOrMany(&self.resources))?;
        }
        map.end()
    }
}

/// Renders a one-element list as the bare element, matching IAM conventions.
struct OneOrMany<'a, T>(&'a [T]);

impl<T: Serialize> Serialize for OneOrMany<'_, T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.0 {
            [single] => single.serialize(serializer),
            many => many.serialize(serializer),
        }
    }
}

/// An ordered collection of statements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PolicyDocument {
    #[serde(rename = "Statement")]
    statements: Vec<PolicyStatement>,
    #[serde(rename = "Version")]
    version: &'static str,
}

impl PolicyDocument {
    pub fn new(statements: Vec<PolicyStatement>) -> Self {
        Self {
            statements,
            version: POLICY_VERSION,
        }
    }

    pub fn push(&mut self, statement: PolicyStatement) {
        self.statements.push(statement);
    }
}

/// `AWS::IAM::Role` properties.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CfnRole {
    pub assume_role_policy_document: PolicyDocument,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub managed_policy_arns: Vec<Token>,
}

/// `AWS::IAM::Policy` properties.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CfnPolicy {
    pub policy_document: PolicyDocument,
    pub policy_name: String,
    pub roles: Vec<Token>,
}

/// Where a managed policy is maintained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagedPolicyKind {
    /// Maintained by the account owner; resolved within the deploying account.
    CustomerManaged,
    /// Maintained by AWS; resolved by global name.
    AwsManaged,
}

/// Reference to an existing managed policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedPolicy {
    name: String,
    kind: ManagedPolicyKind,
}

impl ManagedPolicy {
    /// AWS-managed policy by global name, without consulting a catalog.
    pub(crate) fn aws_managed(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: ManagedPolicyKind::AwsManaged,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ManagedPolicyKind {
        self.kind
    }

    pub fn arn(&self) -> Token {
        let account = match self.kind {
            ManagedPolicyKind::CustomerManaged => Token::Pseudo(Pseudo::AccountId),
            ManagedPolicyKind::AwsManaged => Token::literal("aws"),
        };
        Token::join([
            Token::literal("arn:"),
            Token::Pseudo(Pseudo::Partition),
            Token::literal(":iam::"),
            account,
            Token::literal(format!(":policy/{}", self.name)),
        ])
    }
}

/// Resolves managed policies by name against the target environment.
pub trait PolicyLookup {
    fn customer_managed(&self, name: &str) -> Result<ManagedPolicy>;
    fn aws_managed(&self, name: &str) -> Result<ManagedPolicy>;
}

/// Managed policies known to exist in the target environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyCatalog {
    #[serde(default)]
    pub customer_managed: BTreeSet<String>,
    #[serde(default)]
    pub aws_managed: BTreeSet<String>,
}

impl PolicyCatalog {
    fn find(
        names: &BTreeSet<String>,
        name: &str,
        kind: ManagedPolicyKind,
    ) -> Result<ManagedPolicy> {
        if names.contains(name) {
            return Ok(ManagedPolicy {
                name: name.to_string(),
                kind,
            });
        }
        Err(Error::ManagedPolicyNotFound {
            name: name.to_string(),
            suggestions: suggest(names, name),
        })
    }
}

impl Default for PolicyCatalog {
    fn default() -> Self {
        Self {
            customer_managed: [ORG_DENY_POLICY, SHARED_ORG_DENY_POLICY]
                .into_iter()
                .map(String::from)
                .collect(),
            aws_managed: [BASIC_EXECUTION_POLICY, VPC_ACCESS_EXECUTION_POLICY]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl PolicyLookup for PolicyCatalog {
    fn customer_managed(&self, name: &str) -> Result<ManagedPolicy> {
        Self::find(&self.customer_managed, name, ManagedPolicyKind::CustomerManaged)
    }

    fn aws_managed(&self, name: &str) -> Result<ManagedPolicy> {
        Self::find(&self.aws_managed, name, ManagedPolicyKind::AwsManaged)
    }
}

fn suggest(names: &BTreeSet<String>, name: &str) -> Vec<String> {
    let mut scored: Vec<(f64, &String)> = names
        .iter()
        .map(|candidate| (strsim::jaro_winkler(name, candidate), candidate))
        .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(b.1)));
    scored
        .into_iter()
        .take(MAX_SUGGESTIONS)
        .map(|(_, candidate)| candidate.clone())
        .collect()
}

/// Organization-scoped deny guardrail.
pub const ORG_DENY_POLICY: &str = "cloud-services/cloud-services-global-deny";
/// Shared-account variant of the organization deny guardrail.
pub const SHARED_ORG_DENY_POLICY: &str = "cloud-services/cloud-services-shared-global-deny";
pub const BASIC_EXECUTION_POLICY: &str = "service-role/AWSLambdaBasicExecutionRole";
pub const VPC_ACCESS_EXECUTION_POLICY: &str = "service-role/AWSLambdaVPCAccessExecutionRole";

pub const LAMBDA_SERVICE_PRINCIPAL: &str = "lambda.amazonaws.com";

/// Handle to a declared `AWS::IAM::Role`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    path: ConstructPath,
    logical_id: String,
    managed_policies: Vec<ManagedPolicy>,
}

/// Construction options for [`Role::new`].
#[derive(Debug, Clone)]
pub struct RoleProps {
    pub assumed_by: Principal,
    pub managed_policies: Vec<ManagedPolicy>,
}

impl Role {
    pub fn new(scope: &mut Scope<'_>, id: &str, props: RoleProps) -> Result<Self> {
        let mut node = scope.child(id)?;
        let trust = PolicyStatement::allow()
            .with_actions(["sts:AssumeRole"])
            .with_principal(props.assumed_by);
        let logical_id = node.add_resource(
            "Resource",
            CfnRole {
                assume_role_policy_document: PolicyDocument::new(vec![trust]),
                managed_policy_arns: props.managed_policies.iter().map(ManagedPolicy::arn).collect(),
            },
        )?;
        debug!(role = %logical_id, policies = props.managed_policies.len(), "declared role");

        Ok(Self {
            path: node.path().clone(),
            logical_id,
            managed_policies: props.managed_policies,
        })
    }

    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    pub fn role_arn(&self) -> Token {
        Token::get_att(&self.logical_id, "Arn")
    }

    pub fn role_name(&self) -> Token {
        Token::reference(&self.logical_id)
    }

    /// Managed policies in attachment order.
    pub fn managed_policies(&self) -> &[ManagedPolicy] {
        &self.managed_policies
    }

    /// Append a statement to this role's default inline policy, creating it on
    /// first use. Returns the policy's logical id.
    pub fn add_to_policy(
        &self,
        graph: &mut ResourceGraph,
        statement: PolicyStatement,
    ) -> Result<String> {
        let node = self.path.child("DefaultPolicy");
        let resource = node.child("Resource");
        let logical_id = resource.logical_id();

        if let Some(entry) = graph.resource_mut(&logical_id) {
            if let ResourceProperties::Policy(policy) = &mut entry.properties {
                policy.policy_document.push(statement);
                return Ok(logical_id);
            }
            return Err(Error::DuplicateLogicalId {
                logical_id,
                path: resource.to_string(),
            });
        }

        graph.check_logical_id(&resource)?;
        graph.register_node(&node)?;
        graph.register_node(&resource)?;
        graph.insert_resource(
            resource,
            CfnPolicy {
                policy_document: PolicyDocument::new(vec![statement]),
                policy_name: logical_id.clone(),
                roles: vec![self.role_name()],
            },
        )
    }
}

impl Construct for Role {
    fn node_path(&self) -> &ConstructPath {
        &self.path
    }
}

/// Something that can receive permissions through an execution role.
pub trait Grantable {
    fn grant_role(&self) -> &Role;

    /// Logical id of the resource that must wait for granted permissions.
    fn dependent_resource(&self) -> Option<&str> {
        None
    }
}

impl Grantable for Role {
    fn grant_role(&self) -> &Role {
        self
    }
}

/// Add `actions` on `resources` to the grantee's role policy.
///
/// When the grantee is a resource (e.g. a function) it gains a `DependsOn`
/// edge to the policy so it never runs before its permissions exist.
pub fn grant(
    graph: &mut ResourceGraph,
    grantee: &dyn Grantable,
    actions: &[&str],
    resources: Vec<Token>,
) -> Result<String> {
    let statement = PolicyStatement::allow()
        .with_actions(actions.iter().copied())
        .with_resources(resources);
    let policy_id = grantee.grant_role().add_to_policy(graph, statement)?;
    if let Some(dependent) = grantee.dependent_resource() {
        graph.add_dependency(dependent, &policy_id)?;
    }
    debug!(policy = %policy_id, ?actions, "granted permissions");
    Ok(policy_id)
}
