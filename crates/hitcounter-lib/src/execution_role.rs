//! Compliant execution role for Lambda functions.
//!
//! Every function in the stack runs under a role that carries the
//! organization's deny guardrails ahead of the standard Lambda execution
//! policies. The attachment order is fixed.

use tracing::debug;

use crate::construct::Scope;
use crate::error::Result;
use crate::iam::{
    PolicyLookup, Principal, Role, RoleProps, BASIC_EXECUTION_POLICY, LAMBDA_SERVICE_PRINCIPAL,
    ORG_DENY_POLICY, SHARED_ORG_DENY_POLICY, VPC_ACCESS_EXECUTION_POLICY,
};

/// Construct id under which the organization deny policy is imported.
pub const GLOBAL_DENY_IMPORT_ID: &str = "global-deny";
/// Construct id under which the shared organization deny policy is imported.
pub const SHARED_GLOBAL_DENY_IMPORT_ID: &str = "shared-global-deny";

/// Build a role trusted by `lambda.amazonaws.com` with the managed policies
/// `[org-deny, shared-org-deny, basic-execution, vpc-access-execution]`.
///
/// All four policies are looked up before anything is declared, so a lookup
/// failure leaves `scope` untouched.
pub fn lambda_execution_role(
    scope: &mut Scope<'_>,
    id: &str,
    policies: &dyn PolicyLookup,
) -> Result<Role> {
    let managed_policies = vec![
        policies.customer_managed(ORG_DENY_POLICY)?,
        policies.customer_managed(SHARED_ORG_DENY_POLICY)?,
        policies.aws_managed(BASIC_EXECUTION_POLICY)?,
        policies.aws_managed(VPC_ACCESS_EXECUTION_POLICY)?,
    ];

    scope.declare(GLOBAL_DENY_IMPORT_ID)?;
    scope.declare(SHARED_GLOBAL_DENY_IMPORT_ID)?;

    let role = Role::new(
        scope,
        id,
        RoleProps {
            assumed_by: Principal::service(LAMBDA_SERVICE_PRINCIPAL),
            managed_policies,
        },
    )?;
    debug!(scope = %scope.path(), role = %role.logical_id(), "built lambda execution role");
    Ok(role)
}
