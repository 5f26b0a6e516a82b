mod common;

use std::collections::BTreeSet;

use serde_json::json;

use hitcounter_lib::execution_role::{GLOBAL_DENY_IMPORT_ID, SHARED_GLOBAL_DENY_IMPORT_ID};
use hitcounter_lib::iam::{
    ManagedPolicyKind, BASIC_EXECUTION_POLICY, ORG_DENY_POLICY, SHARED_ORG_DENY_POLICY,
    VPC_ACCESS_EXECUTION_POLICY,
};
use hitcounter_lib::{lambda_execution_role, ConstructPath, Error, PolicyCatalog};

use common::{empty_stack, synth};

#[test]
fn attaches_four_policies_in_order() {
    let mut stack = empty_stack("RoleStack");
    let role = {
        let mut root = stack.root();
        lambda_execution_role(&mut root, "ExecRole", &PolicyCatalog::default()).expect("role builds")
    };

    let names: Vec<&str> = role.managed_policies().iter().map(|p| p.name()).collect();
    assert_eq!(
        names,
        vec![
            ORG_DENY_POLICY,
            SHARED_ORG_DENY_POLICY,
            BASIC_EXECUTION_POLICY,
            VPC_ACCESS_EXECUTION_POLICY
        ]
    );
    let kinds: Vec<ManagedPolicyKind> = role.managed_policies().iter().map(|p| p.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            ManagedPolicyKind::CustomerManaged,
            ManagedPolicyKind::CustomerManaged,
            ManagedPolicyKind::AwsManaged,
            ManagedPolicyKind::AwsManaged
        ]
    );

    let template = synth(&stack);
    let rendered = template.resource(role.logical_id()).expect("role rendered");
    let arns = rendered["Properties"]["ManagedPolicyArns"]
        .as_array()
        .expect("managed policy arns");
    assert_eq!(arns.len(), 4);
    assert_eq!(
        arns[0],
        json!({"Fn::Join": ["", [
            "arn:",
            {"Ref": "AWS::Partition"},
            ":iam::",
            {"Ref": "AWS::AccountId"},
            ":policy/cloud-services/cloud-services-global-deny"
        ]]})
    );
    assert_eq!(
        arns[3],
        json!({"Fn::Join": ["", [
            "arn:",
            {"Ref": "AWS::Partition"},
            ":iam::aws:policy/service-role/AWSLambdaVPCAccessExecutionRole"
        ]]})
    );
}

#[test]
fn trusts_only_the_lambda_service() {
    let mut stack = empty_stack("RoleStack");
    let role = {
        let mut root = stack.root();
        lambda_execution_role(&mut root, "ExecRole", &PolicyCatalog::default()).expect("role builds")
    };
    let template = synth(&stack);
    let rendered = template.resource(role.logical_id()).expect("role rendered");
    assert_eq!(
        rendered["Properties"]["AssumeRolePolicyDocument"],
        json!({
            "Statement": [{
                "Action": "sts:AssumeRole",
                "Effect": "Allow",
                "Principal": {"Service": "lambda.amazonaws.com"}
            }],
            "Version": "2012-10-17"
        })
    );
}

#[test]
fn import_ids_are_declared_next_to_the_role() {
    let mut stack = empty_stack("RoleStack");
    {
        let mut root = stack.root();
        lambda_execution_role(&mut root, "ExecRole", &PolicyCatalog::default()).expect("role builds");
    }
    let graph = stack.graph();
    assert!(graph.has_node(&ConstructPath::from_components([GLOBAL_DENY_IMPORT_ID])));
    assert!(graph.has_node(&ConstructPath::from_components([SHARED_GLOBAL_DENY_IMPORT_ID])));

    // a second role in the same scope collides on the import ids
    let mut root = stack.root();
    assert!(matches!(
        lambda_execution_role(&mut root, "OtherRole", &PolicyCatalog::default()),
        Err(Error::DuplicateConstructId { .. })
    ));
}

#[test]
fn missing_policy_fails_without_declaring_anything() {
    let catalog = PolicyCatalog {
        customer_managed: BTreeSet::from([ORG_DENY_POLICY.to_string()]),
        ..PolicyCatalog::default()
    };
    let mut stack = empty_stack("RoleStack");
    let result = {
        let mut root = stack.root();
        lambda_execution_role(&mut root, "ExecRole", &catalog)
    };

    match result {
        Err(Error::ManagedPolicyNotFound { name, suggestions }) => {
            assert_eq!(name, SHARED_ORG_DENY_POLICY);
            assert!(suggestions.contains(&ORG_DENY_POLICY.to_string()));
        }
        other => panic!("expected missing policy, got {other:?}"),
    }
    assert!(stack.graph().resources().is_empty());
    assert_eq!(stack.graph().nodes().count(), 0);
}
