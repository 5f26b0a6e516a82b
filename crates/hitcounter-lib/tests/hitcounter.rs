mod common;

use serde_json::{json, Value};

use hitcounter_lib::dynamodb::{BillingMode, READ_DATA_ACTIONS, WRITE_DATA_ACTIONS};
use hitcounter_lib::lambda::INVOKE_ACTION;
use hitcounter_lib::{HitCounter, HitCounterProps, PolicyCatalog};

use common::{empty_stack, plain_function, render, synth};

fn actions_of(statement: &Value) -> Vec<String> {
    match &statement["Action"] {
        Value::String(action) => vec![action.clone()],
        Value::Array(actions) => actions
            .iter()
            .filter_map(|a| a.as_str().map(str::to_string))
            .collect(),
        other => panic!("unexpected Action shape: {other}"),
    }
}

#[test]
fn wraps_downstream_with_table_and_handler() {
    let mut stack = empty_stack("CounterStack");
    let downstream = plain_function(&mut stack, "Downstream");
    let counter = {
        let mut root = stack.root();
        HitCounter::new(
            &mut root,
            "Counter",
            HitCounterProps {
                downstream: downstream.clone(),
            },
            &PolicyCatalog::default(),
        )
        .expect("hit counter builds")
    };

    assert_eq!(counter.handler().runtime(), downstream.runtime());
    assert_eq!(counter.handler().code(), downstream.code());
    assert_eq!(counter.handler().handler(), "hitcounter.handler");
    assert_eq!(counter.table().partition_key().name, "path");
    assert_eq!(counter.table().billing_mode(), BillingMode::PayPerRequest);
    assert!(counter.table().is_encrypted());
    assert_eq!(counter.handler().role().managed_policies().len(), 4);

    let template = synth(&stack);
    assert_eq!(template.count_of_type("AWS::DynamoDB::Table"), 1);
    assert_eq!(template.count_of_type("AWS::Lambda::Function"), 2);
}

#[test]
fn handler_policy_grants_only_table_data_and_invoke() {
    let mut stack = empty_stack("CounterStack");
    let downstream = plain_function(&mut stack, "Downstream");
    let counter = {
        let mut root = stack.root();
        HitCounter::new(
            &mut root,
            "Counter",
            HitCounterProps {
                downstream: downstream.clone(),
            },
            &PolicyCatalog::default(),
        )
        .expect("hit counter builds")
    };
    let template = synth(&stack);

    let policies = template.resources_of_type("AWS::IAM::Policy");
    assert_eq!(policies.len(), 1);
    let (policy_id, policy) = policies[0];
    let statements = policy["Properties"]["PolicyDocument"]["Statement"]
        .as_array()
        .expect("statements");
    assert_eq!(statements.len(), 2);

    let table_actions = actions_of(&statements[0]);
    let expected: Vec<String> = READ_DATA_ACTIONS
        .iter()
        .chain(WRITE_DATA_ACTIONS)
        .map(|a| a.to_string())
        .collect();
    assert_eq!(table_actions, expected);
    assert_eq!(
        statements[0]["Resource"],
        json!({"Fn::GetAtt": [counter.table().logical_id(), "Arn"]})
    );

    assert_eq!(actions_of(&statements[1]), vec![INVOKE_ACTION.to_string()]);
    assert_eq!(
        statements[1]["Resource"],
        json!({"Fn::GetAtt": [downstream.logical_id(), "Arn"]})
    );

    assert_eq!(
        policy["Properties"]["Roles"],
        json!([{"Ref": counter.handler().role().logical_id()}])
    );

    // the handler waits for its permissions
    let handler = template
        .resource(counter.handler().logical_id())
        .expect("handler rendered");
    assert_eq!(handler["DependsOn"], json!([policy_id]));
}

#[test]
fn downstream_gains_no_permissions() {
    let mut stack = empty_stack("CounterStack");
    let downstream = plain_function(&mut stack, "Downstream");
    {
        let mut root = stack.root();
        HitCounter::new(
            &mut root,
            "Counter",
            HitCounterProps {
                downstream: downstream.clone(),
            },
            &PolicyCatalog::default(),
        )
        .expect("hit counter builds");
    }
    let template = synth(&stack);
    let rendered = template
        .resource(downstream.logical_id())
        .expect("downstream rendered");
    assert!(rendered.get("DependsOn").is_none());
    assert!(!render(rendered).contains("dynamodb:"));
}

#[test]
fn duplicate_hit_counter_id_is_rejected() {
    let mut stack = empty_stack("CounterStack");
    let downstream = plain_function(&mut stack, "Downstream");
    let mut root = stack.root();
    let props = HitCounterProps {
        downstream: downstream.clone(),
    };
    HitCounter::new(&mut root, "Counter", props.clone(), &PolicyCatalog::default())
        .expect("first hit counter builds");
    assert!(HitCounter::new(&mut root, "Counter", props, &PolicyCatalog::default()).is_err());
}
