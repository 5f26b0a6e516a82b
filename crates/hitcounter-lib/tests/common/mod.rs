//! Shared helpers for integration tests.

use std::path::PathBuf;

use hitcounter_lib::iam::{Principal, RoleProps, LAMBDA_SERVICE_PRINCIPAL};
use hitcounter_lib::{
    AppConfig, Code, Function, FunctionProps, Role, Runtime, Stack, StackProps, Template,
    WorkshopStack,
};
use serde_json::Value;

/// The workshop stack built from default configuration.
#[allow(dead_code)]
pub fn default_workshop() -> WorkshopStack {
    WorkshopStack::new("CdkWorkshopStack", None, &AppConfig::default())
        .expect("default workshop stack builds")
}

#[allow(dead_code)]
pub fn synth(stack: &Stack) -> Template {
    stack.synthesize().expect("stack synthesizes")
}

/// An empty stack with no tags.
#[allow(dead_code)]
pub fn empty_stack(name: &str) -> Stack {
    Stack::new(name, StackProps::default()).expect("valid stack name")
}

/// Declare a bare function with its own trust-only role under the stack root.
#[allow(dead_code)]
pub fn plain_function(stack: &mut Stack, id: &str) -> Function {
    let mut root = stack.root();
    let role = Role::new(
        &mut root,
        &format!("{id}Role"),
        RoleProps {
            assumed_by: Principal::service(LAMBDA_SERVICE_PRINCIPAL),
            managed_policies: Vec::new(),
        },
    )
    .expect("role declares");
    Function::new(
        &mut root,
        id,
        FunctionProps {
            runtime: Runtime::Nodejs18x,
            code: Code::asset(PathBuf::from("lambda")),
            handler: "index.handler".to_string(),
            role,
            environment: Default::default(),
        },
    )
    .expect("function declares")
}

/// Serialized form of a template value, for substring checks.
#[allow(dead_code)]
pub fn render(value: &Value) -> String {
    serde_json::to_string(value).expect("value serializes")
}
