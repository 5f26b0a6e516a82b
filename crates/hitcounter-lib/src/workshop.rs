//! The workshop application stack.
//!
//! One linear assembly: a `hello` function wrapped in a [`HitCounter`],
//! fronted by a REST API, with a [`TableViewer`] over the hit table.

use tracing::info;

use crate::apigateway::{EndpointType, LambdaRestApi, LambdaRestApiProps, ProxyResource};
use crate::config::AppConfig;
use crate::error::Result;
use crate::execution_role::lambda_execution_role;
use crate::hitcounter::{HitCounter, HitCounterProps};
use crate::iam::{PolicyStatement, Principal, Role};
use crate::lambda::{Code, Function, FunctionProps};
use crate::props::StackProps;
use crate::stack::Stack;
use crate::table_viewer::{TableViewer, TableViewerProps};

const ROLE_ID: &str = "cdkWorkshopLambdaHanderRole";
const HELLO_ID: &str = "HelloHandler";
const HELLO_ENTRY_POINT: &str = "hello.handler";
const HIT_COUNTER_ID: &str = "HelloHitCounter";
const ENDPOINT_ID: &str = "Endpoint";
const VIEWER_ID: &str = "ViewHitCounter";
pub const VIEWER_TITLE: &str = "Hello Hits";
pub const VIEWER_SORT_BY: &str = "-hits";

/// Actions granted by the endpoint access statement.
pub const ENDPOINT_ACCESS_ACTIONS: [&str; 8] = [
    "execute-api:Invoke",
    "logs:CreateLogGroup",
    "logs:CreateLogStream",
    "logs:DescribeLogGroups",
    "logs:DescribeLogStreams",
    "logs:PutLogEvents",
    "logs:GetLogEvents",
    "logs:FilterLogEvents",
];

/// The assembled stack and handles to its parts.
#[derive(Debug, Clone)]
pub struct WorkshopStack {
    stack: Stack,
    lambda_role: Role,
    hello: Function,
    hit_counter: HitCounter,
    endpoint: LambdaRestApi,
    proxy: ProxyResource,
    endpoint_access: PolicyStatement,
    viewer: TableViewer,
}

impl WorkshopStack {
    /// Build the stack. `props` are deep-merged over the default tag set.
    pub fn new(id: &str, props: Option<StackProps>, config: &AppConfig) -> Result<Self> {
        let props = props
            .unwrap_or_default()
            .defaults_deep(&StackProps::workshop_defaults());
        let mut stack = Stack::new(id, props)?;
        let policies = &config.policies;
        let mut root = stack.root();

        let lambda_role = lambda_execution_role(&mut root, ROLE_ID, policies)?;

        let hello = Function::new(
            &mut root,
            HELLO_ID,
            FunctionProps {
                runtime: config.runtime,
                code: Code::asset(config.asset_path.clone()),
                handler: HELLO_ENTRY_POINT.to_string(),
                role: lambda_role.clone(),
                environment: Default::default(),
            },
        )?;

        let hit_counter = HitCounter::new(
            &mut root,
            HIT_COUNTER_ID,
            HitCounterProps {
                downstream: hello.clone(),
            },
            policies,
        )?;

        // The implicit proxy path misorders resources when the CloudWatch
        // role is disabled, so the catch-all is attached as a second step.
        let endpoint = LambdaRestApi::new(
            &mut root,
            ENDPOINT_ID,
            LambdaRestApiProps {
                proxy: false,
                cloud_watch_role: false,
                endpoint_types: vec![EndpointType::Regional],
                ..LambdaRestApiProps::new(hit_counter.handler().clone())
            },
        )?;

        // Not attached to any role or resource.
        let endpoint_access = PolicyStatement::allow()
            .with_principal(Principal::Any)
            .with_actions(ENDPOINT_ACCESS_ACTIONS)
            .with_resources([endpoint.arn_for_execute_api()]);

        let proxy = endpoint.add_catch_all_proxy(&mut root, hit_counter.handler())?;

        let viewer = TableViewer::new(
            &mut root,
            VIEWER_ID,
            TableViewerProps {
                sort_by: Some(VIEWER_SORT_BY.to_string()),
                role: Some(lambda_role.clone()),
                cloud_watch_role: false,
                code: Code::asset(config.viewer_asset_path.clone()),
                ..TableViewerProps::new(VIEWER_TITLE, hit_counter.table().clone())
            },
        )?;

        info!(
            stack = %stack.name(),
            resources = stack.graph().resources().len(),
            "assembled workshop stack"
        );
        Ok(Self {
            stack,
            lambda_role,
            hello,
            hit_counter,
            endpoint,
            proxy,
            endpoint_access,
            viewer,
        })
    }

    /// Build the stack named by `config.stack_name` using `config.props`.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(&config.stack_name, Some(config.props.clone()), config)
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    pub fn into_stack(self) -> Stack {
        self.stack
    }

    pub fn lambda_role(&self) -> &Role {
        &self.lambda_role
    }

    pub fn hello(&self) -> &Function {
        &self.hello
    }

    pub fn hit_counter(&self) -> &HitCounter {
        &self.hit_counter
    }

    pub fn endpoint(&self) -> &LambdaRestApi {
        &self.endpoint
    }

    pub fn proxy(&self) -> &ProxyResource {
        &self.proxy
    }

    /// The endpoint access statement. Attached to nothing.
    pub fn endpoint_access(&self) -> &PolicyStatement {
        &self.endpoint_access
    }

    pub fn viewer(&self) -> &TableViewer {
        &self.viewer
    }
}
