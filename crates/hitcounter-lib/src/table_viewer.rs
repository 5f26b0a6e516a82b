//! Read-only HTML view over a table, served from its own REST API.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::debug;

use crate::apigateway::{EndpointType, LambdaRestApi, LambdaRestApiProps};
use crate::construct::{Construct, ConstructPath, Scope};
use crate::dynamodb::Table;
use crate::error::Result;
use crate::iam::{ManagedPolicy, Principal, Role, RoleProps, BASIC_EXECUTION_POLICY, LAMBDA_SERVICE_PRINCIPAL};
use crate::lambda::{Code, Function, FunctionProps, Runtime};
use crate::token::Token;

pub const TABLE_NAME_ENV: &str = "TABLE_NAME";
pub const TITLE_ENV: &str = "TITLE";
pub const SORT_BY_ENV: &str = "SORT_BY";
pub const DEFAULT_VIEWER_ASSET: &str = "table-viewer";

const HANDLER_ID: &str = "Rendered";
const ROLE_ID: &str = "RenderedServiceRole";
const ENDPOINT_ID: &str = "ViewerEndpoint";
const HANDLER_ENTRY_POINT: &str = "index.handler";

/// Options for [`TableViewer::new`].
#[derive(Debug, Clone)]
pub struct TableViewerProps {
    pub title: String,
    pub table: Table,
    /// Column to sort by; a leading `-` sorts descending.
    pub sort_by: Option<String>,
    /// Execution role for the renderer. A basic execution role is created
    /// when absent.
    pub role: Option<Role>,
    pub cloud_watch_role: bool,
    pub runtime: Runtime,
    pub code: Code,
}

impl TableViewerProps {
    pub fn new(title: impl Into<String>, table: Table) -> Self {
        Self {
            title: title.into(),
            table,
            sort_by: None,
            role: None,
            cloud_watch_role: true,
            runtime: Runtime::Nodejs10x,
            code: Code::asset(PathBuf::from(DEFAULT_VIEWER_ASSET)),
        }
    }
}

/// Dashboard construct rendering a table's items.
#[derive(Debug, Clone)]
pub struct TableViewer {
    path: ConstructPath,
    handler: Function,
    endpoint: LambdaRestApi,
    title: String,
    sort_by: Option<String>,
}

impl TableViewer {
    pub fn new(scope: &mut Scope<'_>, id: &str, props: TableViewerProps) -> Result<Self> {
        let mut node = scope.child(id)?;

        let role = match props.role {
            Some(role) => role,
            None => Role::new(
                &mut node,
                ROLE_ID,
                RoleProps {
                    assumed_by: Principal::service(LAMBDA_SERVICE_PRINCIPAL),
                    managed_policies: vec![ManagedPolicy::aws_managed(BASIC_EXECUTION_POLICY)],
                },
            )?,
        };

        let mut environment = BTreeMap::from([
            (TABLE_NAME_ENV.to_string(), props.table.table_name()),
            (TITLE_ENV.to_string(), Token::literal(props.title.clone())),
        ]);
        if let Some(sort_by) = &props.sort_by {
            environment.insert(SORT_BY_ENV.to_string(), Token::literal(sort_by.clone()));
        }

        let handler = Function::new(
            &mut node,
            HANDLER_ID,
            FunctionProps {
                runtime: props.runtime,
                code: props.code,
                handler: HANDLER_ENTRY_POINT.to_string(),
                role,
                environment,
            },
        )?;
        props.table.grant_read_data(&mut node, &handler)?;

        let endpoint = LambdaRestApi::new(
            &mut node,
            ENDPOINT_ID,
            LambdaRestApiProps {
                proxy: false,
                cloud_watch_role: props.cloud_watch_role,
                endpoint_types: vec![EndpointType::Regional],
                ..LambdaRestApiProps::new(handler.clone())
            },
        )?;
        endpoint.add_catch_all_proxy(&mut node, &handler)?;

        debug!(viewer = %node.path(), title = %props.title, "declared table viewer");
        Ok(Self {
            path: node.path().clone(),
            handler,
            endpoint,
            title: props.title,
            sort_by: props.sort_by,
        })
    }

    pub fn handler(&self) -> &Function {
        &self.handler
    }

    pub fn endpoint(&self) -> &LambdaRestApi {
        &self.endpoint
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn sort_by(&self) -> Option<&str> {
        self.sort_by.as_deref()
    }
}

impl Construct for TableViewer {
    fn node_path(&self) -> &ConstructPath {
        &self.path
    }
}
