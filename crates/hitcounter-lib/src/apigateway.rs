//! REST API fronted by a Lambda handler.
//!
//! [`LambdaRestApi::new`] declares the API, its deployment and stage. Routing
//! is attached either implicitly (`proxy: true`) or by calling
//! [`LambdaRestApi::add_catch_all_proxy`] after construction. The explicit
//! form is required when the CloudWatch account role is disabled.

use serde::Serialize;
use tracing::debug;

use crate::construct::{Construct, ConstructPath, Scope};
use crate::error::Result;
use crate::iam::{ManagedPolicy, Principal, Role, RoleProps};
use crate::lambda::Function;
use crate::token::{Pseudo, Token};

pub const APIGATEWAY_SERVICE_PRINCIPAL: &str = "apigateway.amazonaws.com";
pub const DEFAULT_STAGE_NAME: &str = "prod";
const TEST_INVOKE_STAGE: &str = "test-invoke-stage";
const PROXY_PATH_PART: &str = "{proxy+}";
const ROOT_NODE_ID: &str = "Default";
const CLOUDWATCH_POLICY: &str = "service-role/AmazonAPIGatewayPushToCloudWatchLogs";

/// Network placement of the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EndpointType {
    Edge,
    Regional,
    Private,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EndpointConfiguration {
    pub types: Vec<EndpointType>,
}

/// `AWS::ApiGateway::RestApi` properties.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CfnRestApi {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint_configuration: Option<EndpointConfiguration>,
}

/// `AWS::ApiGateway::Resource` properties.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CfnApiResource {
    pub parent_id: Token,
    pub path_part: String,
    pub rest_api_id: Token,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MethodIntegration {
    pub integration_http_method: &'static str,
    #[serde(rename = "Type")]
    pub kind: &'static str,
    pub uri: Token,
}

/// `AWS::ApiGateway::Method` properties.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CfnMethod {
    pub http_method: String,
    pub resource_id: Token,
    pub rest_api_id: Token,
    pub authorization_type: &'static str,
    pub integration: MethodIntegration,
}

/// `AWS::ApiGateway::Deployment` properties.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CfnDeployment {
    pub rest_api_id: Token,
    pub description: String,
}

/// `AWS::ApiGateway::Stage` properties.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CfnStage {
    pub rest_api_id: Token,
    pub deployment_id: Token,
    pub stage_name: String,
}

/// `AWS::ApiGateway::Account` properties.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CfnAccount {
    pub cloud_watch_role_arn: Token,
}

/// Construction options for [`LambdaRestApi::new`].
#[derive(Debug, Clone)]
pub struct LambdaRestApiProps {
    pub handler: Function,
    /// Attach the catch-all proxy inside the constructor.
    pub proxy: bool,
    /// Create the account-level CloudWatch logging role.
    pub cloud_watch_role: bool,
    pub endpoint_types: Vec<EndpointType>,
    pub stage_name: String,
    pub rest_api_name: Option<String>,
}

impl LambdaRestApiProps {
    pub fn new(handler: Function) -> Self {
        Self {
            handler,
            proxy: true,
            cloud_watch_role: true,
            endpoint_types: Vec::new(),
            stage_name: DEFAULT_STAGE_NAME.to_string(),
            rest_api_name: None,
        }
    }
}

/// Handle to the `{proxy+}` resource and its methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyResource {
    path: ConstructPath,
    logical_id: String,
    method_id: String,
    root_method_id: String,
}

impl ProxyResource {
    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    /// The `ANY` method on `{proxy+}`.
    pub fn method_id(&self) -> &str {
        &self.method_id
    }

    /// The `ANY` method mirrored on the API root so `/` is routed too.
    pub fn root_method_id(&self) -> &str {
        &self.root_method_id
    }
}

impl Construct for ProxyResource {
    fn node_path(&self) -> &ConstructPath {
        &self.path
    }
}

/// Handle to a declared REST API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LambdaRestApi {
    path: ConstructPath,
    logical_id: String,
    deployment_id: String,
    stage_id: String,
    stage_name: String,
    url_output_id: String,
    handler: Function,
    cloud_watch_role: Option<Role>,
}

impl LambdaRestApi {
    pub fn new(scope: &mut Scope<'_>, id: &str, props: LambdaRestApiProps) -> Result<Self> {
        let mut node = scope.child(id)?;
        let endpoint_configuration = (!props.endpoint_types.is_empty()).then(|| {
            EndpointConfiguration {
                types: props.endpoint_types.clone(),
            }
        });
        let logical_id = node.add_resource(
            "Resource",
            CfnRestApi {
                name: props.rest_api_name.clone().unwrap_or_else(|| id.to_string()),
                endpoint_configuration,
            },
        )?;
        let rest_api_id = Token::reference(&logical_id);

        let cloud_watch_role = if props.cloud_watch_role {
            let role = Role::new(
                &mut node,
                "CloudWatchRole",
                RoleProps {
                    assumed_by: Principal::service(APIGATEWAY_SERVICE_PRINCIPAL),
                    managed_policies: vec![ManagedPolicy::aws_managed(CLOUDWATCH_POLICY)],
                },
            )?;
            let account_id = node.add_resource(
                "Account",
                CfnAccount {
                    cloud_watch_role_arn: role.role_arn(),
                },
            )?;
            node.graph_mut().add_dependency(&account_id, &logical_id)?;
            Some(role)
        } else {
            None
        };

        let deployment_id = node.child("Deployment")?.add_resource(
            "Resource",
            CfnDeployment {
                rest_api_id: rest_api_id.clone(),
                description: "Automatically created by the RestApi construct".to_string(),
            },
        )?;
        let stage_id = node
            .child(&format!("DeploymentStage.{}", props.stage_name))?
            .add_resource(
                "Resource",
                CfnStage {
                    rest_api_id: rest_api_id.clone(),
                    deployment_id: Token::reference(&deployment_id),
                    stage_name: props.stage_name.clone(),
                },
            )?;
        node.declare(ROOT_NODE_ID)?;

        let path = node.path().clone();
        let url = endpoint_url(&logical_id, &stage_id);
        let url_output_id = node.graph_mut().add_output(&path.child("Endpoint"), url)?;

        let api = Self {
            path,
            logical_id,
            deployment_id,
            stage_id,
            stage_name: props.stage_name,
            url_output_id,
            handler: props.handler,
            cloud_watch_role,
        };
        debug!(api = %api.logical_id, proxy = props.proxy, "declared rest api");

        if props.proxy {
            let handler = api.handler.clone();
            api.add_catch_all_proxy(scope, &handler)?;
        }
        Ok(api)
    }

    /// Route every path not matched elsewhere to `handler`.
    ///
    /// Declares `{proxy+}` with an `ANY` method, mirrors `ANY` onto the root,
    /// and permits API Gateway to invoke the handler from both. Fails with a
    /// duplicate-id error when a catch-all already exists.
    pub fn add_catch_all_proxy(
        &self,
        scope: &mut Scope<'_>,
        handler: &Function,
    ) -> Result<ProxyResource> {
        let root_path = self.path.child(ROOT_NODE_ID);
        let mut root = scope.reopen(&root_path);

        let (proxy_path, logical_id, method_id) = {
            let mut proxy = root.child(PROXY_PATH_PART)?;
            let logical_id = proxy.add_resource(
                "Resource",
                CfnApiResource {
                    parent_id: self.root_resource_id(),
                    path_part: PROXY_PATH_PART.to_string(),
                    rest_api_id: self.rest_api_id(),
                },
            )?;
            let method_id = self.add_lambda_method(
                &mut proxy,
                Token::reference(&logical_id),
                "/*",
                handler,
            )?;
            (proxy.path().clone(), logical_id, method_id)
        };
        let root_method_id = self.add_lambda_method(&mut root, self.root_resource_id(), "/", handler)?;

        debug!(api = %self.logical_id, proxy = %logical_id, "attached catch-all proxy");
        Ok(ProxyResource {
            path: proxy_path,
            logical_id,
            method_id,
            root_method_id,
        })
    }

    fn add_lambda_method(
        &self,
        resource: &mut Scope<'_>,
        resource_id: Token,
        arn_path: &str,
        handler: &Function,
    ) -> Result<String> {
        let mut method = resource.child("ANY")?;
        let method_id = method.add_resource(
            "Resource",
            CfnMethod {
                http_method: "ANY".to_string(),
                resource_id,
                rest_api_id: self.rest_api_id(),
                authorization_type: "NONE",
                integration: MethodIntegration {
                    integration_http_method: "POST",
                    kind: "AWS_PROXY",
                    uri: lambda_invocation_uri(handler),
                },
            },
        )?;

        handler.add_permission(
            &mut method,
            "ApiPermission",
            APIGATEWAY_SERVICE_PRINCIPAL,
            Some(self.execute_api_arn("*", arn_path, Token::reference(&self.stage_id))),
        )?;
        handler.add_permission(
            &mut method,
            "ApiPermission.Test",
            APIGATEWAY_SERVICE_PRINCIPAL,
            Some(self.execute_api_arn("*", arn_path, Token::literal(TEST_INVOKE_STAGE))),
        )?;
        method
            .graph_mut()
            .add_dependency(&self.deployment_id, &method_id)?;
        Ok(method_id)
    }

    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    pub fn rest_api_id(&self) -> Token {
        Token::reference(&self.logical_id)
    }

    pub fn root_resource_id(&self) -> Token {
        Token::get_att(&self.logical_id, "RootResourceId")
    }

    pub fn deployment_id(&self) -> &str {
        &self.deployment_id
    }

    pub fn stage_id(&self) -> &str {
        &self.stage_id
    }

    pub fn stage_name(&self) -> &str {
        &self.stage_name
    }

    /// Logical id of the stack output carrying the endpoint URL.
    pub fn url_output_id(&self) -> &str {
        &self.url_output_id
    }

    pub fn handler(&self) -> &Function {
        &self.handler
    }

    pub fn cloud_watch_role(&self) -> Option<&Role> {
        self.cloud_watch_role.as_ref()
    }

    /// ARN covering every method, path and stage of this API.
    pub fn arn_for_execute_api(&self) -> Token {
        self.execute_api_arn("*", "/*", Token::literal("*"))
    }

    /// `arn:…:execute-api:<region>:<account>:<api>/<stage>/<method><path>`.
    pub fn execute_api_arn(&self, method: &str, path: &str, stage: Token) -> Token {
        Token::join([
            Token::literal("arn:"),
            Token::Pseudo(Pseudo::Partition),
            Token::literal(":execute-api:"),
            Token::Pseudo(Pseudo::Region),
            Token::literal(":"),
            Token::Pseudo(Pseudo::AccountId),
            Token::literal(":"),
            self.rest_api_id(),
            Token::literal("/"),
            stage,
            Token::literal(format!("/{method}{path}")),
        ])
    }
}

impl Construct for LambdaRestApi {
    fn node_path(&self) -> &ConstructPath {
        &self.path
    }
}

fn endpoint_url(api_id: &str, stage_id: &str) -> Token {
    Token::join([
        Token::literal("https://"),
        Token::reference(api_id),
        Token::literal(".execute-api."),
        Token::Pseudo(Pseudo::Region),
        Token::literal("."),
        Token::Pseudo(Pseudo::UrlSuffix),
        Token::literal("/"),
        Token::reference(stage_id),
        Token::literal("/"),
    ])
}

fn lambda_invocation_uri(handler: &Function) -> Token {
    Token::join([
        Token::literal("arn:"),
        Token::Pseudo(Pseudo::Partition),
        Token::literal(":apigateway:"),
        Token::Pseudo(Pseudo::Region),
        Token::literal(":lambda:path/2015-03-31/functions/"),
        handler.function_arn(),
        Token::literal("/invocations"),
    ])
}
