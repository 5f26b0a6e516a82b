//! Lambda function descriptor, invoke permissions and grants.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};

use crate::construct::{Construct, ConstructPath, Scope};
use crate::error::{Error, Result};
use crate::iam::{grant, Grantable, Role};
use crate::token::Token;

pub const INVOKE_ACTION: &str = "lambda:InvokeFunction";

/// Execution runtime tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum Runtime {
    #[default]
    Nodejs8_10,
    Nodejs10x,
    Nodejs12x,
    Nodejs18x,
    Nodejs20x,
    ProvidedAl2,
}

impl Runtime {
    pub fn as_str(self) -> &'static str {
        match self {
            Runtime::Nodejs8_10 => "nodejs8.10",
            Runtime::Nodejs10x => "nodejs10.x",
            Runtime::Nodejs12x => "nodejs12.x",
            Runtime::Nodejs18x => "nodejs18.x",
            Runtime::Nodejs20x => "nodejs20.x",
            Runtime::ProvidedAl2 => "provided.al2",
        }
    }

    const ALL: [Runtime; 6] = [
        Runtime::Nodejs8_10,
        Runtime::Nodejs10x,
        Runtime::Nodejs12x,
        Runtime::Nodejs18x,
        Runtime::Nodejs20x,
        Runtime::ProvidedAl2,
    ];
}

impl fmt::Display for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Runtime {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Runtime::ALL
            .into_iter()
            .find(|runtime| runtime.as_str() == s)
            .ok_or_else(|| Error::InvalidConfig {
                message: format!("unknown lambda runtime '{s}'"),
            })
    }
}

impl TryFrom<String> for Runtime {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl Serialize for Runtime {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Deployable code for a function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Code {
    /// A local directory packaged and uploaded at deploy time.
    Asset(PathBuf),
}

impl Code {
    pub fn asset(path: impl Into<PathBuf>) -> Self {
        Code::Asset(path.into())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FunctionCode {
    pub s3_bucket: Token,
    pub s3_key: Token,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FunctionEnvironment {
    pub variables: BTreeMap<String, Token>,
}

/// `AWS::Lambda::Function` properties.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CfnFunction {
    pub code: FunctionCode,
    pub handler: String,
    pub role: Token,
    pub runtime: Runtime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<FunctionEnvironment>,
}

/// `AWS::Lambda::Permission` properties.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CfnPermission {
    pub action: &'static str,
    pub function_name: Token,
    pub principal: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_arn: Option<Token>,
}

/// Construction options for [`Function::new`].
#[derive(Debug, Clone)]
pub struct FunctionProps {
    pub runtime: Runtime,
    pub code: Code,
    /// Entry point, `file.export`.
    pub handler: String,
    pub role: Role,
    pub environment: BTreeMap<String, Token>,
}

/// Handle to a declared function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    path: ConstructPath,
    logical_id: String,
    role: Role,
    runtime: Runtime,
    code: Code,
    handler: String,
    environment: BTreeMap<String, Token>,
}

impl Function {
    pub fn new(scope: &mut Scope<'_>, id: &str, props: FunctionProps) -> Result<Self> {
        let mut node = scope.child(id)?;
        let Code::Asset(asset_path) = &props.code;
        let asset = node.graph_mut().add_asset(asset_path);

        let environment = (!props.environment.is_empty()).then(|| FunctionEnvironment {
            variables: props.environment.clone(),
        });
        let logical_id = node.add_resource(
            "Resource",
            CfnFunction {
                code: FunctionCode {
                    s3_bucket: asset.bucket(),
                    s3_key: asset.key(),
                },
                handler: props.handler.clone(),
                role: props.role.role_arn(),
                runtime: props.runtime,
                environment,
            },
        )?;

        let graph = node.graph_mut();
        graph.add_metadata(&logical_id, "aws:asset:path", asset.path.clone())?;
        graph.add_metadata(&logical_id, "aws:asset:property", "Code")?;

        Ok(Self {
            path: node.path().clone(),
            logical_id,
            role: props.role,
            runtime: props.runtime,
            code: props.code,
            handler: props.handler,
            environment: props.environment,
        })
    }

    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    pub fn function_name(&self) -> Token {
        Token::reference(&self.logical_id)
    }

    pub fn function_arn(&self) -> Token {
        Token::get_att(&self.logical_id, "Arn")
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    pub fn runtime(&self) -> Runtime {
        self.runtime
    }

    pub fn code(&self) -> &Code {
        &self.code
    }

    pub fn handler(&self) -> &str {
        &self.handler
    }

    pub fn environment(&self) -> &BTreeMap<String, Token> {
        &self.environment
    }

    /// Permit `grantee` to invoke this function.
    pub fn grant_invoke(&self, scope: &mut Scope<'_>, grantee: &dyn Grantable) -> Result<()> {
        grant(
            scope.graph_mut(),
            grantee,
            &[INVOKE_ACTION],
            vec![self.function_arn()],
        )?;
        Ok(())
    }

    /// Allow a service principal to invoke this function, optionally only from
    /// `source_arn`. Declared as a child node `id` of `scope`.
    pub fn add_permission(
        &self,
        scope: &mut Scope<'_>,
        id: &str,
        principal: &str,
        source_arn: Option<Token>,
    ) -> Result<String> {
        scope.add_resource(
            id,
            CfnPermission {
                action: INVOKE_ACTION,
                function_name: self.function_arn(),
                principal: principal.to_string(),
                source_arn,
            },
        )
    }
}

impl Construct for Function {
    fn node_path(&self) -> &ConstructPath {
        &self.path
    }
}

impl Grantable for Function {
    fn grant_role(&self) -> &Role {
        &self.role
    }

    fn dependent_resource(&self) -> Option<&str> {
        Some(&self.logical_id)
    }
}
