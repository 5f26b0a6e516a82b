//! Typed CloudFormation resource properties and their registry entries.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::Value;

use crate::apigateway::{CfnAccount, CfnApiResource, CfnDeployment, CfnMethod, CfnRestApi, CfnStage};
use crate::construct::ConstructPath;
use crate::dynamodb::CfnTable;
use crate::error::Result;
use crate::iam::{CfnPolicy, CfnRole};
use crate::lambda::{CfnFunction, CfnPermission};

/// Properties of every resource kind the library can declare.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ResourceProperties {
    Role(CfnRole),
    Policy(CfnPolicy),
    Function(CfnFunction),
    Permission(CfnPermission),
    Table(CfnTable),
    RestApi(CfnRestApi),
    ApiResource(CfnApiResource),
    Method(CfnMethod),
    Deployment(CfnDeployment),
    Stage(CfnStage),
    Account(CfnAccount),
}

impl ResourceProperties {
    /// CloudFormation resource type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            ResourceProperties::Role(_) => "AWS::IAM::Role",
            ResourceProperties::Policy(_) => "AWS::IAM::Policy",
            ResourceProperties::Function(_) => "AWS::Lambda::Function",
            ResourceProperties::Permission(_) => "AWS::Lambda::Permission",
            ResourceProperties::Table(_) => "AWS::DynamoDB::Table",
            ResourceProperties::RestApi(_) => "AWS::ApiGateway::RestApi",
            ResourceProperties::ApiResource(_) => "AWS::ApiGateway::Resource",
            ResourceProperties::Method(_) => "AWS::ApiGateway::Method",
            ResourceProperties::Deployment(_) => "AWS::ApiGateway::Deployment",
            ResourceProperties::Stage(_) => "AWS::ApiGateway::Stage",
            ResourceProperties::Account(_) => "AWS::ApiGateway::Account",
        }
    }

    /// Whether stack tags propagate onto this resource.
    pub fn is_taggable(&self) -> bool {
        matches!(
            self,
            ResourceProperties::Role(_)
                | ResourceProperties::Function(_)
                | ResourceProperties::Table(_)
                | ResourceProperties::RestApi(_)
                | ResourceProperties::Stage(_)
        )
    }
}

macro_rules! impl_from_properties {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for ResourceProperties {
                fn from(value: $ty) -> Self {
                    ResourceProperties::$variant(value)
                }
            }
        )*
    };
}

impl_from_properties! {
    Role => CfnRole,
    Policy => CfnPolicy,
    Function => CfnFunction,
    Permission => CfnPermission,
    Table => CfnTable,
    RestApi => CfnRestApi,
    ApiResource => CfnApiResource,
    Method => CfnMethod,
    Deployment => CfnDeployment,
    Stage => CfnStage,
    Account => CfnAccount,
}

/// What CloudFormation does with a resource removed from the template.
/// Resources without a policy are deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeletionPolicy {
    Retain,
}

/// A declared resource and its template-level attributes.
#[derive(Debug, Clone)]
pub struct ResourceEntry {
    pub path: ConstructPath,
    pub logical_id: String,
    pub properties: ResourceProperties,
    pub depends_on: BTreeSet<String>,
    pub deletion_policy: Option<DeletionPolicy>,
    pub metadata: BTreeMap<String, String>,
}

impl ResourceEntry {
    pub fn type_name(&self) -> &'static str {
        self.properties.type_name()
    }

    /// Render the resource's `Properties` object.
    pub fn properties_json(&self) -> Result<Value> {
        Ok(serde_json::to_value(&self.properties)?)
    }
}
