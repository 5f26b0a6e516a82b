//! DynamoDB table descriptor and data-access grants.

use serde::{Deserialize, Serialize};

use crate::construct::{Construct, ConstructPath, Scope};
use crate::error::Result;
use crate::iam::{grant, Grantable};
use crate::resource::DeletionPolicy;
use crate::token::Token;

pub const READ_DATA_ACTIONS: &[&str] = &[
    "dynamodb:BatchGetItem",
    "dynamodb:GetRecords",
    "dynamodb:GetShardIterator",
    "dynamodb:Query",
    "dynamodb:GetItem",
    "dynamodb:Scan",
];

pub const WRITE_DATA_ACTIONS: &[&str] = &[
    "dynamodb:BatchWriteItem",
    "dynamodb:PutItem",
    "dynamodb:UpdateItem",
    "dynamodb:DeleteItem",
];

/// Scalar type of a key attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeType {
    #[serde(rename = "S")]
    String,
    #[serde(rename = "N")]
    Number,
    #[serde(rename = "B")]
    Binary,
}

/// A named key attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub kind: AttributeType,
}

impl Attribute {
    pub fn new(name: impl Into<String>, kind: AttributeType) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// How table capacity is billed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingMode {
    PayPerRequest,
    Provisioned { read_capacity: u32, write_capacity: u32 },
}

impl BillingMode {
    pub fn as_str(self) -> &'static str {
        match self {
            BillingMode::PayPerRequest => "PAY_PER_REQUEST",
            BillingMode::Provisioned { .. } => "PROVISIONED",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeySchemaElement {
    pub attribute_name: String,
    pub key_type: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttributeDefinition {
    pub attribute_name: String,
    pub attribute_type: AttributeType,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProvisionedThroughput {
    pub read_capacity_units: u32,
    pub write_capacity_units: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SseSpecification {
    #[serde(rename = "SSEEnabled")]
    pub sse_enabled: bool,
}

/// `AWS::DynamoDB::Table` properties.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CfnTable {
    pub key_schema: Vec<KeySchemaElement>,
    pub attribute_definitions: Vec<AttributeDefinition>,
    pub billing_mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioned_throughput: Option<ProvisionedThroughput>,
    #[serde(rename = "SSESpecification", skip_serializing_if = "Option::is_none")]
    pub sse_specification: Option<SseSpecification>,
}

/// Construction options for [`Table::new`].
#[derive(Debug, Clone)]
pub struct TableProps {
    pub partition_key: Attribute,
    pub server_side_encryption: bool,
    pub billing_mode: BillingMode,
}

/// Handle to a declared table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    path: ConstructPath,
    logical_id: String,
    partition_key: Attribute,
    billing_mode: BillingMode,
    encrypted: bool,
}

impl Table {
    pub fn new(scope: &mut Scope<'_>, id: &str, props: TableProps) -> Result<Self> {
        let mut node = scope.child(id)?;
        let provisioned_throughput = match props.billing_mode {
            BillingMode::PayPerRequest => None,
            BillingMode::Provisioned {
                read_capacity,
                write_capacity,
            } => Some(ProvisionedThroughput {
                read_capacity_units: read_capacity,
                write_capacity_units: write_capacity,
            }),
        };

        let logical_id = node.add_resource(
            "Resource",
            CfnTable {
                key_schema: vec![KeySchemaElement {
                    attribute_name: props.partition_key.name.clone(),
                    key_type: "HASH",
                }],
                attribute_definitions: vec![AttributeDefinition {
                    attribute_name: props.partition_key.name.clone(),
                    attribute_type: props.partition_key.kind,
                }],
                billing_mode: props.billing_mode.as_str(),
                provisioned_throughput,
                sse_specification: props
                    .server_side_encryption
                    .then_some(SseSpecification { sse_enabled: true }),
            },
        )?;
        // Tables hold data; keep it when the stack is torn down.
        node.graph_mut()
            .set_deletion_policy(&logical_id, DeletionPolicy::Retain)?;

        Ok(Self {
            path: node.path().clone(),
            logical_id,
            partition_key: props.partition_key,
            billing_mode: props.billing_mode,
            encrypted: props.server_side_encryption,
        })
    }

    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    pub fn table_name(&self) -> Token {
        Token::reference(&self.logical_id)
    }

    pub fn table_arn(&self) -> Token {
        Token::get_att(&self.logical_id, "Arn")
    }

    pub fn partition_key(&self) -> &Attribute {
        &self.partition_key
    }

    pub fn billing_mode(&self) -> BillingMode {
        self.billing_mode
    }

    pub fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    /// Permit `grantee` to read items from this table.
    pub fn grant_read_data(&self, scope: &mut Scope<'_>, grantee: &dyn Grantable) -> Result<()> {
        grant(
            scope.graph_mut(),
            grantee,
            READ_DATA_ACTIONS,
            vec![self.table_arn()],
        )?;
        Ok(())
    }

    /// Permit `grantee` to read and write items in this table.
    pub fn grant_read_write_data(
        &self,
        scope: &mut Scope<'_>,
        grantee: &dyn Grantable,
    ) -> Result<()> {
        let actions: Vec<&str> = READ_DATA_ACTIONS
            .iter()
            .chain(WRITE_DATA_ACTIONS)
            .copied()
            .collect();
        grant(scope.graph_mut(), grantee, &actions, vec![self.table_arn()])?;
        Ok(())
    }
}

impl Construct for Table {
    fn node_path(&self) -> &ConstructPath {
        &self.path
    }
}
