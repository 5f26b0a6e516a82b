//! Hit-counter construct.
//!
//! Wraps a downstream function with a handler that records each request
//! path in a table before forwarding the request. Only the handler and the
//! table are exposed; the handler's role is internal.

use std::collections::BTreeMap;

use tracing::info;

use crate::construct::{Construct, ConstructPath, Scope};
use crate::dynamodb::{Attribute, AttributeType, BillingMode, Table, TableProps};
use crate::error::Result;
use crate::execution_role::lambda_execution_role;
use crate::iam::PolicyLookup;
use crate::lambda::{Function, FunctionProps};

pub const DOWNSTREAM_FUNCTION_NAME_ENV: &str = "DOWNSTREAM_FUNCTION_NAME";
pub const HITS_TABLE_NAME_ENV: &str = "HITS_TABLE_NAME";
pub const PARTITION_KEY: &str = "path";

const ROLE_ID: &str = "HitCounterLambdaHanderRole";
const TABLE_ID: &str = "Hits";
const HANDLER_ID: &str = "HitCounterHandler";
const HANDLER_ENTRY_POINT: &str = "hitcounter.handler";

/// Options for [`HitCounter::new`].
#[derive(Debug, Clone)]
pub struct HitCounterProps {
    /// The function whose URL hits are counted.
    pub downstream: Function,
}

/// A counting proxy in front of a downstream function.
#[derive(Debug, Clone)]
pub struct HitCounter {
    path: ConstructPath,
    handler: Function,
    table: Table,
}

impl HitCounter {
    /// The handler reuses the downstream function's runtime and code asset.
    pub fn new(
        scope: &mut Scope<'_>,
        id: &str,
        props: HitCounterProps,
        policies: &dyn PolicyLookup,
    ) -> Result<Self> {
        let mut node = scope.child(id)?;
        let role = lambda_execution_role(&mut node, ROLE_ID, policies)?;

        let table = Table::new(
            &mut node,
            TABLE_ID,
            TableProps {
                partition_key: Attribute::new(PARTITION_KEY, AttributeType::String),
                server_side_encryption: true,
                billing_mode: BillingMode::PayPerRequest,
            },
        )?;

        let downstream = props.downstream;
        let environment = BTreeMap::from([
            (
                DOWNSTREAM_FUNCTION_NAME_ENV.to_string(),
                downstream.function_name(),
            ),
            (HITS_TABLE_NAME_ENV.to_string(), table.table_name()),
        ]);
        let handler = Function::new(
            &mut node,
            HANDLER_ID,
            FunctionProps {
                runtime: downstream.runtime(),
                code: downstream.code().clone(),
                handler: HANDLER_ENTRY_POINT.to_string(),
                role,
                environment,
            },
        )?;

        table.grant_read_write_data(&mut node, &handler)?;
        downstream.grant_invoke(&mut node, &handler)?;

        info!(
            construct = %node.path(),
            handler = %handler.logical_id(),
            table = %table.logical_id(),
            "declared hit counter"
        );
        Ok(Self {
            path: node.path().clone(),
            handler,
            table,
        })
    }

    /// The counting function; route traffic here instead of the downstream.
    pub fn handler(&self) -> &Function {
        &self.handler
    }

    /// The table of per-path hit counts.
    pub fn table(&self) -> &Table {
        &self.table
    }
}

impl Construct for HitCounter {
    fn node_path(&self) -> &ConstructPath {
        &self.path
    }
}
