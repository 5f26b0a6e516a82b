//! Hit counter infrastructure library.
//!
//! This crate models the workshop application as a construct tree: a stack
//! owns a resource graph, constructs declare resources into it through a
//! [`Scope`], and synthesis renders the graph as a CloudFormation template.
//! The CLI and tests should build stacks through the types exported here
//! instead of assembling templates by hand.
//!

#![deny(warnings)]

pub mod apigateway;
pub mod app;
pub mod assembly;
pub mod config;
pub mod construct;
pub mod dynamodb;
pub mod error;
pub mod execution_role;
pub mod graph;
pub mod hitcounter;
pub mod iam;
pub mod lambda;
pub mod props;
pub mod resource;
pub mod stack;
pub mod synth;
pub mod table_viewer;
pub mod token;
pub mod workshop;

pub use apigateway::{LambdaRestApi, LambdaRestApiProps, ProxyResource};
pub use app::App;
pub use assembly::{CloudAssembly, StackArtifact};
pub use config::AppConfig;
pub use construct::{Construct, ConstructPath, Scope};
pub use dynamodb::{Table, TableProps};
pub use error::{Error, Result};
pub use execution_role::lambda_execution_role;
pub use graph::ResourceGraph;
pub use hitcounter::{HitCounter, HitCounterProps};
pub use iam::{PolicyCatalog, PolicyLookup, PolicyStatement, Role};
pub use lambda::{Code, Function, FunctionProps, Runtime};
pub use props::{StackProps, DEFAULT_TAGS};
pub use stack::Stack;
pub use synth::Template;
pub use table_viewer::{TableViewer, TableViewerProps};
pub use token::Token;
pub use workshop::WorkshopStack;
