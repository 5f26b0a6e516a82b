//! Per-stack registry of construct nodes, resources, parameters and outputs.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::construct::ConstructPath;
use crate::error::{Error, Result};
use crate::resource::{DeletionPolicy, ResourceEntry, ResourceProperties};
use crate::token::Token;

/// A template parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Parameter {
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(rename = "Description")]
    pub description: String,
}

/// A template output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Output {
    #[serde(rename = "Value")]
    pub value: Token,
}

/// A code directory shipped alongside the template.
///
/// The fingerprint covers the asset path only; the directory contents are
/// opaque to synthesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub path: String,
    pub fingerprint: String,
    pub packaging: &'static str,
    pub s3_bucket_parameter: String,
    pub s3_key_parameter: String,
    pub artifact_hash_parameter: String,
}

impl Asset {
    pub fn bucket(&self) -> Token {
        Token::reference(&self.s3_bucket_parameter)
    }

    pub fn key(&self) -> Token {
        Token::reference(&self.s3_key_parameter)
    }
}

/// Everything declared inside one stack.
#[derive(Debug, Clone, Default)]
pub struct ResourceGraph {
    nodes: BTreeSet<ConstructPath>,
    resources: Vec<ResourceEntry>,
    index: HashMap<String, usize>,
    parameters: BTreeMap<String, Parameter>,
    outputs: BTreeMap<String, Output>,
    assets: BTreeMap<String, Asset>,
}

impl ResourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register_node(&mut self, path: &ConstructPath) -> Result<()> {
        if !self.nodes.insert(path.clone()) {
            let parent = &path.components()[..path.components().len().saturating_sub(1)];
            return Err(Error::DuplicateConstructId {
                scope: ConstructPath::from_components(parent.iter().cloned()).to_string(),
                id: path.id().to_string(),
            });
        }
        Ok(())
    }

    pub fn has_node(&self, path: &ConstructPath) -> bool {
        self.nodes.contains(path)
    }

    /// Every declared construct path, in sorted order.
    pub fn nodes(&self) -> impl Iterator<Item = &ConstructPath> {
        self.nodes.iter()
    }

    /// Fail when the logical id derived from `path` is already taken by a
    /// resource or parameter.
    pub(crate) fn check_logical_id(&self, path: &ConstructPath) -> Result<String> {
        let logical_id = path.logical_id();
        if self.index.contains_key(&logical_id) || self.parameters.contains_key(&logical_id) {
            return Err(Error::DuplicateLogicalId {
                logical_id,
                path: path.to_string(),
            });
        }
        Ok(logical_id)
    }

    pub(crate) fn insert_resource(
        &mut self,
        path: ConstructPath,
        properties: impl Into<ResourceProperties>,
    ) -> Result<String> {
        let logical_id = self.check_logical_id(&path)?;

        let properties = properties.into();
        debug!(
            logical_id = %logical_id,
            path = %path,
            resource_type = properties.type_name(),
            "declared resource"
        );
        self.index.insert(logical_id.clone(), self.resources.len());
        self.resources.push(ResourceEntry {
            path,
            logical_id: logical_id.clone(),
            properties,
            depends_on: BTreeSet::new(),
            deletion_policy: None,
            metadata: BTreeMap::new(),
        });
        Ok(logical_id)
    }

    /// Resources in declaration order.
    pub fn resources(&self) -> &[ResourceEntry] {
        &self.resources
    }

    pub fn resource(&self, logical_id: &str) -> Option<&ResourceEntry> {
        self.index.get(logical_id).map(|&i| &self.resources[i])
    }

    pub(crate) fn resource_mut(&mut self, logical_id: &str) -> Option<&mut ResourceEntry> {
        match self.index.get(logical_id) {
            Some(&i) => Some(&mut self.resources[i]),
            None => None,
        }
    }

    pub fn resources_of_type<'a>(
        &'a self,
        type_name: &'a str,
    ) -> impl Iterator<Item = &'a ResourceEntry> + 'a {
        self.resources
            .iter()
            .filter(move |entry| entry.properties.type_name() == type_name)
    }

    /// Add an explicit `DependsOn` edge between two declared resources.
    pub(crate) fn add_dependency(&mut self, from: &str, to: &str) -> Result<()> {
        if !self.index.contains_key(to) {
            return Err(Error::UnresolvedReference {
                source_id: from.to_string(),
                target: to.to_string(),
            });
        }
        let entry = self
            .resource_mut(from)
            .ok_or_else(|| Error::UnresolvedReference {
                source_id: to.to_string(),
                target: from.to_string(),
            })?;
        entry.depends_on.insert(to.to_string());
        Ok(())
    }

    pub(crate) fn set_deletion_policy(
        &mut self,
        logical_id: &str,
        policy: DeletionPolicy,
    ) -> Result<()> {
        let entry = self
            .resource_mut(logical_id)
            .ok_or_else(|| Error::UnresolvedReference {
                source_id: "DeletionPolicy".to_string(),
                target: logical_id.to_string(),
            })?;
        entry.deletion_policy = Some(policy);
        Ok(())
    }

    pub(crate) fn add_metadata(
        &mut self,
        logical_id: &str,
        key: &str,
        value: impl Into<String>,
    ) -> Result<()> {
        let entry = self
            .resource_mut(logical_id)
            .ok_or_else(|| Error::UnresolvedReference {
                source_id: "Metadata".to_string(),
                target: logical_id.to_string(),
            })?;
        entry.metadata.insert(key.to_string(), value.into());
        Ok(())
    }

    pub fn parameters(&self) -> &BTreeMap<String, Parameter> {
        &self.parameters
    }

    pub fn outputs(&self) -> &BTreeMap<String, Output> {
        &self.outputs
    }

    pub(crate) fn add_output(&mut self, path: &ConstructPath, value: Token) -> Result<String> {
        self.register_node(path)?;
        let logical_id = path.logical_id();
        self.outputs.insert(logical_id.clone(), Output { value });
        Ok(logical_id)
    }

    pub fn assets(&self) -> impl Iterator<Item = &Asset> {
        self.assets.values()
    }

    /// Register a code asset, reusing parameters when the path was seen before.
    pub fn add_asset(&mut self, path: &Path) -> Asset {
        let rendered = path.to_string_lossy().into_owned();
        let fingerprint = hex::encode(Sha256::digest(rendered.as_bytes()));
        if let Some(existing) = self.assets.get(&fingerprint) {
            return existing.clone();
        }

        let prefix = format!("AssetParameters{fingerprint}");
        let asset = Asset {
            path: rendered,
            fingerprint: fingerprint.clone(),
            packaging: "zip",
            s3_bucket_parameter: format!("{prefix}S3Bucket"),
            s3_key_parameter: format!("{prefix}S3VersionKey"),
            artifact_hash_parameter: format!("{prefix}ArtifactHash"),
        };

        for (name, description) in [
            (&asset.s3_bucket_parameter, "S3 bucket for asset"),
            (&asset.s3_key_parameter, "S3 key for asset version"),
            (&asset.artifact_hash_parameter, "Artifact hash for asset"),
        ] {
            self.parameters.insert(
                name.clone(),
                Parameter {
                    kind: "String".to_string(),
                    description: format!("{description} \"{fingerprint}\""),
                },
            );
        }
        debug!(path = %asset.path, fingerprint = %fingerprint, "registered asset");
        self.assets.insert(fingerprint, asset.clone());
        asset
    }
}
