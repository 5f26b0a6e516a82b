//! Cloud assembly: synthesized templates plus the manifest that describes them.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::error::Result;
use crate::graph::Asset;
use crate::synth::Template;

/// Manifest schema version written to `manifest.json`.
pub const MANIFEST_VERSION: &str = "1.0.0";
pub const MANIFEST_FILE: &str = "manifest.json";

/// One synthesized stack.
#[derive(Debug, Clone)]
pub struct StackArtifact {
    pub name: String,
    pub environment: String,
    pub tags: BTreeMap<String, String>,
    pub termination_protection: bool,
    pub template: Template,
    pub assets: Vec<Asset>,
}

impl StackArtifact {
    pub fn template_file(&self) -> String {
        format!("{}.template.json", self.name)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ArtifactProperties<'a> {
    template_file: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    tags: &'a BTreeMap<String, String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    termination_protection: bool,
}

#[derive(Serialize)]
struct ManifestArtifact<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    environment: &'a str,
    properties: ArtifactProperties<'a>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    metadata: BTreeMap<String, Vec<Value>>,
}

#[derive(Serialize)]
struct Manifest<'a> {
    version: &'static str,
    artifacts: BTreeMap<&'a str, ManifestArtifact<'a>>,
}

/// The output of synthesizing an app.
#[derive(Debug, Clone, Default)]
pub struct CloudAssembly {
    stacks: Vec<StackArtifact>,
}

impl CloudAssembly {
    pub(crate) fn new(stacks: Vec<StackArtifact>) -> Self {
        Self { stacks }
    }

    pub fn stacks(&self) -> &[StackArtifact] {
        &self.stacks
    }

    /// Render `manifest.json`.
    pub fn manifest(&self) -> Result<Value> {
        let mut artifacts = BTreeMap::new();
        for stack in &self.stacks {
            let mut metadata = BTreeMap::new();
            if !stack.assets.is_empty() {
                let entries = stack
                    .assets
                    .iter()
                    .map(|asset| {
                        serde_json::to_value(asset)
                            .map(|data| serde_json::json!({"type": "aws:cdk:asset", "data": data}))
                    })
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                metadata.insert(format!("/{}", stack.name), entries);
            }
            artifacts.insert(
                stack.name.as_str(),
                ManifestArtifact {
                    kind: "aws:cloudformation:stack",
                    environment: &stack.environment,
                    properties: ArtifactProperties {
                        template_file: stack.template_file(),
                        tags: &stack.tags,
                        termination_protection: stack.termination_protection,
                    },
                    metadata,
                },
            );
        }

        Ok(serde_json::to_value(Manifest {
            version: MANIFEST_VERSION,
            artifacts,
        })?)
    }

    /// Write every template and the manifest into `dir`, creating it if needed.
    /// Returns the written paths.
    pub fn write_to(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(dir)?;
        let mut written = Vec::with_capacity(self.stacks.len() + 1);

        for stack in &self.stacks {
            let path = dir.join(stack.template_file());
            fs::write(&path, stack.template.to_json_pretty()?)?;
            written.push(path);
        }

        let manifest_path = dir.join(MANIFEST_FILE);
        fs::write(&manifest_path, serde_json::to_string_pretty(&self.manifest()?)?)?;
        written.push(manifest_path);

        info!(dir = %dir.display(), files = written.len(), "wrote cloud assembly");
        Ok(written)
    }
}
