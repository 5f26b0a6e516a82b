//! Template synthesis.
//!
//! Synthesis is the point where the graph must be closed: every `Ref`,
//! `Fn::GetAtt` and `DependsOn` target has to be declared in the same stack,
//! and resource dependencies must form a DAG.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::info;

use crate::error::{Error, Result};
use crate::resource::ResourceEntry;
use crate::stack::Stack;
use crate::token::collect_json_references;

pub const CDK_PATH_METADATA: &str = "aws:cdk:path";

/// A rendered CloudFormation template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Template {
    #[serde(rename = "Description", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "Parameters", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, Value>,
    #[serde(rename = "Resources", default)]
    pub resources: BTreeMap<String, Value>,
    #[serde(rename = "Outputs", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, Value>,
}

impl Template {
    /// Resources of `type_name`, keyed by logical id.
    pub fn resources_of_type<'a>(&'a self, type_name: &'a str) -> Vec<(&'a str, &'a Value)> {
        self.resources
            .iter()
            .filter(|(_, resource)| resource["Type"] == type_name)
            .map(|(id, resource)| (id.as_str(), resource))
            .collect()
    }

    pub fn count_of_type(&self, type_name: &str) -> usize {
        self.resources_of_type(type_name).len()
    }

    pub fn resource(&self, logical_id: &str) -> Option<&Value> {
        self.resources.get(logical_id)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Validate and render `stack`.
pub fn synthesize(stack: &Stack) -> Result<Template> {
    let graph = stack.graph();

    let mut rendered: Vec<(&ResourceEntry, Value)> = Vec::with_capacity(graph.resources().len());
    for entry in graph.resources() {
        rendered.push((entry, entry.properties_json()?));
    }

    let resource_ids: BTreeSet<&str> = graph
        .resources()
        .iter()
        .map(|entry| entry.logical_id.as_str())
        .collect();
    let is_declared =
        |target: &str| resource_ids.contains(target) || graph.parameters().contains_key(target);

    let mut edges: HashMap<&str, BTreeSet<String>> = HashMap::new();
    for (entry, properties) in &rendered {
        let mut targets = BTreeSet::new();
        collect_json_references(properties, &mut targets);
        targets.extend(entry.depends_on.iter().cloned());

        if let Some(missing) = targets.iter().find(|target| !is_declared(target.as_str())) {
            return Err(Error::UnresolvedReference {
                source_id: entry.logical_id.clone(),
                target: missing.clone(),
            });
        }
        targets.retain(|target| resource_ids.contains(target.as_str()));
        edges.insert(entry.logical_id.as_str(), targets);
    }

    let mut outputs = BTreeMap::new();
    for (id, output) in graph.outputs() {
        let value = serde_json::to_value(output)?;
        let mut targets = BTreeSet::new();
        collect_json_references(&value, &mut targets);
        if let Some(missing) = targets.iter().find(|target| !is_declared(target.as_str())) {
            return Err(Error::UnresolvedReference {
                source_id: id.clone(),
                target: missing.clone(),
            });
        }
        outputs.insert(id.clone(), value);
    }

    detect_cycle(&edges)?;

    let tags = render_tags(&stack.props().tags);
    let mut resources = BTreeMap::new();
    for (entry, properties) in rendered {
        resources.insert(
            entry.logical_id.clone(),
            render_resource(stack.name(), entry, properties, tags.as_ref()),
        );
    }

    let mut parameters = BTreeMap::new();
    for (name, parameter) in graph.parameters() {
        parameters.insert(name.clone(), serde_json::to_value(parameter)?);
    }

    info!(
        stack = stack.name(),
        resources = resources.len(),
        parameters = parameters.len(),
        outputs = outputs.len(),
        "synthesized stack"
    );
    Ok(Template {
        description: stack.props().description.clone(),
        parameters,
        resources,
        outputs,
    })
}

fn render_tags(tags: &BTreeMap<String, String>) -> Option<Value> {
    if tags.is_empty() {
        return None;
    }
    Some(Value::Array(
        tags.iter()
            .map(|(key, value)| json!({"Key": key, "Value": value}))
            .collect(),
    ))
}

fn render_resource(
    stack_name: &str,
    entry: &ResourceEntry,
    mut properties: Value,
    tags: Option<&Value>,
) -> Value {
    if let (true, Some(tags), Value::Object(map)) =
        (entry.properties.is_taggable(), tags, &mut properties)
    {
        map.insert("Tags".to_string(), tags.clone());
    }

    let mut resource = Map::new();
    resource.insert("Type".to_string(), json!(entry.type_name()));
    resource.insert("Properties".to_string(), properties);
    if !entry.depends_on.is_empty() {
        resource.insert("DependsOn".to_string(), json!(entry.depends_on));
    }
    if let Some(policy) = entry.deletion_policy {
        resource.insert("UpdateReplacePolicy".to_string(), json!(policy));
        resource.insert("DeletionPolicy".to_string(), json!(policy));
    }

    let mut metadata = Map::new();
    metadata.insert(
        CDK_PATH_METADATA.to_string(),
        json!(format!("{stack_name}/{}", entry.path)),
    );
    for (key, value) in &entry.metadata {
        metadata.insert(key.clone(), json!(value));
    }
    resource.insert("Metadata".to_string(), Value::Object(metadata));
    Value::Object(resource)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// Depth-first search over resource edges; reports the first cycle found.
fn detect_cycle(edges: &HashMap<&str, BTreeSet<String>>) -> Result<()> {
    let mut marks: HashMap<&str, Mark> = HashMap::new();
    let mut roots: Vec<&str> = edges.keys().copied().collect();
    roots.sort_unstable();

    for root in roots {
        if marks.contains_key(root) {
            continue;
        }
        let Some(targets) = edges.get(root) else {
            continue;
        };
        let mut stack: Vec<&str> = vec![root];
        let mut cursor = vec![targets.iter()];
        marks.insert(root, Mark::Visiting);

        while let Some(iter) = cursor.last_mut() {
            let Some(next) = iter.next() else {
                cursor.pop();
                if let Some(done) = stack.pop() {
                    marks.insert(done, Mark::Done);
                }
                continue;
            };
            let next = next.as_str();
            match (marks.get(next).copied(), edges.get(next)) {
                (Some(Mark::Done), _) => {}
                (Some(Mark::Visiting), _) => {
                    let start = stack.iter().position(|id| *id == next).unwrap_or(0);
                    let mut cycle: Vec<String> =
                        stack[start..].iter().map(|id| id.to_string()).collect();
                    cycle.push(next.to_string());
                    return Err(Error::DependencyCycle { cycle });
                }
                (None, Some(targets)) => {
                    marks.insert(next, Mark::Visiting);
                    stack.push(next);
                    cursor.push(targets.iter());
                }
                (None, None) => {
                    marks.insert(next, Mark::Done);
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edges<'a>(pairs: &[(&'a str, &[&str])]) -> HashMap<&'a str, BTreeSet<String>> {
        pairs
            .iter()
            .map(|(from, to)| (*from, to.iter().map(|s| s.to_string()).collect()))
            .collect()
    }

    #[test]
    fn acyclic_graph_passes() {
        let graph = edges(&[("A", &["B", "C"]), ("B", &["C"]), ("C", &[])]);
        assert!(detect_cycle(&graph).is_ok());
    }

    #[test]
    fn reports_cycle_path() {
        let graph = edges(&[("A", &["B"]), ("B", &["C"]), ("C", &["A"])]);
        match detect_cycle(&graph) {
            Err(Error::DependencyCycle { cycle }) => {
                assert_eq!(cycle, vec!["A", "B", "C", "A"]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let graph = edges(&[("A", &["A"])]);
        assert!(matches!(
            detect_cycle(&graph),
            Err(Error::DependencyCycle { .. })
        ));
    }
}
