//! A deployable unit: one resource graph, one template.

use crate::construct::{ConstructPath, Scope};
use crate::error::{Error, Result};
use crate::graph::ResourceGraph;
use crate::props::StackProps;
use crate::synth::{synthesize, Template};

const MAX_STACK_NAME_LEN: usize = 128;

/// A named stack owning its resource graph.
#[derive(Debug, Clone)]
pub struct Stack {
    name: String,
    props: StackProps,
    graph: ResourceGraph,
}

impl Stack {
    /// Create an empty stack. `props` are used as given; merge defaults first.
    pub fn new(name: &str, props: StackProps) -> Result<Self> {
        validate_stack_name(name)?;
        Ok(Self {
            name: name.to_string(),
            props,
            graph: ResourceGraph::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn props(&self) -> &StackProps {
        &self.props
    }

    pub fn graph(&self) -> &ResourceGraph {
        &self.graph
    }

    /// Scope positioned at the stack root.
    pub fn root(&mut self) -> Scope<'_> {
        Scope::new(&mut self.graph, ConstructPath::root())
    }

    /// Validate references and render the CloudFormation template.
    pub fn synthesize(&self) -> Result<Template> {
        synthesize(self)
    }
}

fn validate_stack_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = name.len() <= MAX_STACK_NAME_LEN
        && chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-');
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidStackName {
            name: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stack_names_follow_cloudformation_rules() {
        assert!(Stack::new("CdkWorkshopStack", StackProps::default()).is_ok());
        assert!(Stack::new("hit-counter-2", StackProps::default()).is_ok());
        assert!(matches!(
            Stack::new("2fast", StackProps::default()),
            Err(Error::InvalidStackName { .. })
        ));
        assert!(Stack::new("bad_name", StackProps::default()).is_err());
        assert!(Stack::new("", StackProps::default()).is_err());
    }
}
