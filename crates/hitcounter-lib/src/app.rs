//! The root of the construct tree: a set of stacks synthesized together.

use crate::assembly::{CloudAssembly, StackArtifact};
use crate::error::{Error, Result};
use crate::stack::Stack;

#[derive(Debug, Clone, Default)]
pub struct App {
    stacks: Vec<Stack>,
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a stack. Stack names are unique within an app.
    pub fn add_stack(&mut self, stack: Stack) -> Result<()> {
        if self.stacks.iter().any(|s| s.name() == stack.name()) {
            return Err(Error::DuplicateConstructId {
                scope: "App".to_string(),
                id: stack.name().to_string(),
            });
        }
        self.stacks.push(stack);
        Ok(())
    }

    pub fn stacks(&self) -> &[Stack] {
        &self.stacks
    }

    /// Synthesize every stack. The first failing stack aborts synthesis.
    pub fn synth(&self) -> Result<CloudAssembly> {
        let mut artifacts = Vec::with_capacity(self.stacks.len());
        for stack in &self.stacks {
            let template = stack.synthesize()?;
            let props = stack.props();
            artifacts.push(StackArtifact {
                name: stack.name().to_string(),
                environment: props.env.clone().unwrap_or_default().to_uri(),
                tags: props.tags.clone(),
                termination_protection: props.termination_protection.unwrap_or(false),
                template,
                assets: stack.graph().assets().cloned().collect(),
            });
        }
        Ok(CloudAssembly::new(artifacts))
    }
}
