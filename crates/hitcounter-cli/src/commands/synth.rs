//! Synth command handler: render the stack template.

use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use hitcounter_lib::{App, AppConfig};

use super::{build_stack, StackArgs};

/// Handle the synth subcommand.
///
/// Without `output` the template is printed to stdout. With it, every
/// template and `manifest.json` are written to the directory and the written
/// paths are printed instead.
pub fn handle_synth(config: &AppConfig, args: &StackArgs, output: Option<&Path>) -> Result<()> {
    let workshop = build_stack(config, args)?;
    let mut app = App::new();
    app.add_stack(workshop.into_stack())?;
    let assembly = app.synth().context("failed to synthesize the stack")?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    match output {
        Some(dir) => {
            let written = assembly
                .write_to(dir)
                .with_context(|| format!("failed to write assembly to {}", dir.display()))?;
            for path in written {
                writeln!(handle, "{}", path.display())?;
            }
        }
        None => {
            for artifact in assembly.stacks() {
                writeln!(handle, "{}", artifact.template.to_json_pretty()?)?;
            }
        }
    }

    info!(stacks = assembly.stacks().len(), "synth complete");
    Ok(())
}
