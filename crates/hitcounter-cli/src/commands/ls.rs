//! Ls command handler for listing the resources of the stack.

use anyhow::Result;

use hitcounter_lib::AppConfig;

use super::{build_stack, StackArgs};
use crate::terminal::ColorPalette;

/// Handle the ls subcommand.
///
/// Prints one line per resource in declaration order: construct path,
/// resource type and logical id.
pub fn handle_ls(config: &AppConfig, args: &StackArgs) -> Result<()> {
    let workshop = build_stack(config, args)?;
    let stack = workshop.stack();
    let palette = ColorPalette::detect();

    println!("{}{}{}", palette.bold, stack.name(), palette.reset);
    for line in resource_lines(&workshop, &palette) {
        println!("{line}");
    }
    Ok(())
}

fn resource_lines(workshop: &hitcounter_lib::WorkshopStack, palette: &ColorPalette) -> Vec<String> {
    let resources = workshop.stack().graph().resources();
    let width = resources
        .iter()
        .map(|entry| entry.path.to_string().len())
        .max()
        .unwrap_or(0);

    resources
        .iter()
        .map(|entry| {
            format!(
                "{gray}{path:<width$}{reset}  {cyan}{kind}{reset}  {id}",
                path = entry.path.to_string(),
                kind = entry.type_name(),
                id = entry.logical_id,
                gray = palette.gray,
                cyan = palette.cyan,
                reset = palette.reset,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_lines_list_every_resource() {
        let workshop = build_stack(&AppConfig::default(), &StackArgs::default()).unwrap();
        let lines = resource_lines(&workshop, &ColorPalette::plain());
        assert_eq!(lines.len(), workshop.stack().graph().resources().len());
        assert!(lines
            .iter()
            .any(|line| line.contains("HelloHitCounter/Hits") && line.contains("AWS::DynamoDB::Table")));
        assert!(lines.iter().all(|line| !line.contains('\x1b')));
    }
}
