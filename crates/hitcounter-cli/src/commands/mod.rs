// Module exports for CLI subcommands.
//
// Each module handles one subcommand; main.rs only parses arguments and
// dispatches. Stack construction shared by every subcommand lives here.

pub mod ls;
pub mod synth;

use anyhow::{Context, Result};
use clap::Args;

use hitcounter_lib::{AppConfig, WorkshopStack};

/// Stack property overrides accepted by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct StackArgs {
    /// Add or override a stack tag. May be repeated.
    #[arg(long = "tag", value_name = "KEY=VALUE", value_parser = parse_tag)]
    pub tags: Vec<(String, String)>,

    /// Template description.
    #[arg(long)]
    pub description: Option<String>,
}

/// Parse a `KEY=VALUE` tag argument.
pub fn parse_tag(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}

/// Build the workshop stack from configuration plus command-line overrides.
///
/// Command-line tags and description win over the configuration file, which
/// in turn wins over the default tag set.
pub fn build_stack(config: &AppConfig, args: &StackArgs) -> Result<WorkshopStack> {
    let mut props = config.props.clone();
    for (key, value) in &args.tags {
        props.tags.insert(key.clone(), value.clone());
    }
    if let Some(description) = &args.description {
        props.description = Some(description.clone());
    }

    WorkshopStack::new(&config.stack_name, Some(props), config)
        .with_context(|| format!("failed to build stack {}", config.stack_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_tag_splits_on_first_equals() {
        assert_eq!(
            parse_tag("owner=team=a").unwrap(),
            ("owner".to_string(), "team=a".to_string())
        );
        assert_eq!(parse_tag("empty=").unwrap(), ("empty".to_string(), String::new()));
    }

    #[test]
    fn parse_tag_rejects_missing_key() {
        assert!(parse_tag("novalue").is_err());
        assert!(parse_tag("=value").is_err());
    }

    #[test]
    fn overrides_win_over_config_and_defaults() {
        let args = StackArgs {
            tags: vec![("lm_app_env".to_string(), "prod".to_string())],
            description: Some("overridden".to_string()),
        };
        let workshop = build_stack(&AppConfig::default(), &args).unwrap();
        let props = workshop.stack().props();
        assert_eq!(props.tags["lm_app_env"], "prod");
        assert_eq!(props.tags["lm_sbu"], "global-risk-solutions");
        assert_eq!(props.description.as_deref(), Some("overridden"));
    }
}
