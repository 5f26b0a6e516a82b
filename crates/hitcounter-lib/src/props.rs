//! Stack properties and the default tag set.
//!
//! Caller-supplied properties are deep-merged over the defaults: any value the
//! caller sets wins, and anything left unset (including individual tag keys)
//! falls back to the default.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Tags applied to every taggable resource unless the caller overrides them.
pub const DEFAULT_TAGS: [(&str, &str); 7] = [
    ("name", "lm-aws-cdk-intro-workshop-sandbox"),
    ("artifactKey", "lm-aws-cdk-intro-workshop"),
    ("lm_app", "aws-lm-aws-cdk-intro-workshop"),
    ("lm_app_env", "sandbox"),
    ("lm_sbu", "global-risk-solutions"),
    ("lm_troux_uid", "3FF608EC-F029-47A6-A652-125D290B7A01"),
    ("deployment_guid", "1c5a72cd-5223-477c-8d0e-14fa2de2e027"),
];

/// Target account and region. Unset values stay environment-agnostic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl Environment {
    /// Cloud-assembly environment string, `aws://<account>/<region>`.
    pub fn to_uri(&self) -> String {
        format!(
            "aws://{}/{}",
            self.account.as_deref().unwrap_or("unknown-account"),
            self.region.as_deref().unwrap_or("unknown-region")
        )
    }

    fn defaults_deep(self, defaults: &Environment) -> Environment {
        Environment {
            account: self.account.or_else(|| defaults.account.clone()),
            region: self.region.or_else(|| defaults.region.clone()),
        }
    }
}

/// Descriptive properties of a stack. None of these change resource behavior.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackProps {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<Environment>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub termination_protection: Option<bool>,
}

impl StackProps {
    /// Properties carrying only [`DEFAULT_TAGS`].
    pub fn workshop_defaults() -> Self {
        Self {
            tags: DEFAULT_TAGS
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..Self::default()
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Fill every unset field of `self` from `defaults`, recursing into
    /// `env` and `tags`. Values present in `self` are never replaced.
    pub fn defaults_deep(self, defaults: &StackProps) -> StackProps {
        let env = match (self.env, &defaults.env) {
            (Some(env), Some(fallback)) => Some(env.defaults_deep(fallback)),
            (Some(env), None) => Some(env),
            (None, fallback) => fallback.clone(),
        };

        let mut tags = defaults.tags.clone();
        tags.extend(self.tags);

        StackProps {
            description: self.description.or_else(|| defaults.description.clone()),
            env,
            tags,
            termination_protection: self
                .termination_protection
                .or(defaults.termination_protection),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_merges_field_by_field() {
        let defaults = StackProps {
            env: Some(Environment {
                account: Some("111111111111".into()),
                region: Some("us-east-1".into()),
            }),
            ..StackProps::default()
        };
        let caller = StackProps {
            env: Some(Environment {
                account: None,
                region: Some("eu-west-1".into()),
            }),
            ..StackProps::default()
        };

        let merged = caller.defaults_deep(&defaults);
        let env = merged.env.unwrap();
        assert_eq!(env.account.as_deref(), Some("111111111111"));
        assert_eq!(env.region.as_deref(), Some("eu-west-1"));
        assert_eq!(env.to_uri(), "aws://111111111111/eu-west-1");
    }

    #[test]
    fn deserializes_camel_case_props() {
        let props: StackProps = serde_json::from_str(
            r#"{"description":"demo","terminationProtection":true,"tags":{"lm_app_env":"prod"}}"#,
        )
        .unwrap();
        assert_eq!(props.description.as_deref(), Some("demo"));
        assert_eq!(props.termination_protection, Some(true));
        assert_eq!(props.tags.get("lm_app_env").map(String::as_str), Some("prod"));
    }
}
