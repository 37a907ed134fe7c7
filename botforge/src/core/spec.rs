//! Bot specification: the immutable input to one pipeline run.
//!
//! A [`BotSpec`] can only be built through [`BotSpec::try_from`] on a raw
//! [`BotSpecInput`], so the name is always a normalized slug and both length
//! rules hold for every value the pipeline sees.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest slug kept after normalization.
pub const MAX_NAME_LEN: usize = 64;
pub const MIN_NAME_LEN: usize = 2;
pub const MIN_DESCRIPTION_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecError {
    #[error("name must be at least {MIN_NAME_LEN} characters after normalization (got {0:?})")]
    NameTooShort(String),
    #[error("description must be at least {MIN_DESCRIPTION_LEN} characters")]
    DescriptionTooShort,
}

/// Target platform of the generated bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Platform {
    Telegram,
    Discord,
    Slack,
    Cli,
    WebApi,
    Custom,
}

impl Platform {
    pub const ALL: [Platform; 6] = [
        Platform::Telegram,
        Platform::Discord,
        Platform::Slack,
        Platform::Cli,
        Platform::WebApi,
        Platform::Custom,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Telegram => "telegram",
            Self::Discord => "discord",
            Self::Slack => "slack",
            Self::Cli => "cli",
            Self::WebApi => "web-api",
            Self::Custom => "custom",
        }
    }

    /// One-line description for listings.
    pub fn summary(self) -> &'static str {
        match self {
            Self::Telegram => "Telegram bot using python-telegram-bot",
            Self::Discord => "Discord bot using discord.py",
            Self::Slack => "Slack app using slack-bolt",
            Self::Cli => "Command-line tool using click",
            Self::WebApi => "HTTP service using FastAPI",
            Self::Custom => "Plain Python project with no platform SDK",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|p| p.as_str() == s)
            .copied()
            .ok_or_else(|| format!("Invalid platform: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An environment variable the generated bot reads at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVarSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl EnvVarSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Unvalidated specification as it arrives from a front end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotSpecInput {
    pub name: String,
    pub platform: Platform,
    pub description: String,
    #[serde(default = "default_features")]
    pub features: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub env_vars: Vec<EnvVarSpec>,
    #[serde(default = "default_true")]
    pub include_docker: bool,
    #[serde(default = "default_true")]
    pub include_ci: bool,
    #[serde(default = "default_true")]
    pub include_tests: bool,
    #[serde(default)]
    pub logging_level: LogLevel,
}

fn default_features() -> Vec<String> {
    vec!["echo".to_string()]
}

fn default_true() -> bool {
    true
}

impl BotSpecInput {
    /// Minimal input with every optional field at its default.
    pub fn new(
        name: impl Into<String>,
        platform: Platform,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            platform,
            description: description.into(),
            features: default_features(),
            dependencies: Vec::new(),
            env_vars: Vec::new(),
            include_docker: true,
            include_ci: true,
            include_tests: true,
            logging_level: LogLevel::default(),
        }
    }
}

/// Validated specification. Fields are read-only once accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BotSpecInput")]
pub struct BotSpec {
    pub name: String,
    pub platform: Platform,
    pub description: String,
    pub features: Vec<String>,
    pub dependencies: Vec<String>,
    pub env_vars: Vec<EnvVarSpec>,
    pub include_docker: bool,
    pub include_ci: bool,
    pub include_tests: bool,
    pub logging_level: LogLevel,
}

impl TryFrom<BotSpecInput> for BotSpec {
    type Error = SpecError;

    fn try_from(input: BotSpecInput) -> Result<Self, Self::Error> {
        let name = slugify(&input.name, MAX_NAME_LEN);
        if name.chars().count() < MIN_NAME_LEN {
            return Err(SpecError::NameTooShort(name));
        }
        let description = input.description.trim().to_string();
        if description.chars().count() < MIN_DESCRIPTION_LEN {
            return Err(SpecError::DescriptionTooShort);
        }
        Ok(Self {
            name,
            platform: input.platform,
            description,
            features: input.features,
            dependencies: input.dependencies,
            env_vars: input.env_vars,
            include_docker: input.include_docker,
            include_ci: input.include_ci,
            include_tests: input.include_tests,
            logging_level: input.logging_level,
        })
    }
}

/// Lowercase `title`, collapse every run of non-alphanumerics into `-`, trim
/// dashes, and cap at `max_len` bytes on a char boundary.
pub fn slugify(title: &str, max_len: usize) -> String {
    let slug: String = title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    if slug.len() > max_len {
        let mut end = max_len;
        while !slug.is_char_boundary(end) {
            end -= 1;
        }
        slug[..end].trim_end_matches('-').to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str, description: &str) -> BotSpecInput {
        BotSpecInput::new(name, Platform::Cli, description)
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("My Cool Bot", 64), "my-cool-bot");
        assert_eq!(slugify("  --Hello__World!!  ", 64), "hello-world");
        assert_eq!(slugify("bot2000", 64), "bot2000");
    }

    #[test]
    fn slugify_truncates_without_trailing_dash() {
        assert_eq!(slugify("abc def", 4), "abc");
        assert_eq!(slugify(&"x".repeat(100), MAX_NAME_LEN).len(), MAX_NAME_LEN);
    }

    #[test]
    fn name_is_stored_normalized() {
        let spec = BotSpec::try_from(input("My Cool Bot", "does things")).expect("valid");
        assert_eq!(spec.name, "my-cool-bot");
    }

    #[test]
    fn short_name_is_rejected() {
        assert_eq!(
            BotSpec::try_from(input("a", "does things")),
            Err(SpecError::NameTooShort("a".to_string()))
        );
        assert!(BotSpec::try_from(input("!!!", "does things")).is_err());
    }

    #[test]
    fn short_description_is_rejected() {
        assert_eq!(
            BotSpec::try_from(input("my bot", "ab")),
            Err(SpecError::DescriptionTooShort)
        );
        assert!(BotSpec::try_from(input("my bot", "  ab   ")).is_err());
    }

    #[test]
    fn json_defaults_fill_optional_fields() {
        let spec: BotSpec = serde_json::from_str(
            r#"{"name":"Echo Bot","platform":"web-api","description":"echoes input"}"#,
        )
        .expect("deserialize");
        assert_eq!(spec.name, "echo-bot");
        assert_eq!(spec.platform, Platform::WebApi);
        assert_eq!(spec.features, vec!["echo".to_string()]);
        assert!(spec.include_docker && spec.include_ci && spec.include_tests);
        assert_eq!(spec.logging_level, LogLevel::Info);
    }

    #[test]
    fn json_with_invalid_name_fails_to_deserialize() {
        let err = serde_json::from_str::<BotSpec>(
            r#"{"name":"a","platform":"cli","description":"echoes input"}"#,
        )
        .expect_err("must reject");
        assert!(err.to_string().contains("name must be at least"));
    }

    #[test]
    fn unknown_platform_is_rejected() {
        assert!("matrix".parse::<Platform>().is_err());
        assert_eq!("web-api".parse::<Platform>(), Ok(Platform::WebApi));
    }

    #[test]
    fn stored_spec_round_trips_through_json() {
        let spec = BotSpec::try_from(input("round trip", "kept as is")).expect("valid");
        let json = serde_json::to_string(&spec).expect("serialize");
        let back: BotSpec = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, spec);
    }
}
