//! Derive the file list and dependency list for a spec.

use serde::Serialize;

use crate::core::spec::{BotSpec, Platform};

/// Files every generated project gets.
pub const BASE_FILES: &[&str] = &[
    "README.md",
    "requirements.txt",
    ".env.example",
    ".gitignore",
    "main.py",
    "config.py",
    "bot/__init__.py",
    "bot/handler.py",
    "bot/logger_setup.py",
];

pub const DOCKER_FILES: &[&str] = &["Dockerfile", "docker-compose.yml", ".dockerignore"];

pub const CI_FILES: &[&str] = &[".github/workflows/ci.yml"];

pub const TEST_FILES: &[&str] = &["tests/__init__.py", "tests/test_handler.py"];

/// Work order for one job. Notes grow as later stages add context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub spec: BotSpec,
    pub files: Vec<String>,
    pub dependencies: Vec<String>,
    pub notes: Vec<String>,
}

impl Plan {
    pub fn add_note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }
}

/// SDK packages the generated code imports for `platform`.
pub fn platform_dependencies(platform: Platform) -> &'static [&'static str] {
    match platform {
        Platform::Telegram => &["python-telegram-bot>=20.7"],
        Platform::Discord => &["discord.py>=2.3.0"],
        Platform::Slack => &["slack-bolt>=1.18.0"],
        Platform::Cli => &["click>=8.1.7"],
        Platform::WebApi => &["fastapi>=0.104.0", "uvicorn[standard]>=0.24.0"],
        Platform::Custom => &[],
    }
}

pub fn build_plan(spec: &BotSpec) -> Plan {
    let mut files: Vec<String> = BASE_FILES.iter().map(|f| (*f).to_string()).collect();
    let blocks = [
        (spec.include_docker, DOCKER_FILES),
        (spec.include_ci, CI_FILES),
        (spec.include_tests, TEST_FILES),
    ];
    for (enabled, block) in blocks {
        if enabled {
            files.extend(block.iter().map(|f| (*f).to_string()));
        }
    }

    let dependencies: Vec<String> = platform_dependencies(spec.platform)
        .iter()
        .map(|d| (*d).to_string())
        .chain(spec.dependencies.iter().cloned())
        .collect();

    let notes = vec![
        format!("Platform: {}", spec.platform),
        format!("Features: {}", spec.features.join(", ")),
        format!("Total files to generate: {}", files.len()),
    ];

    Plan {
        spec: spec.clone(),
        files,
        dependencies,
        notes,
    }
}
