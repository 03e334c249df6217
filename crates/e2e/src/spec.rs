//! Declarative YAML scenario specification

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{E2eError, E2eResult};

/// A complete scenario parsed from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSpec {
    /// Unique name for this scenario
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags for filtering scenarios
    #[serde(default)]
    pub tags: Vec<String>,

    /// Steps to execute in order, after the session has opened the base address
    pub steps: Vec<ScenarioStep>,
}

/// A single step in a scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScenarioStep {
    /// Type text into an input
    Fill { selector: String, value: String },

    /// Click an element
    Click { selector: String },

    /// Click a checkbox only if it is not checked yet
    EnsureChecked { selector: String },

    /// Wait for an element to become visible and compare its trimmed text
    AssertText {
        selector: String,
        text: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Wait for an element to become visible
    AssertVisible {
        selector: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Log a message (for debugging)
    Log { message: String },
}

impl ScenarioStep {
    /// Short label used in logs and step results
    pub fn label(&self) -> String {
        match self {
            ScenarioStep::Fill { selector, .. } => format!("fill:{}", selector),
            ScenarioStep::Click { selector } => format!("click:{}", selector),
            ScenarioStep::EnsureChecked { selector } => format!("ensure_checked:{}", selector),
            ScenarioStep::AssertText { selector, .. } => format!("assert_text:{}", selector),
            ScenarioStep::AssertVisible { selector, .. } => format!("assert_visible:{}", selector),
            ScenarioStep::Log { message } => {
                format!("log:{}", message.chars().take(30).collect::<String>())
            }
        }
    }
}

impl ScenarioSpec {
    /// Parse a scenario from a YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let spec: Self = serde_yaml::from_str(yaml)?;
        if spec.steps.is_empty() {
            return Err(E2eError::SpecParse(format!(
                "scenario '{}' has no steps",
                spec.name
            )));
        }
        Ok(spec)
    }

    /// Parse a scenario from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content).map_err(|e| match e {
            E2eError::Yaml(inner) => {
                E2eError::SpecParse(format!("{}: {}", path.display(), inner))
            }
            other => other,
        })
    }

    /// Load all scenarios from a directory, in file name order
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        if !dir.is_dir() {
            return Err(E2eError::SpecParse(format!(
                "scenario directory not found: {}",
                dir.display()
            )));
        }

        let mut specs = Vec::new();

        for entry in walkdir::WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
        {
            specs.push(Self::from_file(entry.path())?);
        }

        Ok(specs)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}
