//! Startup configuration threaded through every render call.
//!
//! [`RenderConfig`] is built once by the host process and passed by
//! reference to [`render`](crate::dispatch::render). It carries the
//! "force structured output" switch, so there is no process-wide state.
//!
//! [`RenderConfig::from_env`] reads it from the environment through an
//! [`EnvReader`], which tests replace with [`MockEnv`]:
//!
//! | Variable           | Effect                                           |
//! |--------------------|--------------------------------------------------|
//! | `NODESHEET_OUTPUT` | `json` or `yaml` forces document output in that format; `plain` disables styling |
//! | `NO_COLOR`         | any non-empty value disables styling             |

use std::collections::HashMap;

use crate::render::DocumentFormat;
use crate::style::{Palette, TextMode};

/// Environment variable selecting the output kind.
pub const OUTPUT_VAR: &str = "NODESHEET_OUTPUT";
/// Conventional switch disabling ANSI colors.
pub const NO_COLOR_VAR: &str = "NO_COLOR";

/// Configuration shared by every render call of a process.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderConfig {
    /// Render every sheet as a document, whatever style was asked for.
    pub force_document: bool,
    pub text_mode: TextMode,
    pub document_format: DocumentFormat,
}

impl RenderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn force_document(mut self, force: bool) -> Self {
        self.force_document = force;
        self
    }

    pub fn text_mode(mut self, mode: TextMode) -> Self {
        self.text_mode = mode;
        self
    }

    pub fn document_format(mut self, format: DocumentFormat) -> Self {
        self.document_format = format;
        self
    }

    /// Reads the configuration from the environment.
    pub fn from_env(env: &impl EnvReader) -> Self {
        let mut config = Self::default();

        if let Some(output) = env.var(OUTPUT_VAR) {
            match output.trim().to_ascii_lowercase().as_str() {
                "json" => {
                    config.force_document = true;
                    config.document_format = DocumentFormat::Json;
                }
                "yaml" => {
                    config.force_document = true;
                    config.document_format = DocumentFormat::Yaml;
                }
                "plain" => config.text_mode = TextMode::Plain,
                "" | "auto" => {}
                other => {
                    tracing::warn!(
                        target: "nodesheet::config",
                        value = other,
                        "ignoring unknown {}",
                        OUTPUT_VAR
                    );
                }
            }
        }

        if env.var(NO_COLOR_VAR).is_some_and(|v| !v.is_empty()) {
            config.text_mode = TextMode::Plain;
        }

        config
    }

    /// Palette for the text styles.
    pub fn palette(&self) -> Palette {
        Palette::new(self.text_mode)
    }
}

/// Abstraction over environment variables.
pub trait EnvReader: Send + Sync {
    fn var(&self, name: &str) -> Option<String>;
}

/// Reads the process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealEnv;

impl EnvReader for RealEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// In-memory environment for tests.
#[derive(Debug, Clone, Default)]
pub struct MockEnv {
    vars: HashMap<String, String>,
}

impl MockEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }
}

impl EnvReader for MockEnv {
    fn var(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }
}
