//! Prompt templates and placeholder substitution.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{GameError, GameResult};

/// Built-in templates shipped with the crate, by name.
const BUILTIN: &[(&str, &str)] = &[
    ("orchestrator", include_str!("../../prompts/orchestrator.md")),
    ("nighthawk", include_str!("../../prompts/nighthawk.md")),
    ("cedar", include_str!("../../prompts/cedar.md")),
    ("ghost", include_str!("../../prompts/ghost.md")),
    ("sable", include_str!("../../prompts/sable.md")),
    ("lotus", include_str!("../../prompts/lotus.md")),
];

/// Source of prompt templates. A missing template is a configuration error.
pub trait TemplateSource: Send + Sync {
    fn load(&self, name: &str) -> GameResult<String>;
}

/// Templates read from `<dir>/<name>.md`.
#[derive(Debug, Clone)]
pub struct DirTemplates {
    dir: PathBuf,
}

impl DirTemplates {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write the built-in templates into `dir`, keeping any that already exist.
    /// Returns the names written.
    pub fn install_builtin(dir: &Path) -> GameResult<Vec<String>> {
        std::fs::create_dir_all(dir).map_err(|e| GameError::storage(dir, e))?;
        let mut written = Vec::new();
        for (name, text) in BUILTIN {
            let path = dir.join(format!("{name}.md"));
            if path.exists() {
                continue;
            }
            std::fs::write(&path, text).map_err(|e| GameError::storage(&path, e))?;
            written.push(name.to_string());
        }
        Ok(written)
    }
}

impl TemplateSource for DirTemplates {
    fn load(&self, name: &str) -> GameResult<String> {
        let path = self.dir.join(format!("{name}.md"));
        std::fs::read_to_string(&path).map_err(|e| GameError::Template {
            name: name.to_string(),
            reason: format!("{}: {e}", path.display()),
        })
    }
}

/// Templates held in memory.
#[derive(Debug, Clone, Default)]
pub struct InlineTemplates {
    templates: HashMap<String, String>,
}

impl InlineTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    /// The templates compiled into the crate.
    pub fn builtin() -> Self {
        BUILTIN
            .iter()
            .fold(Self::new(), |acc, (name, text)| acc.with(*name, *text))
    }

    pub fn with(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.templates.insert(name.into(), text.into());
        self
    }
}

impl TemplateSource for InlineTemplates {
    fn load(&self, name: &str) -> GameResult<String> {
        self.templates
            .get(name)
            .cloned()
            .ok_or_else(|| GameError::Template {
                name: name.to_string(),
                reason: "no such template".to_string(),
            })
    }
}

/// Replace each `{token}` in `template` with its bound value.
///
/// Substitution is literal and applied in binding order. Unbound tokens are
/// left as they are.
pub fn render(template: &str, bindings: &[(&str, &str)]) -> String {
    bindings
        .iter()
        .fold(template.to_string(), |text, (token, value)| {
            text.replace(&format!("{{{token}}}"), value)
        })
}
