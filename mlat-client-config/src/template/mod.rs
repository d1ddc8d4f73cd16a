// SPDX-License-Identifier: AGPL-3.0-or-later
//! Template set loading and checking
//!
//! A template set is the ordered list of prompts, error messages and notes
//! that make up the questionnaire. Sets are checked in full when loaded so
//! that a corrupt set aborts the run before the first question is asked.

mod parser;

pub use parser::{parse_stanzas, PromptTemplate, TemplateKind};

use std::collections::HashSet;
use std::path::Path;

use tracing::debug;

use crate::artifact::Answers;
use crate::error::{ConfigError, Result};
use crate::validate::{is_single_line, parse_boolean};

/// The shipped questionnaire for the standalone mlat-client
const BUILTIN_TEMPLATES: &str = include_str!("../../templates/mlat-client.templates");

/// Ordered, checked collection of templates
#[derive(Debug, Clone)]
pub struct TemplateSet {
    templates: Vec<PromptTemplate>,
}

impl TemplateSet {
    /// Build a set from parsed templates, checking every invariant
    pub fn new(templates: Vec<PromptTemplate>) -> Result<Self> {
        let set = Self { templates };
        set.validate()?;
        debug!(templates = set.templates.len(), "Loaded template set");
        Ok(set)
    }

    /// The built-in mlat-client questionnaire
    pub fn builtin() -> Result<Self> {
        Self::new(parse_stanzas(BUILTIN_TEMPLATES)?)
    }

    /// Load a set from a `.templates` or `.toml` file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::new(parser::parse_file(path.as_ref())?)
    }

    /// Load from `path` when given, else the built-in set
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Self::builtin(),
        }
    }

    /// Look up a template by key
    pub fn get(&self, key: &str) -> Option<&PromptTemplate> {
        self.templates.iter().find(|t| t.key == key)
    }

    /// All templates in declared order
    pub fn iter(&self) -> impl Iterator<Item = &PromptTemplate> {
        self.templates.iter()
    }

    /// Templates that take an answer, in declared order
    pub fn prompts(&self) -> impl Iterator<Item = &PromptTemplate> {
        self.templates.iter().filter(|t| t.kind.is_answerable())
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Text of the error template shown when `template` rejects an answer
    pub fn error_for(&self, template: &PromptTemplate) -> Option<String> {
        template
            .error_key()
            .and_then(|key| self.get(key))
            .map(PromptTemplate::full_description)
    }

    /// Whether `template` is asked given the answers collected so far
    ///
    /// A gate that has not been answered yet falls back to its default, and
    /// a template behind a hidden gate is hidden too.
    pub fn is_visible(&self, template: &PromptTemplate, answers: &Answers) -> bool {
        let Some(gate) = &template.visible_if else {
            return true;
        };
        let Some(gate_template) = self.get(gate) else {
            return false;
        };
        if !self.is_visible(gate_template, answers) {
            return false;
        }

        let value = answers
            .get(gate)
            .map(String::as_str)
            .or(gate_template.default.as_deref());

        matches!(value.map(parse_boolean), Some(Ok("true")))
    }

    /// Check every invariant of the set
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();

        for (index, template) in self.templates.iter().enumerate() {
            let malformed = |message: String| ConfigError::MalformedTemplate {
                key: template.key.clone(),
                message,
            };

            if template.key.is_empty() {
                return Err(ConfigError::MalformedTemplate {
                    key: format!("#{}", index + 1),
                    message: "template key cannot be empty".to_string(),
                });
            }

            if !seen.insert(template.key.as_str()) {
                return Err(malformed("duplicate template key".to_string()));
            }

            if template.description.trim().is_empty() {
                return Err(malformed("description cannot be empty".to_string()));
            }

            match template.kind {
                TemplateKind::Select => {
                    if template.choices.is_empty() {
                        return Err(malformed("select template has no choices".to_string()));
                    }
                }
                _ if !template.choices.is_empty() => {
                    return Err(malformed(format!(
                        "choices are only allowed on select templates, not {}",
                        template.kind.as_str()
                    )));
                }
                _ => {}
            }

            if template.rule.is_some() && template.kind != TemplateKind::String {
                return Err(malformed(format!(
                    "validation rules are only allowed on string templates, not {}",
                    template.kind.as_str()
                )));
            }

            if !template.kind.is_answerable() {
                if template.default.is_some() {
                    return Err(malformed(format!(
                        "{} templates cannot have a default",
                        template.kind.as_str()
                    )));
                }
                if template.error.is_some() || template.visible_if.is_some() {
                    return Err(malformed(format!(
                        "{} templates cannot reference other templates",
                        template.kind.as_str()
                    )));
                }
            }

            if let Some(default) = &template.default {
                self.check_default(template, default)?;
            }

            if let Some(error_key) = template.error_key() {
                match self.get(error_key) {
                    Some(error) if error.kind == TemplateKind::Error => {}
                    Some(_) => {
                        return Err(malformed(format!(
                            "'{}' is not an error template",
                            error_key
                        )))
                    }
                    None => {
                        return Err(malformed(format!(
                            "error template '{}' does not exist",
                            error_key
                        )))
                    }
                }
            }

            if let Some(gate) = &template.visible_if {
                let earlier = self.templates[..index].iter().find(|t| &t.key == gate);
                match earlier {
                    Some(gate) if gate.kind == TemplateKind::Boolean => {}
                    Some(_) => {
                        return Err(malformed(format!("'{}' is not a boolean template", gate)))
                    }
                    None => {
                        return Err(malformed(format!(
                            "visibility depends on '{}', which is not declared earlier",
                            gate
                        )))
                    }
                }
            }
        }

        Ok(())
    }

    fn check_default(&self, template: &PromptTemplate, default: &str) -> Result<()> {
        let malformed = |message: String| ConfigError::MalformedTemplate {
            key: template.key.clone(),
            message,
        };

        if !is_single_line(default) {
            return Err(malformed("default must be a single line".to_string()));
        }

        match template.kind {
            TemplateKind::Boolean => {
                parse_boolean(default)
                    .map_err(|_| malformed(format!("default '{}' is not a boolean", default)))?;
            }
            TemplateKind::Select => {
                if !template.choices.iter().any(|c| c == default) {
                    return Err(malformed(format!(
                        "default '{}' is not one of the choices",
                        default
                    )));
                }
            }
            TemplateKind::String => {
                if let Some(rule) = template.rule {
                    if !rule.check(default) {
                        return Err(malformed(format!(
                            "default '{}' fails its own '{}' rule",
                            default, rule
                        )));
                    }
                }
            }
            TemplateKind::Error | TemplateKind::Note => {}
        }

        Ok(())
    }
}
