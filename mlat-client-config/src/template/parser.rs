// SPDX-License-Identifier: AGPL-3.0-or-later
//! Template file parser
//!
//! Supports both TOML and the stanza format (`Template:`/`Type:`/...
//! records separated by blank lines) for template sets.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ConfigError, Result};
use crate::validate::{is_single_line, parse_boolean, Rule};

/// Kind of a template entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TemplateKind {
    /// Yes/no question
    Boolean,
    /// Free-form text, optionally checked by a [`Rule`]
    String,
    /// One of a fixed list of choices
    Select,
    /// Message shown when a validation rule rejects an answer
    Error,
    /// Informational text, never answered
    Note,
}

impl TemplateKind {
    /// Whether the operator provides an answer for this kind
    pub fn is_answerable(self) -> bool {
        matches!(
            self,
            TemplateKind::Boolean | TemplateKind::String | TemplateKind::Select
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TemplateKind::Boolean => "boolean",
            TemplateKind::String => "string",
            TemplateKind::Select => "select",
            TemplateKind::Error => "error",
            TemplateKind::Note => "note",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "boolean" => Some(TemplateKind::Boolean),
            "string" => Some(TemplateKind::String),
            "select" => Some(TemplateKind::Select),
            "error" => Some(TemplateKind::Error),
            "note" => Some(TemplateKind::Note),
            _ => None,
        }
    }
}

/// A single prompt, error message or note
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct PromptTemplate {
    /// Unique identifier
    pub key: String,

    /// Kind of entry
    #[serde(rename = "type")]
    pub kind: TemplateKind,

    /// Short title
    pub description: String,

    /// Long-form help text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extended: Option<String>,

    /// Pre-filled answer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    /// Allowed answers for `select` templates
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,

    /// Validation rule for `string` templates
    #[serde(default, rename = "validate", skip_serializing_if = "Option::is_none")]
    pub rule: Option<Rule>,

    /// Error template shown when the rule rejects an answer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Boolean template that must be true for this one to be asked
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_if: Option<String>,
}

impl PromptTemplate {
    /// Create a template with no default, choices or rule
    pub fn new(key: impl Into<String>, kind: TemplateKind, description: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind,
            description: description.into(),
            extended: None,
            default: None,
            choices: Vec::new(),
            rule: None,
            error: None,
            visible_if: None,
        }
    }

    /// Normalise and validate an answer
    ///
    /// Booleans are canonicalised to `true`/`false`, select answers must
    /// match a choice exactly and string answers are trimmed before the
    /// rule is applied.
    pub fn accept(&self, answer: &str) -> Result<String> {
        match self.kind {
            TemplateKind::Boolean => parse_boolean(answer).map(str::to_string),
            TemplateKind::Select => {
                let answer = answer.trim();
                if self.choices.iter().any(|c| c == answer) {
                    Ok(answer.to_string())
                } else {
                    Err(ConfigError::InvalidChoice {
                        value: answer.to_string(),
                        choices: self.choices.join(", "),
                    })
                }
            }
            TemplateKind::String => {
                let answer = answer.trim();
                if !is_single_line(answer) {
                    return Err(ConfigError::InvalidCharacter);
                }
                if let Some(rule) = self.rule {
                    rule.validate(answer)?;
                }
                Ok(answer.to_string())
            }
            TemplateKind::Error | TemplateKind::Note => Ok(String::new()),
        }
    }

    /// Key of the error template used when an answer is rejected
    pub fn error_key(&self) -> Option<&str> {
        self.error
            .as_deref()
            .or_else(|| self.rule.map(Rule::default_error_key))
    }

    /// Description and extended text joined for display
    pub fn full_description(&self) -> String {
        match &self.extended {
            Some(extended) if !extended.is_empty() => {
                format!("{}\n{}", self.description, extended)
            }
            _ => self.description.clone(),
        }
    }
}

/// Top-level shape of a TOML template file
#[derive(Debug, Deserialize)]
struct TemplateFile {
    #[serde(default, rename = "template")]
    templates: Vec<PromptTemplate>,
}

/// Parse templates from a file, choosing the format by extension
pub fn parse_file(path: &Path) -> Result<Vec<PromptTemplate>> {
    if !path.exists() {
        return Err(ConfigError::TemplatesNotFound {
            path: path.display().to_string(),
        });
    }

    let contents = std::fs::read_to_string(path)?;
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    match extension {
        "toml" => parse_toml(&contents, path),
        "templates" => parse_stanzas(&contents),
        _ => Err(ConfigError::MalformedTemplate {
            key: path.display().to_string(),
            message: format!("Unsupported file extension: {}", extension),
        }),
    }
}

/// Parse templates from TOML content
pub fn parse_toml(contents: &str, path: &Path) -> Result<Vec<PromptTemplate>> {
    let file: TemplateFile = toml::from_str(contents).map_err(|e| ConfigError::MalformedTemplate {
        key: path.display().to_string(),
        message: e.to_string(),
    })?;
    Ok(file.templates)
}

/// Parse templates from stanza content
pub fn parse_stanzas(contents: &str) -> Result<Vec<PromptTemplate>> {
    let mut templates = Vec::new();
    let mut stanza = Stanza::default();

    for (index, line) in contents.lines().enumerate() {
        let line_no = index + 1;

        if line.starts_with('#') {
            continue;
        }

        if line.trim().is_empty() {
            if !stanza.is_empty() {
                templates.push(std::mem::take(&mut stanza).finish(line_no)?);
            }
            continue;
        }

        if line.starts_with(' ') || line.starts_with('\t') {
            stanza.continue_field(line, line_no)?;
        } else {
            let (name, value) = line.split_once(':').ok_or_else(|| {
                stanza.error(line_no, format!("expected 'Field: value', got '{}'", line))
            })?;
            stanza.set_field(name.trim(), value.trim(), line_no)?;
        }
    }

    if !stanza.is_empty() {
        templates.push(stanza.finish(contents.lines().count())?);
    }

    Ok(templates)
}

/// Fields collected for one record of the stanza format
#[derive(Debug, Default)]
struct Stanza {
    key: Option<String>,
    kind: Option<String>,
    default: Option<String>,
    choices: Option<String>,
    description: Option<String>,
    extended: Vec<String>,
    rule: Option<String>,
    error_ref: Option<String>,
    visible_if: Option<String>,
    last_field: Option<String>,
}

impl Stanza {
    fn is_empty(&self) -> bool {
        self.last_field.is_none()
    }

    fn error(&self, line_no: usize, message: String) -> ConfigError {
        ConfigError::MalformedTemplate {
            key: self
                .key
                .clone()
                .unwrap_or_else(|| format!("line {}", line_no)),
            message: format!("line {}: {}", line_no, message),
        }
    }

    fn set_field(&mut self, name: &str, value: &str, line_no: usize) -> Result<()> {
        let slot = match name {
            "Template" => &mut self.key,
            "Type" => &mut self.kind,
            "Default" => &mut self.default,
            "Choices" => &mut self.choices,
            "Description" => &mut self.description,
            "Validate" => &mut self.rule,
            "Error" => &mut self.error_ref,
            "Visible-If" => &mut self.visible_if,
            _ => return Err(self.error(line_no, format!("unknown field '{}'", name))),
        };

        if slot.is_some() {
            return Err(self.error(line_no, format!("duplicate field '{}'", name)));
        }
        *slot = Some(value.to_string());
        self.last_field = Some(name.to_string());
        Ok(())
    }

    fn continue_field(&mut self, line: &str, line_no: usize) -> Result<()> {
        if self.last_field.as_deref() != Some("Description") {
            return Err(self.error(
                line_no,
                "continuation lines are only allowed after Description".to_string(),
            ));
        }

        let text = &line[1..];
        if text.trim() == "." {
            self.extended.push(String::new());
        } else {
            self.extended.push(text.to_string());
        }
        Ok(())
    }

    fn finish(self, line_no: usize) -> Result<PromptTemplate> {
        let key = match self.key.as_deref() {
            Some(key) if !key.is_empty() => key.to_string(),
            _ => return Err(self.error(line_no, "missing 'Template' field".to_string())),
        };

        let kind_name = self
            .kind
            .as_deref()
            .ok_or_else(|| self.error(line_no, "missing 'Type' field".to_string()))?;
        let kind = TemplateKind::parse(kind_name)
            .ok_or_else(|| self.error(line_no, format!("unknown type '{}'", kind_name)))?;

        let description = self
            .description
            .clone()
            .ok_or_else(|| self.error(line_no, "missing 'Description' field".to_string()))?;

        let rule = match self.rule.as_deref() {
            Some(tag) => Some(tag.parse::<Rule>().map_err(|e| self.error(line_no, e))?),
            None => None,
        };

        let choices = self
            .choices
            .as_deref()
            .map(|c| {
                c.split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let extended = if self.extended.is_empty() {
            None
        } else {
            Some(self.extended.join("\n"))
        };

        Ok(PromptTemplate {
            key,
            kind,
            description,
            extended,
            default: self.default,
            choices,
            rule,
            error: self.error_ref,
            visible_if: self.visible_if,
        })
    }
}
