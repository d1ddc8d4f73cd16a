// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration artifact read and written for the service wrapper
//!
//! The artifact is a POSIX shell fragment with one `KEY="value"` line per
//! answered template, e.g. `SERVER_HOSTPORT="mlat.mutability.co.uk:40147"`.
//! It doubles as the source of defaults for the next run.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::{ConfigError, Result};
use crate::template::{TemplateKind, TemplateSet};
use crate::validate::parse_boolean;

/// Answers keyed by template key
pub type Answers = BTreeMap<String, String>;

/// A set of committed (or about to be committed) answers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Artifact {
    answers: Answers,
}

impl Artifact {
    pub fn new(answers: Answers) -> Self {
        Self { answers }
    }

    pub fn answers(&self) -> &Answers {
        &self.answers
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.answers.get(key).map(String::as_str)
    }

    /// Load an artifact, treating a missing file as having no answers
    pub fn load<P: AsRef<Path>>(path: P, set: &TemplateSet) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            debug!(path = %path.display(), "No existing artifact");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents, set)
    }

    /// Parse artifact content against a template set
    pub fn parse(contents: &str, set: &TemplateSet) -> Result<Self> {
        let mut answers = Answers::new();

        for (index, line) in contents.lines().enumerate() {
            let line_no = index + 1;
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (name, raw) = line.split_once('=').ok_or_else(|| ConfigError::ArtifactParse {
                line: line_no,
                message: format!("expected NAME=\"value\", got '{}'", line),
            })?;

            if name.is_empty() || !name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
                return Err(ConfigError::ArtifactParse {
                    line: line_no,
                    message: format!("invalid variable name '{}'", name),
                });
            }

            let value = unquote(raw).map_err(|message| ConfigError::ArtifactParse {
                line: line_no,
                message,
            })?;

            let template = set
                .prompts()
                .find(|t| variable_name(&t.key) == name);

            let Some(template) = template else {
                warn!(variable = %name, line = line_no, "Ignoring unknown variable in artifact");
                continue;
            };

            let value = if template.kind == TemplateKind::Boolean {
                parse_boolean(&value)
                    .map_err(|e| ConfigError::ArtifactParse {
                        line: line_no,
                        message: e.to_string(),
                    })?
                    .to_string()
            } else {
                value
            };

            answers.insert(template.key.clone(), value);
        }

        Ok(Self { answers })
    }

    /// Render the artifact in template order
    pub fn render(&self, set: &TemplateSet, name: &str) -> String {
        let mut out = String::new();
        out.push_str(&format!("# {} configuration\n", name));
        out.push_str("# Written by mlat-client-config. Values here are offered as the\n");
        out.push_str("# defaults the next time the configuration is run.\n\n");

        for template in set.prompts() {
            let Some(value) = self.answers.get(&template.key) else {
                continue;
            };

            let value = match (template.kind, value.as_str()) {
                (TemplateKind::Boolean, "true") => "yes".to_string(),
                (TemplateKind::Boolean, _) => "no".to_string(),
                _ => quote(value),
            };

            out.push_str(&format!("{}=\"{}\"\n", variable_name(&template.key), value));
        }

        out
    }

    /// Atomically replace the artifact at `path`
    ///
    /// The content is written to a temporary file in the same directory,
    /// flushed to disk and renamed over the target, so readers see either
    /// the previous artifact or the new one.
    pub fn commit<P: AsRef<Path>>(&self, set: &TemplateSet, name: &str, path: P) -> Result<()> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let rendered = self.render(set, name);
        let mut staged = tempfile::Builder::new()
            .prefix(".mlat-client-config.")
            .suffix(".tmp")
            .tempfile_in(dir)?;
        staged.write_all(rendered.as_bytes())?;
        staged.as_file().sync_all()?;
        staged.persist(path)?;

        info!(path = %path.display(), answers = self.answers.len(), "Committed configuration");
        Ok(())
    }

    /// Re-validate every answer that would be asked for
    ///
    /// Returns the failing keys with the reason; hidden templates are not
    /// checked since their values are carried without prompting.
    pub fn check(&self, set: &TemplateSet) -> Vec<(String, ConfigError)> {
        let mut failures = Vec::new();

        for template in set.prompts() {
            if !set.is_visible(template, &self.answers) {
                continue;
            }

            match self.answers.get(&template.key) {
                Some(value) => {
                    if let Err(e) = template.accept(value) {
                        failures.push((template.key.clone(), e));
                    }
                }
                None => failures.push((
                    template.key.clone(),
                    ConfigError::Unanswered {
                        key: template.key.clone(),
                        message: "no value in configuration".to_string(),
                    },
                )),
            }
        }

        failures
    }
}

/// Shell variable name for a template key (`server-hostport` -> `SERVER_HOSTPORT`)
pub fn variable_name(key: &str) -> String {
    key.chars()
        .map(|c| match c {
            '-' | '.' | '/' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect()
}

fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '"' | '$' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn unquote(raw: &str) -> std::result::Result<String, String> {
    let Some(inner) = raw.strip_prefix('"') else {
        if raw.chars().any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '\\' | '$' | '`')) {
            return Err(format!("unquoted value '{}' needs quoting", raw));
        }
        return Ok(raw.to_string());
    };

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(escaped) => out.push(escaped),
                None => return Err("dangling escape".to_string()),
            },
            '"' => {
                let rest: String = chars.collect();
                if !rest.trim().is_empty() && !rest.trim_start().starts_with('#') {
                    return Err(format!("unexpected text after closing quote: '{}'", rest));
                }
                return Ok(out);
            }
            c => out.push(c),
        }
    }

    Err("missing closing quote".to_string())
}
