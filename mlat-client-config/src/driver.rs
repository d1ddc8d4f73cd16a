// SPDX-License-Identifier: AGPL-3.0-or-later
//! Prompt driver
//!
//! Walks a template set in declared order through a [`Frontend`], asking
//! each visible question until an acceptable answer is given. Nothing is
//! written until the whole set has been accepted.

use std::io::{BufRead, Write};

use tracing::{debug, info, warn};

use crate::artifact::{Answers, Artifact};
use crate::error::{ConfigError, Result};
use crate::template::{PromptTemplate, TemplateKind, TemplateSet};

/// Presentation layer used by the driver to talk to the operator
pub trait Frontend {
    /// Display an informational note
    fn show_note(&mut self, template: &PromptTemplate) -> Result<()>;

    /// Ask a question, returning the raw answer
    fn ask(&mut self, template: &PromptTemplate, default: Option<&str>) -> Result<String>;

    /// Tell the operator an answer was rejected; the driver asks again
    /// afterwards unless this returns an error
    fn reject(&mut self, template: &PromptTemplate, message: &str) -> Result<()>;
}

/// Where a single template is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptState {
    Unasked,
    Prompted,
    Rejected,
    Accepted,
}

/// Progress of one answerable template
#[derive(Debug, Clone)]
pub struct PromptProgress {
    pub key: String,
    pub state: PromptState,
    /// Number of answers rejected before acceptance
    pub rejections: usize,
    /// Whether the template was actually shown
    pub asked: bool,
}

/// Answers collected in one run
#[derive(Debug, Clone)]
pub struct Session {
    answers: Answers,
    progress: Vec<PromptProgress>,
}

impl Session {
    fn new(set: &TemplateSet) -> Self {
        let progress = set
            .prompts()
            .map(|t| PromptProgress {
                key: t.key.clone(),
                state: PromptState::Unasked,
                rejections: 0,
                asked: false,
            })
            .collect();

        Self {
            answers: Answers::new(),
            progress,
        }
    }

    fn entry(&mut self, key: &str) -> Option<&mut PromptProgress> {
        self.progress.iter_mut().find(|p| p.key == key)
    }

    fn transition(&mut self, key: &str, state: PromptState) {
        if let Some(entry) = self.entry(key) {
            if state == PromptState::Rejected {
                entry.rejections += 1;
            }
            if state == PromptState::Prompted {
                entry.asked = true;
            }
            entry.state = state;
        }
    }

    fn accept(&mut self, key: &str, value: String) {
        self.answers.insert(key.to_string(), value);
        self.transition(key, PromptState::Accepted);
    }

    pub fn answers(&self) -> &Answers {
        &self.answers
    }

    pub fn progress(&self) -> &[PromptProgress] {
        &self.progress
    }

    /// Current state of a template
    pub fn state(&self, key: &str) -> Option<PromptState> {
        self.progress.iter().find(|p| p.key == key).map(|p| p.state)
    }

    /// Whether every answerable template has been accepted
    pub fn is_complete(&self) -> bool {
        self.progress.iter().all(|p| p.state == PromptState::Accepted)
    }

    /// Turn a complete session into an artifact ready to commit
    pub fn into_artifact(self) -> Result<Artifact> {
        if let Some(pending) = self
            .progress
            .iter()
            .find(|p| p.state != PromptState::Accepted)
        {
            return Err(ConfigError::Unanswered {
                key: pending.key.clone(),
                message: "questionnaire is incomplete".to_string(),
            });
        }
        Ok(Artifact::new(self.answers))
    }
}

/// Runs the questionnaire described by a template set
pub struct PromptDriver<'a> {
    set: &'a TemplateSet,
}

impl<'a> PromptDriver<'a> {
    pub fn new(set: &'a TemplateSet) -> Self {
        Self { set }
    }

    /// Ask every visible template, using `prior` answers as defaults
    ///
    /// Templates hidden by their `visible_if` gate are not asked; they keep
    /// their prior answer (or default) so a later run can offer it again.
    pub fn run(&self, frontend: &mut dyn Frontend, prior: &Answers) -> Result<Session> {
        let mut session = Session::new(self.set);

        info!(
            templates = self.set.len(),
            prior_answers = prior.len(),
            "Starting configuration"
        );

        for template in self.set.iter() {
            match template.kind {
                TemplateKind::Error => continue,
                TemplateKind::Note => {
                    if self.set.is_visible(template, session.answers()) {
                        frontend.show_note(template)?;
                    }
                    continue;
                }
                TemplateKind::Boolean | TemplateKind::String | TemplateKind::Select => {}
            }

            let default = self.offered_default(template, prior);

            if !self.set.is_visible(template, session.answers()) {
                debug!(key = %template.key, "Template hidden, carrying value");
                session.accept(&template.key, default.unwrap_or_default());
                continue;
            }

            loop {
                session.transition(&template.key, PromptState::Prompted);
                let raw = frontend.ask(template, default.as_deref())?;

                match template.accept(&raw) {
                    Ok(value) => {
                        debug!(key = %template.key, "Answer accepted");
                        session.accept(&template.key, value);
                        break;
                    }
                    Err(e) if e.is_validation() => {
                        session.transition(&template.key, PromptState::Rejected);
                        warn!(key = %template.key, error = %e, "Answer rejected");
                        let message = match e {
                            ConfigError::InvalidCharacter => e.to_string(),
                            _ => self.set.error_for(template).unwrap_or_else(|| e.to_string()),
                        };
                        frontend.reject(template, &message)?;
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        info!(
            answers = session.answers().len(),
            complete = session.is_complete(),
            "Configuration collected"
        );

        Ok(session)
    }

    /// A prior answer that still passes validation, else the template default
    fn offered_default(&self, template: &PromptTemplate, prior: &Answers) -> Option<String> {
        if let Some(previous) = prior.get(&template.key) {
            match template.accept(previous) {
                Ok(value) => return Some(value),
                Err(e) => {
                    debug!(key = %template.key, error = %e, "Ignoring invalid prior answer")
                }
            }
        }
        template.default.clone()
    }
}

/// Interactive line-based front end
pub struct TerminalFrontend<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> TerminalFrontend<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn write_description(&mut self, template: &PromptTemplate) -> Result<()> {
        writeln!(self.output)?;
        writeln!(self.output, "{}", template.description)?;
        if let Some(extended) = &template.extended {
            for line in extended.lines() {
                writeln!(self.output, "  {}", line)?;
            }
        }
        Ok(())
    }
}

impl<R: BufRead, W: Write> Frontend for TerminalFrontend<R, W> {
    fn show_note(&mut self, template: &PromptTemplate) -> Result<()> {
        self.write_description(template)?;
        self.output.flush()?;
        Ok(())
    }

    fn ask(&mut self, template: &PromptTemplate, default: Option<&str>) -> Result<String> {
        self.write_description(template)?;

        if template.kind == TemplateKind::Select {
            for (index, choice) in template.choices.iter().enumerate() {
                writeln!(self.output, "  {}) {}", index + 1, choice)?;
            }
        }

        let shown_default = match (template.kind, default) {
            (TemplateKind::Boolean, Some("true")) => Some("yes"),
            (TemplateKind::Boolean, Some(_)) => Some("no"),
            (_, default) => default,
        };
        match shown_default {
            Some(default) if !default.is_empty() => write!(self.output, "[{}] > ", default)?,
            _ => write!(self.output, "> ")?,
        }
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(ConfigError::Aborted {
                key: template.key.clone(),
            });
        }

        let answer = line.trim_end_matches(['\r', '\n']);
        if answer.trim().is_empty() {
            return Ok(default.unwrap_or_default().to_string());
        }

        if template.kind == TemplateKind::Select {
            if let Ok(index) = answer.trim().parse::<usize>() {
                if let Some(choice) = index.checked_sub(1).and_then(|i| template.choices.get(i)) {
                    return Ok(choice.clone());
                }
            }
        }

        Ok(answer.to_string())
    }

    fn reject(&mut self, _template: &PromptTemplate, message: &str) -> Result<()> {
        writeln!(self.output)?;
        writeln!(self.output, "{}", message)?;
        Ok(())
    }
}

/// Non-interactive front end answering from preseeded values
///
/// Unseeded templates take their offered default. A rejected answer is
/// fatal since asking again would produce the same answer.
#[derive(Debug, Default)]
pub struct PreseedFrontend {
    preseed: Answers,
}

impl PreseedFrontend {
    pub fn new(preseed: Answers) -> Self {
        Self { preseed }
    }
}

impl Frontend for PreseedFrontend {
    fn show_note(&mut self, template: &PromptTemplate) -> Result<()> {
        info!(key = %template.key, "{}", template.description);
        Ok(())
    }

    fn ask(&mut self, template: &PromptTemplate, default: Option<&str>) -> Result<String> {
        Ok(self
            .preseed
            .get(&template.key)
            .map(String::as_str)
            .or(default)
            .unwrap_or_default()
            .to_string())
    }

    fn reject(&mut self, template: &PromptTemplate, message: &str) -> Result<()> {
        Err(ConfigError::Unanswered {
            key: template.key.clone(),
            message: message.lines().next().unwrap_or(message).to_string(),
        })
    }
}
