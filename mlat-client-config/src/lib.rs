// SPDX-License-Identifier: AGPL-3.0-or-later
//! mlat-client-config: setup questionnaire for the mlat-client feeder
//!
//! Collects the parameters the standalone multilateration client needs
//! (server, receiver position, input source, results outputs) and commits
//! them as a shell fragment read by the service wrapper.
//!
//! # Features
//!
//! * **Declarative templates:** prompts, defaults, choices and error messages
//!   live in a template file checked in full before any question is asked
//! * **Typed validation:** each answer is checked by a [`validate::Rule`]
//! * **Atomic commit:** answers are written only once all are accepted, and
//!   the previous configuration survives an interrupted run

pub mod artifact;
pub mod client_args;
pub mod config;
pub mod driver;
pub mod error;
pub mod template;
pub mod validate;

pub use artifact::{Answers, Artifact};
pub use config::Config;
pub use driver::{Frontend, PreseedFrontend, PromptDriver, PromptState, Session, TerminalFrontend};
pub use error::{ConfigError, Result};
pub use template::{PromptTemplate, TemplateKind, TemplateSet};
pub use validate::Rule;
