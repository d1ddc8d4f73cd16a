// SPDX-License-Identifier: AGPL-3.0-or-later
//! Answer validation
//!
//! Every rule is a pure predicate over the raw answer string. Templates
//! refer to a rule through the [`Rule`] tag; on failure the driver shows
//! the rule's error template and asks again.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ConfigError, Result};

/// Lowest port an unprivileged client may be told to use
const MIN_UNPRIVILEGED_PORT: u32 = 1024;

/// Validation rule attached to a string template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rule {
    /// Value must contain something other than whitespace
    NotEmpty,
    /// Value must be 0 or a port in 1024..=65535
    #[serde(rename = "port")]
    PortNumber,
    /// Value must be a plain decimal number
    Number,
    /// Value must be a user name other than root
    NonRootUser,
    /// Value must be `host:port`
    HostPort,
}

impl Rule {
    pub const ALL: [Rule; 5] = [
        Rule::NotEmpty,
        Rule::PortNumber,
        Rule::Number,
        Rule::NonRootUser,
        Rule::HostPort,
    ];

    /// Check a value against this rule
    pub fn check(self, value: &str) -> bool {
        match self {
            Rule::NotEmpty => is_not_empty(value),
            Rule::PortNumber => is_port_number(value),
            Rule::Number => is_number(value),
            Rule::NonRootUser => is_non_root_user(value),
            Rule::HostPort => is_host_port(value),
        }
    }

    /// Check a value, mapping failure onto the error taxonomy
    pub fn validate(self, value: &str) -> Result<()> {
        if self.check(value) {
            return Ok(());
        }

        let value = value.to_string();
        Err(match self {
            Rule::NotEmpty => ConfigError::EmptyValue,
            Rule::PortNumber | Rule::HostPort => ConfigError::InvalidPort { value },
            Rule::Number => ConfigError::InvalidNumber { value },
            Rule::NonRootUser => ConfigError::InvalidUsername { value },
        })
    }

    /// Key of the error template shown when this rule rejects an answer
    pub fn default_error_key(self) -> &'static str {
        match self {
            Rule::NotEmpty => "invalid-empty",
            Rule::PortNumber | Rule::HostPort => "invalid-port",
            Rule::Number => "invalid-number",
            Rule::NonRootUser => "invalid-username",
        }
    }

    /// Tag used in template files
    pub fn as_str(self) -> &'static str {
        match self {
            Rule::NotEmpty => "not-empty",
            Rule::PortNumber => "port",
            Rule::Number => "number",
            Rule::NonRootUser => "non-root-user",
            Rule::HostPort => "host-port",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rule {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Rule::ALL
            .into_iter()
            .find(|rule| rule.as_str() == s)
            .ok_or_else(|| format!("unknown validation rule '{}'", s))
    }
}

/// True if the value fits on one artifact line
pub fn is_single_line(value: &str) -> bool {
    !value.chars().any(char::is_control)
}

/// True if the value has any non-whitespace content
pub fn is_not_empty(value: &str) -> bool {
    !value.trim().is_empty()
}

/// True if the value is `0` or an integer in 1024..=65535
pub fn is_port_number(value: &str) -> bool {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }

    match value.parse::<u32>() {
        Ok(0) => true,
        Ok(port) => (MIN_UNPRIVILEGED_PORT..=u32::from(u16::MAX)).contains(&port),
        Err(_) => false,
    }
}

/// True if the value is an optionally signed decimal number
///
/// Only `.` is accepted as the decimal separator and scientific notation is
/// rejected, so `12e3` is not a number.
pub fn is_number(value: &str) -> bool {
    let digits = value
        .strip_prefix('-')
        .or_else(|| value.strip_prefix('+'))
        .unwrap_or(value);

    let mut seen_digit = false;
    let mut seen_point = false;
    for c in digits.chars() {
        match c {
            '0'..='9' => seen_digit = true,
            '.' if !seen_point => seen_point = true,
            _ => return false,
        }
    }
    seen_digit
}

/// True if the value is a user name other than `root`
pub fn is_non_root_user(value: &str) -> bool {
    !value.is_empty() && !value.chars().any(char::is_whitespace) && value != "root"
}

/// True if the value is `host:port` with a valid port
pub fn is_host_port(value: &str) -> bool {
    match value.rsplit_once(':') {
        Some((host, port)) => {
            !host.is_empty() && !host.chars().any(char::is_whitespace) && is_port_number(port)
        }
        None => false,
    }
}

/// Parse a boolean answer into its canonical form (`true` or `false`)
pub fn parse_boolean(value: &str) -> Result<&'static str> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Ok("true"),
        "false" | "no" | "n" | "0" => Ok("false"),
        _ => Err(ConfigError::InvalidBoolean {
            value: value.to_string(),
        }),
    }
}
