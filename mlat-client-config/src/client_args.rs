// SPDX-License-Identifier: AGPL-3.0-or-later
//! Command line for the mlat client derived from committed answers

use crate::artifact::Artifact;
use crate::error::{ConfigError, Result};

/// Build the client's argument vector
///
/// `run-as-user`, `log-file` and `server-key` are consumed by the service
/// wrapper itself and are not passed to the client.
pub fn client_args(artifact: &Artifact) -> Result<Vec<String>> {
    if artifact.get("start-client") != Some("true") {
        return Err(ConfigError::InvalidConfig {
            message: "the standalone client is disabled (start-client is false)".to_string(),
        });
    }

    let required = |key: &str| -> Result<String> {
        match artifact.get(key) {
            Some(value) if !value.is_empty() => Ok(value.to_string()),
            _ => Err(ConfigError::InvalidConfig {
                message: format!("'{}' has no value", key),
            }),
        }
    };

    let mut args = Vec::new();
    for (flag, key) in [
        ("--input-type", "input-type"),
        ("--input-connect", "input-hostport"),
        ("--server", "server-hostport"),
        ("--user", "server-user"),
        ("--lat", "receiver-lat"),
        ("--lon", "receiver-lon"),
        ("--alt", "receiver-alt"),
    ] {
        args.push(flag.to_string());
        args.push(required(key)?);
    }

    let results = artifact.get("results").unwrap_or_default().trim();
    if results != "none" {
        for result in results.split_whitespace() {
            args.push("--results".to_string());
            args.push(result.to_string());
        }
    }

    if let Some(extra) = artifact.get("extra-args") {
        args.extend(extra.split_whitespace().map(str::to_string));
    }

    Ok(args)
}

/// Quote arguments for display in a POSIX shell
pub fn shell_join(args: &[String]) -> String {
    args.iter()
        .map(|arg| {
            let plain = !arg.is_empty()
                && arg
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || "-_.,:/@+=".contains(c));
            if plain {
                arg.clone()
            } else {
                format!("'{}'", arg.replace('\'', r"'\''"))
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
