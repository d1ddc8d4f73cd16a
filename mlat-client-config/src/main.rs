// SPDX-License-Identifier: AGPL-3.0-or-later
//! mlat-client-config: setup questionnaire for the mlat-client feeder

use std::io;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use mlat_client_config::{
    client_args::{client_args, shell_join},
    Answers, Artifact, Config, PreseedFrontend, PromptDriver, Session, TemplateSet,
    TerminalFrontend,
};

/// Answers never echoed back in full
const SECRET_KEYS: &[&str] = &["server-key"];

/// mlat-client-config: configure the standalone multilateration client
///
/// Asks for the server, receiver position and input settings of the
/// mlat-client and writes them as a shell fragment for its service wrapper.
#[derive(Parser, Debug)]
#[command(name = "mlat-client-config")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "mlat-client-config.toml")]
    config: PathBuf,

    /// Template file (overrides the configuration file)
    #[arg(long, global = true)]
    templates: Option<PathBuf>,

    /// Artifact path (overrides the configuration file)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Dry run mode (print the artifact instead of writing it)
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for `show`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Human-readable text format
    Text,
    /// JSON format
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask every question interactively and write the configuration
    Configure,

    /// Write the configuration without asking, from defaults and --set values
    #[command(alias = "noninteractive")]
    Defaults {
        /// Preseed an answer
        #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_preseed)]
        set: Vec<(String, String)>,
    },

    /// Re-validate an existing configuration
    Check,

    /// Show the current configuration
    Show {
        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Check and list a template set
    #[command(alias = "ls")]
    Templates {
        /// Template file to check (defaults to the configured set)
        path: Option<PathBuf>,
    },

    /// Print the mlat-client command line for the current configuration
    Args,

    /// Initialize a new tool configuration
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show version information
    Version,
}

/// Settings resolved from the command line and the tool configuration
struct Settings {
    config: Config,
    templates: Option<PathBuf>,
    output: PathBuf,
}

impl Settings {
    fn load(cli: &Cli, config: Config) -> Self {
        let templates = cli.templates.clone().or_else(|| config.templates.clone());
        let output = cli.output.clone().unwrap_or_else(|| config.output.clone());
        Self {
            config,
            templates,
            output,
        }
    }

    fn template_set(&self) -> anyhow::Result<TemplateSet> {
        let set = TemplateSet::load(self.templates.as_deref()).with_context(|| match &self.templates {
            Some(path) => format!("Failed to load templates from {}", path.display()),
            None => "Built-in template set is invalid".to_string(),
        })?;
        Ok(set)
    }

    fn existing_artifact(&self, set: &TemplateSet) -> anyhow::Result<Artifact> {
        if !self.output.exists() {
            anyhow::bail!("No configuration found at {}", self.output.display());
        }
        Artifact::load(&self.output, set)
            .with_context(|| format!("Failed to read configuration from {}", self.output.display()))
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match cli.command {
        Commands::Init { .. } | Commands::Version => Config::default(),
        _ => Config::load_or_default(&cli.config)
            .with_context(|| format!("Failed to load config from {}", cli.config.display()))?,
    };

    init_logging(&cli, &config);

    let ctx = Settings::load(&cli, config);

    match cli.command {
        Commands::Version => {
            println!("mlat-client-config v{}", env!("CARGO_PKG_VERSION"));
            println!("Setup questionnaire for the mlat-client multilateration feeder");
            Ok(())
        }

        Commands::Init { force } => init_config(&cli.config, force),

        Commands::Configure => configure(&ctx, cli.dry_run),

        Commands::Defaults { set } => configure_defaults(&ctx, set, cli.dry_run),

        Commands::Check => check_artifact(&ctx),

        Commands::Show { format } => show_artifact(&ctx, format),

        Commands::Templates { path } => list_templates(&ctx, path.as_deref()),

        Commands::Args => print_client_args(&ctx),
    }
}

/// Logs go to stderr; stdout carries prompts and command output
fn init_logging(cli: &Cli, config: &Config) {
    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else if cli.verbose {
        EnvFilter::new("info")
    } else if cli.config.exists() {
        EnvFilter::new(&config.logging.level)
    } else {
        EnvFilter::new("warn")
    };

    if config.logging.format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(cli.debug)
            .with_writer(io::stderr)
            .init();
    }
}

fn parse_preseed(value: &str) -> Result<(String, String), String> {
    value
        .split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", value))
}

/// Initialize a new configuration file
fn init_config(config_path: &Path, force: bool) -> anyhow::Result<()> {
    if config_path.exists() && !force {
        anyhow::bail!(
            "Configuration file already exists: {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let default_config = r#"# SPDX-License-Identifier: AGPL-3.0-or-later
# mlat-client-config configuration

name = "mlat-client"
output = "/etc/default/mlat-client"
# templates = "/usr/share/mlat-client/mlat-client.templates"

[logging]
level = "info"
format = "text"
"#;

    std::fs::write(config_path, default_config)?;
    info!("Created configuration file: {}", config_path.display());
    println!("Created configuration file: {}", config_path.display());
    Ok(())
}

/// Interactive run against stdin/stdout
fn configure(ctx: &Settings, dry_run: bool) -> anyhow::Result<()> {
    let set = ctx.template_set()?;
    let prior = prior_answers(ctx, &set);

    let stdin = io::stdin();
    let mut frontend = TerminalFrontend::new(stdin.lock(), io::stdout());
    let session = PromptDriver::new(&set).run(&mut frontend, &prior)?;

    commit_session(ctx, &set, session, dry_run)
}

/// Non-interactive run from defaults and preseeded answers
fn configure_defaults(
    ctx: &Settings,
    preseed: Vec<(String, String)>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let set = ctx.template_set()?;

    for (key, _) in &preseed {
        match set.get(key) {
            Some(template) if template.kind.is_answerable() => {}
            _ => anyhow::bail!("Unknown setting '{}'", key),
        }
    }

    let prior = prior_answers(ctx, &set);
    let mut frontend = PreseedFrontend::new(preseed.into_iter().collect());
    let session = PromptDriver::new(&set)
        .run(&mut frontend, &prior)
        .context("Cannot complete the configuration without asking")?;

    commit_session(ctx, &set, session, dry_run)
}

/// Answers from the last committed artifact; an unreadable one is ignored
fn prior_answers(ctx: &Settings, set: &TemplateSet) -> Answers {
    match Artifact::load(&ctx.output, set) {
        Ok(artifact) => artifact.answers().clone(),
        Err(e) => {
            warn!(
                path = %ctx.output.display(),
                error = %e,
                "Ignoring unreadable existing configuration"
            );
            Answers::new()
        }
    }
}

fn commit_session(
    ctx: &Settings,
    set: &TemplateSet,
    session: Session,
    dry_run: bool,
) -> anyhow::Result<()> {
    let artifact = session.into_artifact()?;

    if dry_run {
        println!("[DRY RUN] Would write {}:", ctx.output.display());
        println!();
        print!("{}", artifact.render(set, &ctx.config.name));
        return Ok(());
    }

    artifact
        .commit(set, &ctx.config.name, &ctx.output)
        .with_context(|| format!("Failed to write {}", ctx.output.display()))?;

    println!("Wrote configuration to {}", ctx.output.display());
    Ok(())
}

/// Re-validate the committed artifact
fn check_artifact(ctx: &Settings) -> anyhow::Result<()> {
    let set = ctx.template_set()?;
    let artifact = ctx.existing_artifact(&set)?;

    let failures = artifact.check(&set);
    if failures.is_empty() {
        println!("Configuration at {} is valid", ctx.output.display());
        return Ok(());
    }

    for (key, error) in &failures {
        eprintln!("  {}: {}", key, error);
    }
    anyhow::bail!(
        "{} invalid setting(s) in {}",
        failures.len(),
        ctx.output.display()
    );
}

/// Show the committed answers
fn show_artifact(ctx: &Settings, format: OutputFormat) -> anyhow::Result<()> {
    let set = ctx.template_set()?;
    let artifact = ctx.existing_artifact(&set)?;

    let mut shown = Answers::new();
    for template in set.prompts() {
        if let Some(value) = artifact.get(&template.key) {
            let value = if SECRET_KEYS.contains(&template.key.as_str()) && !value.is_empty() {
                "********".to_string()
            } else {
                value.to_string()
            };
            shown.insert(template.key.clone(), value);
        }
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&shown)?),
        OutputFormat::Text => {
            println!("Configuration at {}:", ctx.output.display());
            println!();
            for template in set.prompts() {
                if let Some(value) = shown.get(&template.key) {
                    println!("  {} = {}", template.key, value);
                }
            }
        }
    }

    Ok(())
}

/// Check and list a template set
fn list_templates(ctx: &Settings, path: Option<&Path>) -> anyhow::Result<()> {
    let set = match path {
        Some(path) => TemplateSet::from_file(path)
            .with_context(|| format!("Failed to load templates from {}", path.display()))?,
        None => ctx.template_set()?,
    };

    println!("Template set is valid ({} templates)", set.len());
    println!();
    for template in set.iter() {
        let mut line = format!("  {} ({})", template.key, template.kind.as_str());
        if let Some(default) = template.default.as_deref().filter(|d| !d.is_empty()) {
            line.push_str(&format!(" [{}]", default));
        }
        if let Some(rule) = template.rule {
            line.push_str(&format!(" <{}>", rule));
        }
        println!("{} - {}", line, template.description);
    }

    Ok(())
}

/// Print the derived client command line
fn print_client_args(ctx: &Settings) -> anyhow::Result<()> {
    let set = ctx.template_set()?;
    let artifact = ctx.existing_artifact(&set)?;

    let args = client_args(&artifact)?;
    println!("{}", shell_join(&args));
    Ok(())
}
