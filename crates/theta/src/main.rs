//! Theta CLI - Main entry point

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value as JsonValue;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use theta_config::{FileSettings, templates_path};
use theta_core::ReaderSession;

#[derive(Parser)]
#[command(name = "theta")]
#[command(version)]
#[command(about = "Theta template renderer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a template to stdout
    Render {
        /// Template name, resolved against the templates root
        template: String,

        /// JSON object bound as the template's data
        #[arg(short, long)]
        data: Option<String>,

        /// Directory template names resolve against
        #[arg(long)]
        root: Option<PathBuf>,

        /// Workspace settings file (theta.yml)
        #[arg(long)]
        settings: Option<PathBuf>,
    },

    /// Print a template's effective configuration as JSON
    Config {
        /// Template name, resolved against the templates root
        template: String,

        /// Directory template names resolve against
        #[arg(long)]
        root: Option<PathBuf>,

        /// Workspace settings file (theta.yml)
        #[arg(long)]
        settings: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "theta=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            template,
            data,
            root,
            settings,
        } => {
            let mut session = build_session(root, settings)?;
            let data = parse_data(data.as_deref())?;
            let outcome = session
                .render(&template, &data)
                .with_context(|| format!("failed to render `{template}`"))?;
            print!("{}", outcome.output);
            Ok(())
        }
        Commands::Config {
            template,
            root,
            settings,
        } => {
            let mut session = build_session(root, settings)?;
            let config = session
                .read_config(&template)
                .with_context(|| format!("failed to read configuration of `{template}`"))?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

/// Session over the given root, with the settings file (when present) as
/// the workspace layer. An explicit `--root` beats the settings file's
/// `templatesPath`; without either, templates resolve against the current
/// directory.
fn build_session(root: Option<PathBuf>, settings: Option<PathBuf>) -> Result<ReaderSession> {
    let settings = settings
        .map(|path| {
            FileSettings::load(&path)
                .with_context(|| format!("failed to load settings from {}", path.display()))
        })
        .transpose()?;

    let root = root
        .or_else(|| settings.as_ref().and_then(|s| templates_path(s)))
        .unwrap_or_else(|| PathBuf::from("."));
    tracing::debug!(root = %root.display(), "resolving templates");

    let mut session = ReaderSession::from_root(root);
    if let Some(settings) = &settings {
        session = session.with_workspace(settings);
    }
    Ok(session)
}

fn parse_data(data: Option<&str>) -> Result<JsonValue> {
    match data {
        Some(text) => serde_json::from_str(text).context("--data is not valid JSON"),
        None => Ok(JsonValue::Object(serde_json::Map::new())),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).expect("create file");
        file.write_all(contents.as_bytes()).expect("write file");
        path
    }

    #[test]
    fn data_defaults_to_an_empty_object() {
        assert_eq!(parse_data(None).unwrap(), serde_json::json!({}));
        assert_eq!(
            parse_data(Some("{\"a\": 1}")).unwrap(),
            serde_json::json!({"a": 1})
        );
        assert!(parse_data(Some("not json")).is_err());
    }

    #[test]
    fn settings_file_supplies_the_templates_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_file(&dir, "view.theta", "Hello <%= name %>");
        let settings = write_file(
            &dir,
            "theta.yml",
            &format!("templatesPath: {}\n", dir.path().display()),
        );

        let mut session = build_session(None, Some(settings)).expect("build session");
        let outcome = session
            .render("view", &serde_json::json!({"name": "Sam"}))
            .expect("render");
        assert_eq!(outcome.output, "Hello Sam");
    }

    #[test]
    fn explicit_root_beats_the_settings_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_file(&dir, "view.theta", "from explicit root");
        let settings = write_file(&dir, "theta.yml", "templatesPath: /nowhere\n");

        let mut session =
            build_session(Some(dir.path().to_path_buf()), Some(settings)).expect("build session");
        let outcome = session
            .render("view", &serde_json::json!({}))
            .expect("render");
        assert_eq!(outcome.output, "from explicit root");
    }
}
