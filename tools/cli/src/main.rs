//! SiteCanvas CLI - command line interface for site content operations.
//!
//! This tool talks to a persistence endpoint directly: fetch a site's
//! bootstrap and materialize its content document, apply path edits to a
//! document snapshot file, and push a snapshot back as a single save.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use url::Url;

use sitecanvas_client::{
    HttpPersistenceClient, PersistenceClient, SavePayload, SaveRequest, SiteProfile,
};
use sitecanvas_common::SiteId;
use sitecanvas_document::ContentDocument;

#[derive(Parser)]
#[command(name = "sitecanvas")]
#[command(about = "SiteCanvas - site content tooling")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a site's bootstrap and materialize its content document.
    Load {
        /// Persistence endpoint base URL.
        #[arg(short, long)]
        endpoint: Url,

        /// Site identifier.
        #[arg(short, long)]
        site: String,

        /// Write the document JSON here instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Apply path edits to a document snapshot file.
    Edit {
        /// Document snapshot to edit in place.
        #[arg(short, long)]
        input: PathBuf,

        /// Edits of the form <path>=<value>; values are parsed as JSON,
        /// falling back to plain strings.
        #[arg(short, long = "set", value_name = "PATH=VALUE")]
        set: Vec<String>,
    },

    /// Push a document snapshot as a single save.
    Push {
        /// Persistence endpoint base URL.
        #[arg(short, long)]
        endpoint: Url,

        /// Site identifier.
        #[arg(short, long)]
        site: String,

        /// Site display name sent with the save.
        #[arg(short, long)]
        name: String,

        /// Template identifier sent with the save.
        #[arg(short, long, default_value = "custom")]
        template: String,

        /// Document snapshot to push.
        #[arg(short, long)]
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Load {
            endpoint,
            site,
            output,
        } => cmd_load(endpoint, &site, output.as_deref()).await,

        Commands::Edit { input, set } => cmd_edit(&input, &set),

        Commands::Push {
            endpoint,
            site,
            name,
            template,
            input,
        } => cmd_push(endpoint, &site, &name, &template, &input).await,
    }
}

/// Fetch and materialize a bootstrap document.
async fn cmd_load(endpoint: Url, site: &str, output: Option<&Path>) -> Result<()> {
    let site_id = SiteId::new(site).context("Invalid site id")?;
    let client = HttpPersistenceClient::new(endpoint).context("Failed to create client")?;

    info!("Fetching bootstrap for {}", site_id);
    let response = client
        .load_site(&site_id)
        .await
        .context("Bootstrap fetch failed")?;
    if !response.success {
        anyhow::bail!("Endpoint reported failure for {}", site_id);
    }
    let Some(bootstrap) = response.data else {
        anyhow::bail!("No bootstrap data stored for {}", site_id);
    };

    let document =
        ContentDocument::from_bootstrap(&bootstrap).context("Malformed bootstrap document")?;
    let json = serde_json::to_string_pretty(&document)?;

    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Document written to {}", path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}

/// Apply `<path>=<value>` edits to a snapshot file.
fn cmd_edit(input: &Path, edits: &[String]) -> Result<()> {
    let raw = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let mut document: ContentDocument =
        serde_json::from_str(&raw).context("Malformed document snapshot")?;

    for edit in edits {
        let (path, value) = parse_edit(edit)?;
        document
            .set_path(path, value)
            .with_context(|| format!("Failed to apply '{}'", edit))?;
        info!("set {}", path);
    }

    std::fs::write(input, serde_json::to_string_pretty(&document)?)
        .with_context(|| format!("Failed to write {}", input.display()))?;
    println!("Applied {} edit(s) to {}", edits.len(), input.display());

    Ok(())
}

/// Push a snapshot as one save request.
async fn cmd_push(
    endpoint: Url,
    site: &str,
    name: &str,
    template: &str,
    input: &Path,
) -> Result<()> {
    let site_id = SiteId::new(site).context("Invalid site id")?;
    let raw = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let content: ContentDocument =
        serde_json::from_str(&raw).context("Malformed document snapshot")?;

    let client = HttpPersistenceClient::new(endpoint).context("Failed to create client")?;
    let profile = SiteProfile {
        site_id: site_id.clone(),
        site_name: name.to_string(),
        template: template.to_string(),
    };
    let request = SaveRequest::from_payload(&SavePayload::new(profile, content));

    let response = client.save_site(&request).await.context("Save failed")?;
    if !response.success {
        anyhow::bail!(
            "Save rejected: {}",
            response.error.unwrap_or_else(|| "unknown".to_string())
        );
    }

    println!(
        "Saved {} ({} sections)",
        site_id,
        request.content.sections.len()
    );
    Ok(())
}

/// Split `<path>=<value>`, parsing the value as JSON with a plain-string
/// fallback.
fn parse_edit(edit: &str) -> Result<(&str, serde_json::Value)> {
    let (path, raw_value) = edit
        .split_once('=')
        .with_context(|| format!("Edit '{}' is not of the form <path>=<value>", edit))?;
    let value = serde_json::from_str(raw_value)
        .unwrap_or_else(|_| serde_json::Value::String(raw_value.to_string()));
    Ok((path, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_edit_json_and_string_values() {
        let (path, value) = parse_edit("hero.title=\"New Title\"").unwrap();
        assert_eq!(path, "hero.title");
        assert_eq!(value, json!("New Title"));

        let (_, value) = parse_edit("hero.title=New Title").unwrap();
        assert_eq!(value, json!("New Title"));

        let (_, value) = parse_edit("sections.hero-1.content.badges=[1,2]").unwrap();
        assert_eq!(value, json!([1, 2]));

        assert!(parse_edit("no-equals-sign").is_err());
    }

    #[test]
    fn test_cmd_edit_round_trip() {
        let bootstrap = serde_json::from_value(json!({
            "businessName": "Acme",
            "customization": { "hero": { "title": "Old" } }
        }))
        .unwrap();
        let document = ContentDocument::from_bootstrap(&bootstrap).unwrap();

        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), serde_json::to_string_pretty(&document).unwrap()).unwrap();

        cmd_edit(
            file.path(),
            &[
                "hero.title=\"Updated\"".to_string(),
                "businessName=Acme & Sons".to_string(),
            ],
        )
        .unwrap();

        let edited: ContentDocument =
            serde_json::from_str(&std::fs::read_to_string(file.path()).unwrap()).unwrap();
        assert_eq!(edited.business_name, "Acme & Sons");
        assert_eq!(
            edited.section("hero-1").unwrap().content["title"],
            json!("Updated")
        );
    }
}
