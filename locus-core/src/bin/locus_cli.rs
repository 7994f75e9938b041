//! Locus CLI - Resolve Outputs And Render Tags
//!
//! Commands: resolve, render
//! Locations and markup go to stdout, errors as JSON
//! Returns 2 when a location resolves to nothing

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use locus_core::{read_locator, Locator, TagDefinition, TeraEvaluator};

#[derive(Parser)]
#[command(name = "locus-cli")]
#[command(about = "Locus CLI - manifest output locations and tag rendering")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the output manifest
    #[arg(short, long)]
    manifest: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the location of a document or image output
    Resolve {
        #[arg(value_enum)]
        kind: Kind,

        /// Output name
        name: String,

        /// Image size key
        #[arg(short, long, required_if_eq("kind", "image"))]
        size: Option<String>,

        /// Resolve against the output path or public base URL
        #[arg(long)]
        absolute: bool,

        /// Resolve the URL instead of the path
        #[arg(long)]
        url: bool,

        /// Resolve relative to this document
        #[arg(long)]
        for_document: Option<String>,
    },

    /// Render tag definitions, one tag per line
    Render {
        /// JSON file holding an array of tag definitions
        #[arg(short, long)]
        tags: PathBuf,

        /// Render relative to this document
        #[arg(long)]
        for_document: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Document,
    Image,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "locus_core=info,locus_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let locator = match read_locator(&cli.manifest) {
        Ok(locator) => locator,
        Err(e) => return failure(&e),
    };

    match cli.command {
        Commands::Resolve {
            kind,
            name,
            size,
            absolute,
            url,
            for_document,
        } => {
            let locator = match rebase(locator, for_document.as_deref()) {
                Ok(locator) => locator,
                Err(e) => return failure(&e),
            };
            let size = size.unwrap_or_default();

            let location = match (kind, absolute, url) {
                (Kind::Document, false, false) => locator.document_path(&name),
                (Kind::Document, false, true) => locator.document_url(&name),
                (Kind::Document, true, false) => locator.absolute_document_path(&name),
                (Kind::Document, true, true) => locator.absolute_document_url(&name),
                (Kind::Image, false, false) => locator.image_path(&name, &size),
                (Kind::Image, false, true) => locator.image_url(&name, &size),
                (Kind::Image, true, false) => locator.absolute_image_path(&name, &size),
                (Kind::Image, true, true) => locator.absolute_image_url(&name, &size),
            };

            match location {
                Some(location) => {
                    println!("{location}");
                    ExitCode::SUCCESS
                }
                None => {
                    tracing::warn!(%name, "output does not resolve to a location");
                    ExitCode::from(2)
                }
            }
        }

        Commands::Render { tags, for_document } => {
            let definitions: Vec<TagDefinition> = match std::fs::read_to_string(&tags)
                .map_err(|source| locus_core::Error::Read {
                    path: tags.clone(),
                    source,
                })
                .and_then(|contents| Ok(serde_json::from_str(&contents)?))
            {
                Ok(definitions) => definitions,
                Err(e) => return failure(&e),
            };

            let rendered = rebase(locator, for_document.as_deref())
                .and_then(|locator| locator.render_tag_list(&definitions, &TeraEvaluator::new()));

            match rendered {
                Ok(rendered) => {
                    for tag in rendered {
                        println!("{tag}");
                    }
                    ExitCode::SUCCESS
                }
                Err(e) => failure(&e),
            }
        }
    }
}

fn rebase(locator: Locator, document: Option<&str>) -> locus_core::Result<Locator> {
    match document {
        Some(name) => locator.for_document(name),
        None => Ok(locator),
    }
}

fn failure(error: &locus_core::Error) -> ExitCode {
    let output = serde_json::json!({
        "success": false,
        "error": error.to_string(),
    });
    println!("{output}");
    ExitCode::FAILURE
}
