//! provenance CLI tool
//!
//! Command-line checks for provenance catalogs and snapshots.
//!
//! ## Commands
//!
//! - `check`: Load a catalog and report its definitions and rules
//! - `labels <snapshot>`: Print the version and label of every node
//! - `validate <snapshot>`: Check a proposed edge against the catalog rules
//!
//! Snapshot files are JSON, either a `{nodes, edges, studies}` snapshot or a full provenance
//! export (`provenanceNodes`, `dependencyRelationships`, ...).

use clap::{Parser, Subcommand};
use provenance_core::{
    catalog::Catalog,
    config::{EngineConfig, EngineConfigProvider, TomlConfigProvider},
    engine::ProvenanceEngine,
    properties::{Classification, Edge, RelationshipType},
    snapshot::Snapshot,
    store::{MemoryStore, StoreContents},
    version::VersionScope,
    ProvenanceError,
};
use std::{
    fs::read_to_string,
    path::{Path, PathBuf},
    str::FromStr,
};

#[derive(Parser)]
#[command(name = "provenance")]
#[command(
    author,
    version,
    about = "Check provenance catalogs, versions and relationships",
    long_about = None
)]
struct Cli {
    /// Engine configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Catalog file (TOML or JSON), overriding the configured one
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Number versions per definition within each study
    #[arg(long, global = true)]
    per_study: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and check a catalog
    Check {
        /// List every definition and rule
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print the version and label of every node in a snapshot
    Labels {
        /// Snapshot or export file (JSON)
        snapshot: PathBuf,
    },

    /// Validate a proposed edge against a snapshot
    Validate {
        /// Snapshot or export file (JSON)
        snapshot: PathBuf,

        /// Source node id
        #[arg(long)]
        source: String,

        /// Target node id
        #[arg(long)]
        target: String,

        /// Relationship type ("Used" or "Generated by")
        #[arg(long = "type")]
        relationship: String,
    },
}

fn load_config(cli: &Cli) -> Result<EngineConfig, ProvenanceError> {
    let mut config = match cli.config.as_ref() {
        Some(path) => TomlConfigProvider::new(path.clone()).get_config()?,
        None => EngineConfig::default(),
    };
    if let Some(catalog) = cli.catalog.as_ref() {
        config.catalog = Some(catalog.clone());
    }
    if cli.per_study {
        config.version_scope = VersionScope::DefinitionAndStudy;
    }
    Ok(config)
}

fn load_snapshot(path: &Path) -> Result<Snapshot, ProvenanceError> {
    let content = read_to_string(path)?;
    match Snapshot::from_json(&content) {
        Ok(snapshot) => Ok(snapshot),
        Err(snapshot_err) => {
            tracing::debug!("{path:?} is not a snapshot ({snapshot_err}), trying export format");
            let contents = StoreContents::from_json(&content)?;
            Ok(MemoryStore::from_contents(contents).snapshot())
        }
    }
}

fn check(catalog: &Catalog, engine: &ProvenanceEngine, verbose: bool) {
    let registry = engine.registry();
    println!(
        "Catalog OK: {} definitions ({} entities, {} activities, {} agents), {} rules",
        registry.len(),
        registry.by_classification(Classification::Entity).count(),
        registry.by_classification(Classification::Activity).count(),
        registry.by_classification(Classification::Agent).count(),
        engine.rules().len()
    );
    if !verbose {
        return;
    }
    for definition in catalog.definitions.iter() {
        println!(
            "  {} [{}] {}",
            definition.id,
            definition.classification,
            definition.label_format_string.as_deref().unwrap_or("-")
        );
    }
    for rule in engine.rules().iter() {
        let types: Vec<&str> = rule.types.iter().map(|t| t.as_str()).collect();
        println!(
            "  {}: {} --[{}]--> {} ({})",
            rule.id,
            rule.source,
            types.join(", "),
            rule.target,
            rule.cardinality
        );
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let catalog = config.load_catalog()?;
    let engine = ProvenanceEngine::from_catalog(&catalog, config.version_scope)?;

    match cli.command {
        Commands::Check { verbose } => check(&catalog, &engine, verbose),

        Commands::Labels { snapshot } => {
            let snapshot = load_snapshot(&snapshot)?;
            let versions = engine.compute_versions(&snapshot);
            let labels = engine.render_labels(&snapshot);
            for node in snapshot.nodes.iter() {
                println!(
                    "{}\t{}\t{}\t{}",
                    node.id,
                    node.definition_id,
                    versions.get(&node.id).unwrap_or_default(),
                    labels.get(&node.id).map(String::as_str).unwrap_or_default()
                );
            }
            if !versions.cyclic.is_empty() {
                eprintln!(
                    "Warning: {} node(s) are part of a dependency cycle and have version 0: {}",
                    versions.cyclic.len(),
                    versions.cyclic.join(", ")
                );
            }
        }

        Commands::Validate {
            snapshot,
            source,
            target,
            relationship,
        } => {
            let snapshot = load_snapshot(&snapshot)?;
            let relationship = RelationshipType::from_str(&relationship)?;
            let proposed = Edge::new("proposed", relationship, &source, &target);
            match engine.validate_edge(&proposed, &snapshot) {
                Ok(rule) => println!("OK: {proposed} is allowed by rule '{}'", rule.id),
                Err(e) => {
                    eprintln!("Rejected: {e}");
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
