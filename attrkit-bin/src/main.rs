use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use attrkit_core::{
    AttributeStore, TracingSink,
    config::{AttributeOptions, Config},
};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{Map, Value, json};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "attrkit CLI smoke tool", long_about = None)]
struct Cli {
    /// Config file (JSON or TOML). Without one every entity is unbounded.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a JSON object of attributes through an entity's store and print the result
    Normalize {
        #[arg(long, value_enum, default_value_t = Entity::Span)]
        entity: Entity,
        #[arg(short, long, help = "JSON file with an attribute object, or - for stdin")]
        input: String,
    },
    /// Print the effective limits for an entity, environment overrides included
    Limits {
        #[arg(long, value_enum, default_value_t = Entity::Span)]
        entity: Entity,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Entity {
    Span,
    Event,
    Link,
    Resource,
}

impl Entity {
    fn label(self) -> &'static str {
        match self {
            Entity::Span => "span",
            Entity::Event => "event",
            Entity::Link => "link",
            Entity::Resource => "resource",
        }
    }

    fn options(self, cfg: &Config) -> AttributeOptions {
        match self {
            Entity::Span => cfg.span.clone(),
            Entity::Event => cfg.event.clone(),
            Entity::Link => cfg.link.clone(),
            Entity::Resource => cfg.resource.clone(),
        }
    }
}

fn read_input(input: &str) -> anyhow::Result<Map<String, Value>> {
    let raw = if input == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(input)?
    };
    Ok(serde_json::from_str(&raw)?)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cfg = match &cli.config {
        Some(path) => Config::from_path(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Normalize { entity, input } => {
            let options = entity.options(&cfg);
            let limits = options.limits().with_process_env()?;
            let store = AttributeStore::empty(limits)
                .labelled(entity.label())
                .reporting_to(Arc::new(TracingSink));
            store.set(options.attributes).set(read_input(&input)?);

            let out = json!({
                "entity": entity.label(),
                "attributes": store.snapshot(),
                "dropped": store.dropped_fields(),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Commands::Limits { entity } => {
            let limits = entity.options(&cfg).limits().with_process_env()?;
            let out = json!({
                "entity": entity.label(),
                "attribute_count_limit": limits.count,
                "attribute_length_limit": limits.length,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }

    Ok(())
}
