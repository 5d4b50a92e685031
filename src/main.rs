use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use clap::{Args, Parser, Subcommand};
use serde_json::Value;

use authz_bootstrap::authz::{AnonymousIdentity, RoleKeyResolver};
use authz_bootstrap::cache::{BootstrapRequest, BootstrapResponse, BootstrapTransport};
use authz_bootstrap::models::EditorProfile;
use authz_bootstrap::{
    AppResult, BootstrapCache, BootstrapConfig, EditorTransform, FlatSelection, LoadOptions,
    QueryEngine,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "role-scoped bootstrap inspection tool", long_about = None)]
struct Cli {
    #[command(flatten)]
    source: SourceArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Read the bootstrap payload from a JSON file instead of the endpoint
    #[arg(long, global = true)]
    bootstrap: Option<PathBuf>,
    /// Role key; derived from `--user` or the default partition when omitted
    #[arg(long, global = true)]
    role: Option<String>,
    /// Identity record as inline JSON, e.g. '{"role":"admin"}'
    #[arg(long, global = true)]
    user: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the menu tree
    Menu,
    /// Check whether a feature is enabled
    Check {
        module: String,
        feature: String,
        #[arg(long)]
        scope: Option<String>,
    },
    /// List the columns of a table
    Columns { module: String, table: String },
    /// Flatten a saved profile into editor keys
    Flatten { profile: PathBuf },
    /// Rebuild a permission tree from editor keys
    Rebuild { selection: PathBuf },
}

/// Serves a payload read from disk, as a 200 on every request.
struct FileTransport {
    path: PathBuf,
}

#[async_trait]
impl BootstrapTransport for FileTransport {
    async fn fetch(&self, _request: &BootstrapRequest) -> AppResult<BootstrapResponse> {
        let body = tokio::fs::read(&self.path).await?;
        Ok(BootstrapResponse::Modified {
            body: decode_json(&body)?,
            etag: None,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_env();
    init_tracing();

    let cli = Cli::parse();
    let config = BootstrapConfig::from_env()?;
    let cache = build_cache(&config, cli.source.bootstrap.as_deref())?;

    let mut options = LoadOptions::new();
    if let Some(role) = &cli.source.role {
        options = options.for_role(role);
    }
    if let Some(user) = &cli.source.user {
        let user: Value = serde_json::from_str(user).context("--user is not valid JSON")?;
        options = options.with_identity(user);
    }

    let data = cache
        .load_bootstrap(options)
        .await
        .context("failed to load bootstrap")?;
    let query = QueryEngine::new(Some(data.clone()));

    match cli.command {
        Commands::Menu => print_json(&query.menu())?,
        Commands::Check {
            module,
            feature,
            scope,
        } => {
            let enabled = query.is_feature_enabled(&module, &feature, scope.as_deref());
            println!("{enabled}");
        }
        Commands::Columns { module, table } => {
            print_json(&query.columns(&module, &table))?;
        }
        Commands::Flatten { profile } => {
            let profile = EditorProfile::from_path(&profile)
                .with_context(|| format!("failed to read profile {}", profile.display()))?;
            let selection = EditorTransform::new(&data.fields).flatten(&profile.permissions);
            print_json(&selection)?;
        }
        Commands::Rebuild { selection } => {
            let selection: FlatSelection = read_json(&selection)?;
            let tree = EditorTransform::new(&data.fields).rebuild(&selection);
            print_json(&tree)?;
        }
    }

    Ok(())
}

fn build_cache(config: &BootstrapConfig, bootstrap: Option<&Path>) -> anyhow::Result<BootstrapCache> {
    let identity = Arc::new(AnonymousIdentity);
    match bootstrap {
        Some(path) => {
            let transport = FileTransport {
                path: path.to_path_buf(),
            };
            let resolver = RoleKeyResolver::new(identity).with_default_key(&config.default_role);
            Ok(BootstrapCache::new(Arc::new(transport), resolver))
        }
        None => Ok(BootstrapCache::from_config(config, identity)?),
    }
}

fn decode_json(bytes: &[u8]) -> AppResult<Value> {
    let de = &mut serde_json::Deserializer::from_slice(bytes);
    Ok(serde_path_to_error::deserialize(de)?)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let de = &mut serde_json::Deserializer::from_slice(&bytes);
    serde_path_to_error::deserialize(de).with_context(|| format!("invalid JSON in {}", path.display()))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn load_env() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    let _ = dotenvy::from_path(crate_env);
}

fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr);

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
