//! Tree Bridge CLI
//!
//! Mounts a JSON document as a tree node provider and drives it through the
//! bridge the way a consumer would:
//! - `walk` resolves the tree level by level and prints it
//! - `activate` finds a node by its label path and runs its click command

use anyhow::{bail, Context};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use treebridge_runtime::{
    BridgeClient, BridgeConfig, BridgeServer, CommandRegistry, ExternalNode, InternalNode,
    JsonTreeProvider, NoopConsumerProxy, ProviderId, TreeBridge,
};

/// Tree Bridge CLI
#[derive(Parser)]
#[command(name = "treebridge")]
#[command(about = "Walk and activate JSON trees through the tree bridge", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "TREEBRIDGE_CONFIG")]
    config: Option<String>,

    /// Log level, overriding the configured one
    #[arg(long, env = "TREEBRIDGE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "TREEBRIDGE_LOG_JSON")]
    json: bool,

    /// Provider id the tree is registered under
    #[arg(short, long, default_value = "json")]
    provider: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the tree
    Walk {
        /// JSON document holding the tree
        tree: PathBuf,

        /// Stop expanding below this depth
        #[arg(short, long)]
        depth: Option<usize>,

        /// Print one JSON node per line instead of an outline
        #[arg(long)]
        lines: bool,
    },

    /// Run the click command of the node at a label path
    Activate {
        /// JSON document holding the tree
        tree: PathBuf,

        /// Labels from the root's children down, separated by '/'
        path: String,
    },
}

/// Command registry that reports activations on stdout
struct PrintingCommands;

#[async_trait]
impl CommandRegistry for PrintingCommands {
    async fn execute_command(
        &self,
        command: &str,
        arguments: &[Value],
        node: ExternalNode,
    ) -> anyhow::Result<Value> {
        let activation = serde_json::json!({
            "command": command,
            "arguments": arguments,
            "node": node.as_argument(),
        });
        println!("{}", serde_json::to_string_pretty(&activation)?);
        Ok(Value::Null)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = BridgeConfig::load(cli.config.as_deref()).context("loading configuration")?;

    // Initialize tracing
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| level.into());

    // Logs go to stderr; stdout carries the tree and activations.
    if cli.json || config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    let tree = match &cli.command {
        Command::Walk { tree, .. } | Command::Activate { tree, .. } => tree,
    };
    let document = std::fs::read_to_string(tree)
        .with_context(|| format!("reading tree from {}", tree.display()))?;
    let provider = JsonTreeProvider::parse(&document)
        .with_context(|| format!("parsing tree from {}", tree.display()))?;

    let bridge = TreeBridge::new(
        &config,
        Arc::new(PrintingCommands),
        Arc::new(NoopConsumerProxy),
    );
    let provider_id = ProviderId::new(cli.provider.clone());
    let registration = bridge.register_provider(provider_id.clone(), Arc::new(provider))?;
    let (client, handle) = BridgeServer::spawn(bridge.clone(), &config.server);

    let outcome = match &cli.command {
        Command::Walk { depth, lines, .. } => walk(&client, &provider_id, *depth, *lines).await,
        Command::Activate { path, .. } => activate(&client, &provider_id, path).await,
    };

    drop(client);
    handle.shutdown().await;
    registration.dispose();
    tracing::debug!(telemetry = ?bridge.telemetry(), "bridge finished");

    outcome
}

/// Depth-first walk in provider order
async fn walk(
    client: &BridgeClient,
    provider_id: &ProviderId,
    max_depth: Option<usize>,
    lines: bool,
) -> anyhow::Result<()> {
    let root = client.provide_root_node(provider_id.clone()).await?;
    let mut pending = vec![(root, 0usize)];

    while let Some((node, depth)) = pending.pop() {
        if lines {
            println!("{}", serde_json::to_string(&node)?);
        } else {
            let marker = if node.has_click_command() { " *" } else { "" };
            println!("{}{} [{}]{}", "  ".repeat(depth), node.label, node.id, marker);
        }

        if !node.has_children || max_depth.is_some_and(|max| depth >= max) {
            continue;
        }
        let children = client.resolve_children(provider_id.clone(), &node).await?;
        pending.extend(children.into_iter().rev().map(|child| (child, depth + 1)));
    }
    Ok(())
}

/// Follow `path` label by label and activate the node it ends on
async fn activate(client: &BridgeClient, provider_id: &ProviderId, path: &str) -> anyhow::Result<()> {
    let mut node = client.provide_root_node(provider_id.clone()).await?;

    for label in path.split('/').filter(|segment| !segment.is_empty()) {
        node = find_child(client, provider_id, &node, label).await?;
    }

    if !node.has_click_command() {
        bail!("node '{}' has no click command", node.label);
    }
    client.execute_node_command(provider_id.clone(), &node).await?;
    Ok(())
}

async fn find_child(
    client: &BridgeClient,
    provider_id: &ProviderId,
    parent: &InternalNode,
    label: &str,
) -> anyhow::Result<InternalNode> {
    let children = client.resolve_children(provider_id.clone(), parent).await?;
    children
        .into_iter()
        .find(|child| child.label == label)
        .with_context(|| format!("no child labelled '{label}' under '{}'", parent.label))
}
