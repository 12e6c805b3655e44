//! CLI entry point for the AssetGraph gateway.
//!
//! Thin operational surface over the gateway: node and relationship CRUD
//! plus a raw parameterized query runner. Results print as JSON on stdout.

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};
use uuid::Uuid;

use assetgraph_core::config::load_store_settings;
use assetgraph_core::{GraphNode, PropertyMap};
use assetgraph_gateway::{GraphClient, GraphConfig, RelType};

#[derive(Parser)]
#[command(name = "assetgraph")]
#[command(about = "Operational CLI for the AssetGraph Neo4j gateway")]
struct Cli {
    /// Config file prefix (default: assetgraph).
    #[arg(short, long, default_value = "assetgraph")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Node operations.
    #[command(subcommand)]
    Node(NodeCommand),

    /// Relationship operations.
    #[command(subcommand)]
    Rel(RelCommand),

    /// Run raw Cypher and print normalized rows.
    Query {
        /// Cypher query text.
        text: String,

        /// Bound parameters as a JSON object.
        #[arg(short, long)]
        params: Option<String>,
    },
}

#[derive(Subcommand)]
enum NodeCommand {
    /// List all nodes.
    List,

    /// Get one node by business key.
    Get { cbdb_id: String },

    /// Create a node.
    Create {
        /// Business key; generated when omitted.
        #[arg(long)]
        cbdb_id: Option<String>,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        item_type: Option<String>,

        #[arg(long)]
        importance: Option<String>,

        #[arg(long)]
        status: Option<String>,
    },

    /// Change a node's type tag (isLink is recomputed).
    UpdateType {
        cbdb_id: String,
        item_type: String,
    },

    /// Delete a node by business key (idempotent).
    Delete { cbdb_id: String },
}

#[derive(Subcommand)]
enum RelCommand {
    /// Create a typed edge between two nodes.
    Create {
        source: String,
        target: String,
        rel_type: String,

        /// Edge properties as a JSON object.
        #[arg(short, long)]
        props: Option<String>,
    },

    /// List relationships of a given type.
    List { rel_type: String },

    /// Delete the edges matching (source, target, type) (idempotent).
    Delete {
        source: String,
        target: String,
        rel_type: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).json().init();

    let cli = Cli::parse();

    let settings = load_store_settings(&cli.config)?;
    let client = GraphClient::connect(&GraphConfig::from(&settings)).await?;

    match cli.command {
        Command::Node(cmd) => run_node_command(&client, cmd).await,
        Command::Rel(cmd) => run_rel_command(&client, cmd).await,
        Command::Query { text, params } => {
            let params = parse_params(params.as_deref())?;
            let rows = client.execute_query_with_params(&text, &params).await?;
            print_json(&rows)
        }
    }
}

async fn run_node_command(client: &GraphClient, cmd: NodeCommand) -> anyhow::Result<()> {
    match cmd {
        NodeCommand::List => {
            let nodes = client.find_all_nodes().await?;
            print_json(&nodes)
        }
        NodeCommand::Get { cbdb_id } => match client.find_node_by_cbdb_id(&cbdb_id).await? {
            Some(node) => print_json(&node),
            None => anyhow::bail!("node not found: {cbdb_id}"),
        },
        NodeCommand::Create {
            cbdb_id,
            name,
            item_type,
            importance,
            status,
        } => {
            let key = cbdb_id.unwrap_or_else(|| Uuid::new_v4().to_string());
            let mut node = GraphNode::new(key);
            node.name = name;
            node.set_item_type(item_type);
            node.importance = importance;
            node.status = status;

            let created = client.create_node(&node).await?;
            print_json(&created)
        }
        NodeCommand::UpdateType { cbdb_id, item_type } => {
            let mut node = client
                .find_node_by_cbdb_id(&cbdb_id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("node not found: {cbdb_id}"))?;
            node.set_item_type(Some(item_type));
            let updated = client.update_node(&node).await?;
            print_json(&updated)
        }
        NodeCommand::Delete { cbdb_id } => {
            client.delete_node_by_cbdb_id(&cbdb_id).await?;
            tracing::info!(%cbdb_id, "node deleted");
            Ok(())
        }
    }
}

async fn run_rel_command(client: &GraphClient, cmd: RelCommand) -> anyhow::Result<()> {
    match cmd {
        RelCommand::Create {
            source,
            target,
            rel_type,
            props,
        } => {
            let rel_type = RelType::new(rel_type)?;
            let props = parse_params(props.as_deref())?;
            let created = client
                .create_relationship_with_properties(&source, &target, &rel_type, &props)
                .await?;
            print_json(&created)
        }
        RelCommand::List { rel_type } => {
            let rels = client.find_relationships_by_type(&rel_type).await?;
            print_json(&rels)
        }
        RelCommand::Delete {
            source,
            target,
            rel_type,
        } => {
            let rel_type = RelType::new(rel_type)?;
            client
                .delete_relationship_between(&source, &target, &rel_type)
                .await?;
            tracing::info!(%source, %target, rel_type = %rel_type, "relationship deleted");
            Ok(())
        }
    }
}

fn parse_params(raw: Option<&str>) -> anyhow::Result<PropertyMap> {
    match raw {
        Some(text) => {
            serde_json::from_str(text).map_err(|e| anyhow::anyhow!("invalid JSON object: {e}"))
        }
        None => Ok(PropertyMap::new()),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
