//! Neo4j connection management and shared gateway client.

use neo4rs::{ConfigBuilder, Graph, Query, Row, Txn};

/// Errors from gateway operations.
///
/// `Connection`, `Query`, `Deserialize`, and `Store` are the dependency
/// failures: the store was unreachable, rejected a query, or misbehaved.
/// Their original diagnostics are always retained.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Neo4j connection error: {0}")]
    Connection(String),

    #[error("Neo4j query error: {0}")]
    Query(#[from] neo4rs::Error),

    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("deserialization error: {0}")]
    Deserialize(String),

    #[error("store error: {0}")]
    Store(String),
}

impl GraphError {
    pub(crate) fn node_not_found(key: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "node",
            key: key.into(),
        }
    }

    pub(crate) fn relationship_not_found(key: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "relationship",
            key: key.into(),
        }
    }
}

/// Configuration for connecting to Neo4j.
#[derive(Debug, Clone)]
pub struct GraphConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub max_connections: u32,
    pub fetch_size: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: "assetgraph-dev".to_string(),
            max_connections: 16,
            fetch_size: 256,
        }
    }
}

impl From<&assetgraph_core::config::StoreSettings> for GraphConfig {
    fn from(settings: &assetgraph_core::config::StoreSettings) -> Self {
        Self {
            uri: settings.uri.clone(),
            user: settings.user.clone(),
            password: settings.password.clone(),
            max_connections: settings.max_connections,
            fetch_size: settings.fetch_size,
        }
    }
}

/// Thread-safe Neo4j gateway client with connection pooling.
///
/// All node and relationship persistence flows through this client.
/// Clone is cheap (inner Arc).
#[derive(Clone)]
pub struct GraphClient {
    graph: Graph,
}

impl GraphClient {
    /// Connect to Neo4j with the given configuration.
    pub async fn connect(config: &GraphConfig) -> Result<Self, GraphError> {
        let neo_config = ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.user)
            .password(&config.password)
            .max_connections(config.max_connections as usize)
            .fetch_size(config.fetch_size)
            .build()
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        let graph = Graph::connect(neo_config)
            .await
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        tracing::info!(uri = %config.uri, "Connected to Neo4j");
        Ok(Self { graph })
    }

    /// Get a reference to the underlying neo4rs Graph for direct operations.
    pub fn inner(&self) -> &Graph {
        &self.graph
    }

    /// Execute a write-only query (CREATE, MERGE, DELETE, SET).
    pub async fn run(&self, query: Query) -> Result<(), GraphError> {
        self.graph.run(query).await?;
        Ok(())
    }

    /// Execute a read query and collect all rows.
    pub async fn query_rows(&self, query: Query) -> Result<Vec<Row>, GraphError> {
        let mut stream = self.graph.execute(query).await?;
        let mut rows = Vec::new();
        while let Some(row) = stream.next().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Execute a read query and return the first row, if any.
    pub async fn query_one(&self, query: Query) -> Result<Option<Row>, GraphError> {
        let mut stream = self.graph.execute(query).await?;
        Ok(stream.next().await?)
    }

    /// Begin a transaction. Dropping an uncommitted transaction rolls back.
    pub async fn start_txn(&self) -> Result<Txn, GraphError> {
        Ok(self.graph.start_txn().await?)
    }
}

/// Run a query inside an open transaction and return its first row, if any.
pub(crate) async fn txn_query_one(txn: &mut Txn, query: Query) -> Result<Option<Row>, GraphError> {
    let mut stream = txn.execute(query).await?;
    Ok(stream.next(txn.handle()).await?)
}
