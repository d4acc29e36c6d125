use crate::client::CatalogClient;
use crate::composer::CatalogSource;
use crate::db::Database;
use crate::models::{Drill, DrillQuery};

/// The catalog a running planner draws drills from.
#[derive(Debug, Clone)]
pub enum CatalogBackend {
    /// The planner's own SQLite catalog.
    Local(Database),
    /// A shared catalog served by another drillbook instance.
    Remote(CatalogClient),
}

impl CatalogBackend {
    pub fn describe(&self) -> String {
        match self {
            Self::Local(_) => "local database".to_string(),
            Self::Remote(client) => format!("remote catalog at {}", client.base_url()),
        }
    }
}

impl CatalogSource for CatalogBackend {
    async fn query(&self, query: &DrillQuery) -> anyhow::Result<Vec<Drill>> {
        match self {
            Self::Local(db) => db.query(query).await,
            Self::Remote(client) => client.query(query).await,
        }
    }
}
