use std::future::Future;
use std::sync::Arc;

use super::error::{ComposeError, Result};
use crate::models::{Difficulty, Drill, DrillQuery};

/// Anything that can answer a drill catalog query.
///
/// Implemented by the local store, the remote HTTP client, and the
/// configuration-selected backend. A source may over-match (a remote catalog
/// that filters by substring, say); [`DrillCatalogAdapter`] narrows the
/// result to exact matches either way.
pub trait CatalogSource: Send + Sync {
    fn query(&self, query: &DrillQuery)
        -> impl Future<Output = anyhow::Result<Vec<Drill>>> + Send;
}

impl<T: CatalogSource> CatalogSource for Arc<T> {
    fn query(
        &self,
        query: &DrillQuery,
    ) -> impl Future<Output = anyhow::Result<Vec<Drill>>> + Send {
        T::query(self, query)
    }
}

/// Resolves a component name to candidate drills.
///
/// Read-only and stateless beyond its source. Failures are reported as
/// [`ComposeError::CatalogUnavailable`] and never retried here.
#[derive(Debug, Clone)]
pub struct DrillCatalogAdapter<S> {
    source: S,
}

impl<S: CatalogSource> DrillCatalogAdapter<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Drills whose component tag equals `component`, ignoring case.
    pub async fn fetch_for_component(&self, component: &str) -> Result<DrillMatches> {
        self.fetch_filtered(component, None).await
    }

    /// Like [`fetch_for_component`](Self::fetch_for_component), optionally
    /// restricted to one difficulty.
    pub async fn fetch_filtered(
        &self,
        component: &str,
        difficulty: Option<Difficulty>,
    ) -> Result<DrillMatches> {
        self.fetch(DrillQuery::for_component(component).with_difficulty(difficulty))
            .await
    }

    /// Run an arbitrary query. Matches are narrowed with
    /// [`DrillQuery::accepts`] whatever the source returned.
    pub async fn fetch(&self, query: DrillQuery) -> Result<DrillMatches> {
        let drills = self.source.query(&query).await.map_err(|e| {
            tracing::warn!(?query, error = %e, "Drill catalog unavailable");
            ComposeError::CatalogUnavailable(format!("{:#}", e))
        })?;

        tracing::debug!(?query, fetched = drills.len(), "Fetched catalog drills");
        Ok(DrillMatches::new(query, drills))
    }
}

/// Lazy, exact-match view over one catalog response.
///
/// Records the source returned that do not satisfy the query are skipped
/// as the iterator is consumed.
#[derive(Debug)]
pub struct DrillMatches {
    query: DrillQuery,
    drills: std::vec::IntoIter<Drill>,
}

impl DrillMatches {
    fn new(query: DrillQuery, drills: Vec<Drill>) -> Self {
        Self {
            query,
            drills: drills.into_iter(),
        }
    }
}

impl Iterator for DrillMatches {
    type Item = Drill;

    fn next(&mut self) -> Option<Drill> {
        let query = &self.query;
        self.drills.find(|drill| query.accepts(drill))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.drills.size_hint().1)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use uuid::Uuid;

    fn drill(name: &str, component: &str, difficulty: Difficulty) -> Drill {
        Drill {
            id: Uuid::new_v4(),
            name: name.to_string(),
            component: component.to_string(),
            duration_minutes: 10,
            difficulty,
            skill_focus: BTreeSet::new(),
            equipment: BTreeSet::new(),
        }
    }

    /// Mimics a backend that filters with `LIKE '%component%'`.
    struct SubstringCatalog(Vec<Drill>);

    impl CatalogSource for SubstringCatalog {
        async fn query(&self, query: &DrillQuery) -> anyhow::Result<Vec<Drill>> {
            let needle = query.component.clone().unwrap_or_default().to_lowercase();
            Ok(self
                .0
                .iter()
                .filter(|d| d.component.to_lowercase().contains(&needle))
                .cloned()
                .collect())
        }
    }

    struct OfflineCatalog;

    impl CatalogSource for OfflineCatalog {
        async fn query(&self, _query: &DrillQuery) -> anyhow::Result<Vec<Drill>> {
            anyhow::bail!("connection refused")
        }
    }

    fn catalog() -> DrillCatalogAdapter<SubstringCatalog> {
        DrillCatalogAdapter::new(SubstringCatalog(vec![
            drill("Triangle", "Passing", Difficulty::Beginner),
            drill("Warmup rondo", "Passing Warmup", Difficulty::Beginner),
            drill("Long balls", "passing", Difficulty::Advanced),
            drill("Finishing", "Shooting", Difficulty::Elite),
        ]))
    }

    #[test]
    fn narrows_substring_results_to_exact_tags() {
        let names: Vec<String> = tokio_test::block_on(catalog().fetch_for_component("PASSING"))
            .unwrap()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["Triangle", "Long balls"]);
    }

    #[test]
    fn prefix_request_matches_nothing() {
        let matches = tokio_test::block_on(catalog().fetch_for_component("Pass")).unwrap();
        assert_eq!(matches.count(), 0);
    }

    #[test]
    fn difficulty_filter_is_applied() {
        let names: Vec<String> = tokio_test::block_on(
            catalog().fetch_filtered("passing", Some(Difficulty::Advanced)),
        )
        .unwrap()
        .map(|d| d.name)
        .collect();
        assert_eq!(names, vec!["Long balls"]);
    }

    #[test]
    fn open_query_still_narrows_by_difficulty() {
        let query = DrillQuery::default().with_difficulty(Some(Difficulty::Elite));
        let names: Vec<String> = tokio_test::block_on(catalog().fetch(query))
            .unwrap()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["Finishing"]);
    }

    #[test]
    fn source_failure_is_catalog_unavailable() {
        let adapter = DrillCatalogAdapter::new(OfflineCatalog);
        let err = tokio_test::block_on(adapter.fetch_for_component("Passing")).unwrap_err();
        assert!(matches!(err, ComposeError::CatalogUnavailable(msg) if msg.contains("refused")));
    }
}
