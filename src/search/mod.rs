//! Multi-strategy documentation search
//!
//! Every [`SearchStrategy`] runs concurrently under its own timeout. A failing
//! strategy only produces an error entry for itself; results are then ranked
//! so that URL-bearing hits come first, by descending strategy priority.

mod strategy;

pub use strategy::{SearchStrategy, StrategyError, StrategyMatch};

use crate::config::SearchConfig;
use crate::crawler::Fetcher;
use crate::resilience::{CallClass, CallOptions, ResilientCaller};
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Outcome of one strategy
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub source: String,
    pub response_time_ms: u64,
    pub priority: u8,
}

impl SearchHit {
    pub fn has_url(&self) -> bool {
        self.url.is_some()
    }
}

/// Orders hits: URL-bearing first, then by descending priority
///
/// The sort is stable, so hits that compare equal keep strategy order.
pub fn rank_results(mut hits: Vec<SearchHit>) -> Vec<SearchHit> {
    hits.sort_by(|a, b| {
        b.has_url()
            .cmp(&a.has_url())
            .then_with(|| b.priority.cmp(&a.priority))
    });
    hits
}

pub struct SearchAggregator {
    strategies: Vec<SearchStrategy>,
    fetcher: Arc<dyn Fetcher>,
    caller: Arc<ResilientCaller>,
    timeout: Duration,
    probe_retries: u32,
}

impl SearchAggregator {
    /// Creates an aggregator running the three built-in strategies
    pub fn new(
        config: &SearchConfig,
        fetcher: Arc<dyn Fetcher>,
        caller: Arc<ResilientCaller>,
    ) -> Self {
        let strategies = vec![
            SearchStrategy::OfficialSites,
            SearchStrategy::DevDocs {
                base_url: config.devdocs_url.clone(),
            },
            SearchStrategy::ReadTheDocs {
                template: config.readthedocs_template.clone(),
            },
        ];

        Self::with_strategies(strategies, config, fetcher, caller)
    }

    pub fn with_strategies(
        strategies: Vec<SearchStrategy>,
        config: &SearchConfig,
        fetcher: Arc<dyn Fetcher>,
        caller: Arc<ResilientCaller>,
    ) -> Self {
        Self {
            strategies,
            fetcher,
            caller,
            timeout: config.strategy_timeout(),
            probe_retries: config.probe_retries,
        }
    }

    /// Runs every strategy for `framework` and returns the ranked hits
    pub async fn search(&self, framework: &str) -> Vec<SearchHit> {
        tracing::info!(
            "Searching documentation for {} with {} strategies",
            framework,
            self.strategies.len()
        );

        let hits = join_all(
            self.strategies
                .iter()
                .map(|strategy| self.run_strategy(strategy, framework)),
        )
        .await;

        rank_results(hits)
    }

    async fn run_strategy(&self, strategy: &SearchStrategy, framework: &str) -> SearchHit {
        let start = Instant::now();
        let options = CallOptions {
            class: CallClass::Fetch,
            max_retries: self.probe_retries,
            timeout: self.timeout,
        };

        let outcome = tokio::time::timeout(
            self.timeout,
            strategy.search(framework, self.fetcher.as_ref(), &self.caller, &options),
        )
        .await;

        let mut hit = SearchHit {
            url: None,
            name: None,
            confidence: None,
            error: None,
            source: strategy.source().to_string(),
            response_time_ms: start.elapsed().as_millis() as u64,
            priority: strategy.priority(),
        };

        match outcome {
            Ok(Ok(found)) => {
                tracing::debug!("{} found {}", strategy.source(), found.url);
                hit.url = Some(found.url);
                hit.name = Some(found.name);
                hit.confidence = Some(strategy.confidence());
            }
            Ok(Err(e)) => {
                tracing::debug!("{} found nothing: {}", strategy.source(), e);
                hit.error = Some(e.to_string());
            }
            Err(_) => {
                tracing::warn!(
                    "{} search timed out after {:?}",
                    strategy.source(),
                    self.timeout
                );
                hit.error = Some(format!("search timed out after {:?}", self.timeout));
            }
        }

        hit
    }
}
