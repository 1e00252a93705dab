//! Crawl engine - main crawl orchestration logic
//!
//! A run takes a task from `in_progress` to a terminal status, reporting
//! exclusively through the [`TaskStore`]:
//!
//! - **Basic mode**: breadth-first traversal from the seed, following only
//!   same-site documentation links, bounded by the page budget.
//! - **Intelligent mode**: discover the seed's navigation links, ask the
//!   planner for a prioritized plan focused on a topic, then visit the planned
//!   pages. Without navigation links the run falls back to basic mode.
//!
//! Individual page failures are logged and skipped. A run that scrapes no
//! pages at all ends in `error`.
//!
//! [`CrawlEngine::discover_topics`] runs only the first step of the
//! intelligent flow: it lists the topics linked from one landing page.

use crate::config::CrawlerConfig;
use crate::crawler::fetcher::{FetchedPage, Fetcher};
use crate::crawler::frontier::{page_key, Frontier};
use crate::crawler::parser::{extract_navigation_entries, extract_navigation_links, parse_page};
use crate::output::{PagePersister, ScrapedPage};
use crate::planner::{CrawlPlan, DocPlanner, PlanPriority, TopicDiscovery};
use crate::resilience::{CallClass, CallError, ResilientCaller};
use crate::state::{CrawlMode, TaskStatus, TaskStore, TaskUpdate};
use crate::url::{extract_domain, is_same_site, normalize_url, should_follow};
use crate::HarvestError;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use url::Url;

/// Progress reported while discovering navigation links
const PROGRESS_DISCOVERY: f64 = 10.0;
/// Progress reported while the crawl plan is being built
const PROGRESS_PLANNING: f64 = 20.0;
/// Progress at which plan execution starts; execution spans the next 60 points
const PROGRESS_EXECUTION: f64 = 30.0;
const PROGRESS_EXECUTION_SPAN: f64 = 60.0;
/// Highest progress reported before the terminal update
const PROGRESS_CEILING: f64 = 99.0;

/// Topic discovery checkpoints
const DISCOVERY_FETCHING: f64 = 10.0;
const DISCOVERY_ANALYZING: f64 = 30.0;
const DISCOVERY_ASKING: f64 = 50.0;
const DISCOVERY_ORGANIZING: f64 = 80.0;

/// Characters of landing-page text handed to topic discovery
const DISCOVERY_PREVIEW_CHARS: usize = 5_000;

/// Pages collected by a run plus the number of URLs it dequeued
struct RunOutcome {
    pages: Vec<ScrapedPage>,
    visited: usize,
}

/// A planned page with the batch it came from
struct PlannedPage {
    url: Url,
    category: String,
    priority: PlanPriority,
}

#[derive(Clone)]
pub struct CrawlEngine {
    fetcher: Arc<dyn Fetcher>,
    caller: Arc<ResilientCaller>,
    tasks: TaskStore,
    persister: Arc<dyn PagePersister>,
    planner: Arc<DocPlanner>,
    config: CrawlerConfig,
}

impl CrawlEngine {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        caller: Arc<ResilientCaller>,
        tasks: TaskStore,
        persister: Arc<dyn PagePersister>,
        planner: Arc<DocPlanner>,
        config: CrawlerConfig,
    ) -> Self {
        Self {
            fetcher,
            caller,
            tasks,
            persister,
            planner,
            config,
        }
    }

    /// Runs a crawl for an existing task until it reaches a terminal status
    pub async fn run(&self, task_id: &str, seed_url: &str, framework: &str, mode: &CrawlMode) {
        tracing::info!(
            "Starting {} crawl of {} for {} (task {})",
            mode,
            seed_url,
            framework,
            task_id
        );

        if let Err(e) = self.tasks.update(
            task_id,
            TaskUpdate::new()
                .status(TaskStatus::InProgress)
                .message(format!("Starting crawl of {}", seed_url)),
        ) {
            tracing::error!("Cannot start task {}: {}", task_id, e);
            return;
        }

        let outcome = match self.execute(task_id, seed_url, framework, mode).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Crawl for task {} failed: {}", task_id, e);
                self.report(task_id, TaskUpdate::failed(e.to_string()));
                return;
            }
        };

        if outcome.pages.is_empty() {
            let error = HarvestError::NoPagesScraped {
                seed: seed_url.to_string(),
            };
            tracing::error!("Crawl for task {} failed: {}", task_id, error);
            self.report(task_id, TaskUpdate::failed(error.to_string()));
            return;
        }

        if let Err(e) = self.persister.persist(framework, &outcome.pages).await {
            tracing::warn!("Failed to persist pages for task {}: {}", task_id, e);
        }

        tracing::info!(
            "Crawl for task {} complete: {} pages scraped, {} visited",
            task_id,
            outcome.pages.len(),
            outcome.visited
        );
        self.report(
            task_id,
            TaskUpdate::completed(format!(
                "Completed: scraped {} pages for {}",
                outcome.pages.len(),
                framework
            ))
            .pages(outcome.visited, outcome.visited),
        );
    }

    /// Lists the topics linked from the navigation of `seed_url`
    ///
    /// With a `task_id`, progress goes to that task (10, 30, 50, 80, then
    /// completion) and a failure ends it in `error`. The task must exist.
    pub async fn discover_topics(
        &self,
        task_id: Option<&str>,
        seed_url: &str,
        framework: &str,
    ) -> Result<TopicDiscovery, HarvestError> {
        tracing::info!("Discovering topics for {} from {}", framework, seed_url);

        match self.find_topics(task_id, seed_url, framework).await {
            Ok(discovery) => {
                let summary = format!(
                    "Discovered {} topics in {} categories",
                    discovery.topics.len(),
                    discovery.categories.len()
                );
                tracing::info!("{} for {}", summary, framework);
                if let Some(task_id) = task_id {
                    self.report(task_id, TaskUpdate::completed(summary));
                }
                Ok(discovery)
            }
            Err(e) => {
                tracing::error!("Topic discovery for {} failed: {}", seed_url, e);
                if let Some(task_id) = task_id {
                    self.report(task_id, TaskUpdate::failed(e.to_string()));
                }
                Err(e)
            }
        }
    }

    async fn find_topics(
        &self,
        task_id: Option<&str>,
        seed_url: &str,
        framework: &str,
    ) -> Result<TopicDiscovery, HarvestError> {
        let checkpoint = |progress: f64, message: &str| {
            if let Some(task_id) = task_id {
                self.report(
                    task_id,
                    TaskUpdate::new()
                        .status(TaskStatus::InProgress)
                        .progress(progress)
                        .message(message),
                );
            }
        };

        let seed = normalize_url(seed_url)?;
        let seed_host = extract_domain(&seed)
            .ok_or_else(|| HarvestError::Validation(format!("seed URL has no host: {}", seed)))?;

        checkpoint(DISCOVERY_FETCHING, "Fetching documentation page...");
        let page = self.fetch(&seed).await?;

        checkpoint(DISCOVERY_ANALYZING, "Analyzing page structure...");
        let links: Vec<_> = extract_navigation_entries(&page.body, &page.final_url)
            .into_iter()
            .filter(|link| {
                extract_domain(&link.url).is_some_and(|host| is_same_site(&seed_host, &host))
            })
            .collect();
        let preview = parse_page(&page.body, &page.final_url, DISCOVERY_PREVIEW_CHARS).content;
        tracing::debug!("{} navigation links on {}", links.len(), page.final_url);

        checkpoint(DISCOVERY_ASKING, "Using AI to discover topics...");
        let discovery = self
            .planner
            .discover_topics(framework, &links, &preview)
            .await;

        checkpoint(DISCOVERY_ORGANIZING, "Organizing topics by category...");
        Ok(discovery)
    }

    async fn execute(
        &self,
        task_id: &str,
        seed_url: &str,
        framework: &str,
        mode: &CrawlMode,
    ) -> Result<RunOutcome, HarvestError> {
        let seed = normalize_url(seed_url)?;
        let seed_host = extract_domain(&seed)
            .ok_or_else(|| HarvestError::Validation(format!("seed URL has no host: {}", seed)))?;

        match mode {
            CrawlMode::Basic => Ok(self.crawl_basic(task_id, seed, &seed_host).await),
            CrawlMode::Intelligent { topic } => {
                let topic = topic.as_deref().unwrap_or(framework);
                Ok(self
                    .crawl_intelligent(task_id, seed, &seed_host, framework, topic)
                    .await)
            }
        }
    }

    /// Breadth-first crawl from `seed` bounded by the page budget
    async fn crawl_basic(&self, task_id: &str, seed: Url, seed_host: &str) -> RunOutcome {
        let max_pages = self.config.max_pages;
        let mut frontier = Frontier::seeded(seed, max_pages);
        let mut pages = Vec::new();

        while let Some(url) = frontier.next_url() {
            tracing::debug!("Processing URL: {}", url);

            match self.fetch(&url).await {
                Ok(fetched) if !frontier.resolve_redirect(&url, &fetched.final_url) => {
                    tracing::debug!(
                        "{} redirected to {}, which was already scraped",
                        url,
                        fetched.final_url
                    );
                }
                Ok(fetched) => {
                    let page = self.scrape(&fetched, None, None);
                    let mut enqueued = 0;
                    for link in &page.links {
                        if let Ok(link) = Url::parse(link) {
                            if should_follow(seed_host, &link) && frontier.push(link) {
                                enqueued += 1;
                            }
                        }
                    }
                    tracing::debug!("{} new links queued from {}", enqueued, url);
                    pages.push(page);
                }
                Err(e) => tracing::warn!("Failed to scrape {}: {}", url, e),
            }

            let visited = frontier.visited();
            let progress = (visited as f64 / max_pages as f64 * 100.0).min(PROGRESS_CEILING);
            self.report(
                task_id,
                TaskUpdate::new()
                    .progress(progress)
                    .message(format!("Scraped {} pages...", visited))
                    .pages(visited, frontier.estimated_total()),
            );

            if frontier.queued() > 0 && visited < max_pages {
                tokio::time::sleep(self.config.rate_limit()).await;
            }
        }

        RunOutcome {
            pages,
            visited: frontier.visited(),
        }
    }

    /// Navigation discovery, planning, then plan execution
    async fn crawl_intelligent(
        &self,
        task_id: &str,
        seed: Url,
        seed_host: &str,
        framework: &str,
        topic: &str,
    ) -> RunOutcome {
        self.report(
            task_id,
            TaskUpdate::new()
                .progress(PROGRESS_DISCOVERY)
                .message("Discovering related topics..."),
        );

        let seed_page = match self.fetch(&seed).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!("Failed to fetch seed page {}: {}", seed, e);
                return RunOutcome {
                    pages: Vec::new(),
                    visited: 1,
                };
            }
        };

        let navigation: Vec<Url> =
            extract_navigation_links(&seed_page.body, &seed_page.final_url)
                .into_iter()
                .filter(|link| {
                    extract_domain(link).is_some_and(|host| is_same_site(seed_host, &host))
                })
                .collect();

        if navigation.is_empty() {
            tracing::info!(
                "No navigation links found on {}, falling back to basic crawl",
                seed
            );
            return self.crawl_basic(task_id, seed, seed_host).await;
        }
        tracing::info!("Discovered {} navigation links on {}", navigation.len(), seed);

        self.report(
            task_id,
            TaskUpdate::new()
                .progress(PROGRESS_PLANNING)
                .message(format!("Creating crawl plan for {}...", topic)),
        );
        let plans = self.planner.plan_crawl(framework, topic, &navigation).await;
        let targets = self.planned_pages(plans);

        let total = targets.len();
        self.report(
            task_id,
            TaskUpdate::new()
                .progress(PROGRESS_EXECUTION)
                .message(format!("Scraping {} pages about {}...", total, topic))
                .pages(0, total),
        );

        let mut pages = Vec::new();
        let mut scraped = HashSet::new();
        for (index, target) in targets.into_iter().enumerate() {
            tracing::debug!("Processing planned URL: {}", target.url);

            match self.fetch(&target.url).await {
                Ok(fetched) if !scraped.insert(page_key(&fetched.final_url)) => {
                    tracing::debug!(
                        "{} redirected to {}, which was already scraped",
                        target.url,
                        fetched.final_url
                    );
                }
                Ok(fetched) => {
                    let mut page =
                        self.scrape(&fetched, Some(target.category), Some(target.priority));
                    let enhancement = self
                        .planner
                        .enhance(framework, &page.title, &page.content, page.code_blocks.len())
                        .await;
                    page.summary = Some(enhancement.summary);
                    page.key_points = enhancement.key_points;
                    pages.push(page);
                }
                Err(e) => tracing::warn!("Failed to scrape {}: {}", target.url, e),
            }

            let processed = index + 1;
            let progress = (PROGRESS_EXECUTION
                + processed as f64 / total as f64 * PROGRESS_EXECUTION_SPAN)
                .min(PROGRESS_CEILING);
            self.report(
                task_id,
                TaskUpdate::new()
                    .progress(progress)
                    .message(format!("Scraped {}/{} pages...", processed, total))
                    .pages(processed, total),
            );

            if processed < total {
                tokio::time::sleep(self.config.rate_limit()).await;
            }
        }

        RunOutcome {
            pages,
            visited: total,
        }
    }

    /// Flattens plans into visit order: descending priority, stable, deduplicated
    fn planned_pages(&self, mut plans: Vec<CrawlPlan>) -> Vec<PlannedPage> {
        plans.sort_by(|a, b| b.priority.rank().cmp(&a.priority.rank()));

        let mut seen = HashSet::new();
        let mut targets = Vec::new();
        for plan in plans {
            for url in plan.urls {
                if seen.insert(page_key(&url)) {
                    targets.push(PlannedPage {
                        url,
                        category: plan.category.clone(),
                        priority: plan.priority,
                    });
                }
            }
        }

        targets.truncate(self.config.max_pages);
        targets
    }

    async fn fetch(&self, url: &Url) -> Result<FetchedPage, CallError> {
        let fetcher = &self.fetcher;
        self.caller
            .call(CallClass::Fetch, || fetcher.fetch_page(url))
            .await
    }

    fn scrape(
        &self,
        fetched: &FetchedPage,
        category: Option<String>,
        priority: Option<PlanPriority>,
    ) -> ScrapedPage {
        let parsed = parse_page(&fetched.body, &fetched.final_url, self.config.content_limit);

        ScrapedPage {
            url: fetched.final_url.to_string(),
            title: parsed.title,
            content: parsed.content,
            links: parsed.links.into_iter().map(String::from).collect(),
            headings: parsed.headings,
            code_blocks: parsed.code_blocks,
            scraped_at: Utc::now(),
            category,
            priority,
            summary: None,
            key_points: Vec::new(),
        }
    }

    fn report(&self, task_id: &str, update: TaskUpdate) {
        if let Err(e) = self.tasks.update(task_id, update) {
            tracing::warn!("Dropped progress update for task {}: {}", task_id, e);
        }
    }
}
