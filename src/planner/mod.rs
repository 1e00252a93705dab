//! AI-assisted documentation ranking and crawl planning
//!
//! The planner consults a [`CompletionClient`] through the
//! [`ResilientCaller`] (completion class, so behind the circuit breaker).
//! Every operation degrades to a deterministic fallback when the service is
//! unavailable or answers with something that does not decode.

mod client;

pub use client::{ChatCompletionClient, CompletionClient};

use crate::crawler::NavigationLink;
use crate::resilience::{CallClass, CallError, ResilientCaller};
use crate::search::SearchHit;
use crate::url::normalize_url;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

/// Confidence assumed for a candidate that carries none
const DEFAULT_CANDIDATE_CONFIDENCE: f64 = 0.8;

/// Confidence assumed for a suggestion that carries none
const DEFAULT_SUGGESTION_CONFIDENCE: f64 = 0.7;

/// Ceiling on confidence when the completion service could not be consulted
const FALLBACK_CONFIDENCE_CAP: f64 = 0.5;

/// Number of candidates in the fallback crawl plan
const FALLBACK_PLAN_SIZE: usize = 10;

/// Number of navigation links turned into topics when discovery falls back
const FALLBACK_TOPIC_COUNT: usize = 20;

/// Characters of page text shown to the completion service
const TOPIC_PREVIEW_CHARS: usize = 2_000;
const ENHANCE_PREVIEW_CHARS: usize = 3_000;

/// Reasons a completion answer could not be used
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("completion service call failed: {0}")]
    Call(#[from] CallError),

    #[error("malformed completion answer: {0}")]
    Malformed(String),
}

/// Result of looking up a framework's documentation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum DocumentationLookup {
    Found {
        framework: String,
        official_docs: String,
        confidence: f64,
        alternatives: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        corrected_name: Option<String>,
        /// True when the answer was chosen without the completion service
        fallback: bool,
    },
    NotFound {
        framework: String,
        error: String,
        suggestions: Vec<String>,
    },
}

/// Relative importance of a crawl batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanPriority {
    High,
    Medium,
    Low,
}

impl PlanPriority {
    /// Higher is visited first
    pub fn rank(self) -> u8 {
        match self {
            Self::High => 3,
            Self::Medium => 2,
            Self::Low => 1,
        }
    }
}

/// A batch of URLs to crawl under one category
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlPlan {
    pub urls: Vec<Url>,
    pub priority: PlanPriority,
    pub category: String,
}

/// A documentation topic found on a site's landing page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Topic {
    pub name: String,
    pub url: String,
    pub description: String,
    pub importance: PlanPriority,
    pub category: String,
}

/// Topics plus their distinct categories in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TopicDiscovery {
    pub topics: Vec<Topic>,
    pub categories: Vec<String>,
}

impl TopicDiscovery {
    pub fn from_topics(topics: Vec<Topic>) -> Self {
        let mut categories: Vec<String> = Vec::new();
        for topic in &topics {
            if !categories.contains(&topic.category) {
                categories.push(topic.category.clone());
            }
        }
        Self { topics, categories }
    }
}

/// Summary and key points for one scraped page
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Enhancement {
    pub summary: String,
    pub key_points: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Suggestion {
    url: String,
    #[serde(default)]
    corrected_name: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PlanEntry {
    urls: Vec<String>,
    priority: PlanPriority,
    #[serde(default = "general_category")]
    category: String,
}

fn general_category() -> String {
    "General".to_string()
}

fn medium_priority() -> PlanPriority {
    PlanPriority::Medium
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TopicEntry {
    #[serde(default)]
    name: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    description: String,
    #[serde(default = "medium_priority")]
    importance: PlanPriority,
    #[serde(default = "general_category")]
    category: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EnhancementReply {
    summary: String,
    #[serde(default, alias = "keyPoints")]
    keypoints: Vec<String>,
}

pub struct DocPlanner {
    client: Arc<dyn CompletionClient>,
    caller: Arc<ResilientCaller>,
}

impl DocPlanner {
    pub fn new(client: Arc<dyn CompletionClient>, caller: Arc<ResilientCaller>) -> Self {
        Self { client, caller }
    }

    async fn ask(&self, prompt: &str) -> Result<String, CallError> {
        let client = &self.client;
        self.caller
            .call(CallClass::Completion, || client.complete(prompt))
            .await
    }

    /// Picks the official documentation among URL-bearing search hits
    ///
    /// Hits without a URL are ignored; with none left this is [`suggest`].
    ///
    /// [`suggest`]: DocPlanner::suggest
    pub async fn select(&self, framework: &str, hits: &[SearchHit]) -> DocumentationLookup {
        let candidates: Vec<(&str, &SearchHit)> = hits
            .iter()
            .filter_map(|hit| hit.url.as_deref().map(|url| (url, hit)))
            .collect();

        let Some(&(first_url, first_hit)) = candidates.first() else {
            return self.suggest(framework).await;
        };

        let listing = candidates
            .iter()
            .map(|(url, hit)| format!("- {} ({})", url, hit.name.as_deref().unwrap_or(&hit.source)))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!(
            "Given these documentation URLs for \"{framework}\":\n{listing}\n\n\
             Which one is most likely the official documentation? Consider:\n\
             1. Official domain names\n\
             2. Documentation structure\n\
             3. Reliability\n\n\
             Respond with just the URL of the best option."
        );

        let (chosen_url, chosen_hit, fallback) = match self.ask(&prompt).await {
            Ok(reply) => {
                let answer = clean_reply(&reply);
                match candidates.iter().find(|(url, _)| *url == answer) {
                    Some(&(url, hit)) => (url, hit, false),
                    None => {
                        tracing::debug!(
                            "Completion answer '{}' is not a candidate, using {}",
                            answer,
                            first_url
                        );
                        (first_url, first_hit, false)
                    }
                }
            }
            Err(e) => {
                tracing::warn!(
                    "Documentation ranking unavailable for {}, using first candidate: {}",
                    framework,
                    e
                );
                (first_url, first_hit, true)
            }
        };

        let mut confidence = chosen_hit
            .confidence
            .unwrap_or(DEFAULT_CANDIDATE_CONFIDENCE);
        if fallback {
            confidence = confidence.min(FALLBACK_CONFIDENCE_CAP);
        }

        DocumentationLookup::Found {
            framework: framework.to_string(),
            official_docs: chosen_url.to_string(),
            confidence,
            alternatives: candidates
                .iter()
                .filter(|(url, _)| *url != chosen_url)
                .map(|(url, _)| url.to_string())
                .collect(),
            corrected_name: None,
            fallback,
        }
    }

    /// Asks the completion service to name the documentation site outright
    pub async fn suggest(&self, framework: &str) -> DocumentationLookup {
        let prompt = format!(
            "What is the official documentation URL for \"{framework}\"?\n\
             Consider common misspellings and variations.\n\
             If you're not sure, suggest the most likely official documentation URL.\n\
             Respond with only a JSON object containing:\n\
             - url: the documentation URL\n\
             - corrected_name: the correct framework name if different\n\
             - confidence: a number between 0 and 1"
        );

        let outcome = match self.ask(&prompt).await {
            Ok(reply) => parse_suggestion(&reply),
            Err(e) => Err(PlanError::from(e)),
        };

        match outcome {
            Ok(suggestion) => DocumentationLookup::Found {
                framework: framework.to_string(),
                official_docs: suggestion.url,
                confidence: suggestion
                    .confidence
                    .unwrap_or(DEFAULT_SUGGESTION_CONFIDENCE),
                alternatives: Vec::new(),
                corrected_name: suggestion.corrected_name,
                fallback: false,
            },
            Err(e) => {
                tracing::warn!("No documentation suggestion for {}: {}", framework, e);
                DocumentationLookup::NotFound {
                    framework: framework.to_string(),
                    error: "Could not determine documentation URL".to_string(),
                    suggestions: name_variations(framework),
                }
            }
        }
    }

    /// Builds a prioritized crawl plan focused on `topic` from `candidates`
    ///
    /// Only candidate URLs survive into the plan. An empty or failed plan
    /// falls back to the first ten candidates as a single high-priority batch.
    pub async fn plan_crawl(
        &self,
        framework: &str,
        topic: &str,
        candidates: &[Url],
    ) -> Vec<CrawlPlan> {
        if candidates.is_empty() {
            return Vec::new();
        }

        let listing = candidates
            .iter()
            .map(|url| format!("- {}", url))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!(
            "Given these documentation pages for {framework}:\n{listing}\n\n\
             Create a prioritized scraping plan focusing on \"{topic}\".\n\
             Return a JSON array of scraping plans with this structure:\n\
             [\n  {{\n    \"urls\": [\"url1\", \"url2\"],\n    \
             \"priority\": \"high|medium|low\",\n    \
             \"category\": \"category name\"\n  }}\n]\n\n\
             Prioritize:\n\
             1. Topics directly related to \"{topic}\"\n\
             2. Core concepts and fundamentals\n\
             3. Getting started guides\n\
             4. API references related to the topic\n\n\
             Return only the JSON array."
        );

        let outcome = match self.ask(&prompt).await {
            Ok(reply) => parse_plan(&reply, candidates),
            Err(e) => Err(PlanError::from(e)),
        };

        match outcome {
            Ok(plans) if !plans.is_empty() => {
                tracing::info!("Crawl plan for {} has {} batches", topic, plans.len());
                plans
            }
            Ok(_) => {
                tracing::warn!("Crawl plan for {} named no known pages, using fallback", topic);
                fallback_plan(candidates)
            }
            Err(e) => {
                tracing::warn!("Crawl planning failed for {}, using fallback: {}", topic, e);
                fallback_plan(candidates)
            }
        }
    }

    /// Lists the topics a documentation landing page links to
    ///
    /// Links without text are ignored. Without any left there is nothing to
    /// discover and the service is not consulted. A failed or empty answer
    /// falls back to the first twenty links, categorized by keyword.
    pub async fn discover_topics(
        &self,
        framework: &str,
        links: &[NavigationLink],
        preview: &str,
    ) -> TopicDiscovery {
        let links: Vec<&NavigationLink> = links.iter().filter(|l| !l.text.is_empty()).collect();
        if links.is_empty() {
            return TopicDiscovery::default();
        }

        let listing = links
            .iter()
            .map(|link| format!("- {}: {}", link.text, link.url))
            .collect::<Vec<_>>()
            .join("\n");
        let preview: String = preview.chars().take(TOPIC_PREVIEW_CHARS).collect();
        let prompt = format!(
            "Analyze this {framework} documentation and identify the main topics \
             that developers need to learn.\n\n\
             Navigation Links:\n{listing}\n\n\
             Page Content Preview:\n{preview}\n\n\
             Return the most important topics as a JSON array with this structure:\n\
             [\n  {{\n    \"name\": \"Topic Name\",\n    \
             \"url\": \"documentation URL\",\n    \
             \"description\": \"What this topic covers\",\n    \
             \"importance\": \"high|medium|low\",\n    \
             \"category\": \"Getting Started, Core Concepts, API Reference, ...\"\n  }}\n]\n\n\
             Return only the JSON array."
        );

        let outcome = match self.ask(&prompt).await {
            Ok(reply) => parse_topics(&reply),
            Err(e) => Err(PlanError::from(e)),
        };

        let topics = match outcome {
            Ok(topics) if !topics.is_empty() => topics,
            Ok(_) => {
                tracing::warn!("Topic discovery for {} named no topics, using links", framework);
                fallback_topics(&links)
            }
            Err(e) => {
                tracing::warn!("Topic discovery for {} failed, using links: {}", framework, e);
                fallback_topics(&links)
            }
        };

        TopicDiscovery::from_topics(topics)
    }

    /// Summarizes a scraped page and lists its key points
    ///
    /// Falls back to the title as summary, with no key points.
    pub async fn enhance(
        &self,
        framework: &str,
        title: &str,
        content: &str,
        code_blocks: usize,
    ) -> Enhancement {
        let preview: String = content.chars().take(ENHANCE_PREVIEW_CHARS).collect();
        let prompt = format!(
            "Analyze this {framework} documentation content:\n\n\
             Title: {title}\n\
             Content: {preview}\n\
             Code blocks: {code_blocks} found\n\n\
             Provide a concise summary (2-3 sentences) and the key points \
             (main concepts) as JSON:\n\
             {{\n  \"summary\": \"Brief summary\",\n  \
             \"keypoints\": [\"point 1\", \"point 2\"]\n}}"
        );

        let outcome = match self.ask(&prompt).await {
            Ok(reply) => parse_enhancement(&reply),
            Err(e) => Err(PlanError::from(e)),
        };

        match outcome {
            Ok(enhancement) => enhancement,
            Err(e) => {
                tracing::debug!("No enhancement for '{}': {}", title, e);
                Enhancement {
                    summary: title.to_string(),
                    key_points: Vec::new(),
                }
            }
        }
    }
}

/// Strips whitespace plus surrounding quotes, backticks and angle brackets
fn clean_reply(reply: &str) -> &str {
    reply
        .trim()
        .trim_matches(|c| matches!(c, '"' | '\'' | '`' | '<' | '>'))
        .trim()
}

/// Removes an optional Markdown code fence around a JSON answer
fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop the info string ("json") on the opening line
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().trim_end_matches("```").trim()
}

fn parse_suggestion(reply: &str) -> Result<Suggestion, PlanError> {
    let suggestion: Suggestion = serde_json::from_str(strip_code_fence(reply))
        .map_err(|e| PlanError::Malformed(e.to_string()))?;

    let url = Url::parse(&suggestion.url)
        .map_err(|e| PlanError::Malformed(format!("invalid url '{}': {}", suggestion.url, e)))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(PlanError::Malformed(format!(
            "url must be http(s), got '{}'",
            suggestion.url
        )));
    }

    if let Some(confidence) = suggestion.confidence {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(PlanError::Malformed(format!(
                "confidence {} outside [0, 1]",
                confidence
            )));
        }
    }

    Ok(suggestion)
}

fn parse_plan(reply: &str, candidates: &[Url]) -> Result<Vec<CrawlPlan>, PlanError> {
    let entries: Vec<PlanEntry> = serde_json::from_str(strip_code_fence(reply))
        .map_err(|e| PlanError::Malformed(e.to_string()))?;

    let known: HashMap<String, &Url> = candidates
        .iter()
        .map(|url| (plan_key(url.as_str()), url))
        .collect();

    let plans = entries
        .into_iter()
        .filter_map(|entry| {
            let urls: Vec<Url> = entry
                .urls
                .iter()
                .filter_map(|raw| known.get(&plan_key(raw)).map(|url| (*url).clone()))
                .collect();
            if urls.is_empty() {
                return None;
            }
            Some(CrawlPlan {
                urls,
                priority: entry.priority,
                category: entry.category,
            })
        })
        .collect();

    Ok(plans)
}

/// Decodes a topic array, dropping entries without a name or an http(s) URL
fn parse_topics(reply: &str) -> Result<Vec<Topic>, PlanError> {
    let entries: Vec<TopicEntry> = serde_json::from_str(strip_code_fence(reply))
        .map_err(|e| PlanError::Malformed(e.to_string()))?;

    let topics = entries
        .into_iter()
        .filter(|entry| !entry.name.trim().is_empty())
        .filter(|entry| {
            Url::parse(&entry.url).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
        })
        .map(|entry| Topic {
            name: entry.name.trim().to_string(),
            url: entry.url,
            description: entry.description,
            importance: entry.importance,
            category: entry.category,
        })
        .collect();

    Ok(topics)
}

fn parse_enhancement(reply: &str) -> Result<Enhancement, PlanError> {
    let reply: EnhancementReply = serde_json::from_str(strip_code_fence(reply))
        .map_err(|e| PlanError::Malformed(e.to_string()))?;

    if reply.summary.trim().is_empty() {
        return Err(PlanError::Malformed("empty summary".to_string()));
    }

    Ok(Enhancement {
        summary: reply.summary.trim().to_string(),
        key_points: reply.keypoints,
    })
}

fn fallback_topics(links: &[&NavigationLink]) -> Vec<Topic> {
    links
        .iter()
        .take(FALLBACK_TOPIC_COUNT)
        .map(|link| Topic {
            name: link.text.clone(),
            url: link.url.to_string(),
            description: format!("Documentation for {}", link.text),
            importance: PlanPriority::Medium,
            category: guess_category(&link.text).to_string(),
        })
        .collect()
}

/// Buckets a page by keywords in its link text
fn guess_category(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));

    if has(&["start", "introduction"]) {
        "Getting Started"
    } else if has(&["api", "reference"]) {
        "API Reference"
    } else if has(&["guide", "tutorial"]) {
        "Guides"
    } else if has(&["config", "setup"]) {
        "Configuration"
    } else if has(&["example", "demo"]) {
        "Examples"
    } else {
        "Documentation"
    }
}

fn plan_key(raw: &str) -> String {
    normalize_url(raw)
        .map(String::from)
        .unwrap_or_else(|_| raw.trim().to_string())
}

fn fallback_plan(candidates: &[Url]) -> Vec<CrawlPlan> {
    vec![CrawlPlan {
        urls: candidates.iter().take(FALLBACK_PLAN_SIZE).cloned().collect(),
        priority: PlanPriority::High,
        category: general_category(),
    }]
}

/// Well-known spellings of popular framework names, excluding the input itself
pub fn name_variations(framework: &str) -> Vec<String> {
    let lower = framework.to_lowercase();
    let mut variations: Vec<&str> = Vec::new();

    if lower.contains("react") {
        variations.extend(["React", "ReactJS", "React.js"]);
    }
    if lower.contains("vue") {
        variations.extend(["Vue", "VueJS", "Vue.js"]);
    }
    if lower.contains("angular") {
        variations.extend(["Angular", "AngularJS"]);
    }
    if lower.contains("next") {
        variations.extend(["Next.js", "NextJS"]);
    }

    variations
        .into_iter()
        .filter(|v| v.to_lowercase() != lower)
        .map(str::to_string)
        .collect()
}
