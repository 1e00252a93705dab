//! Documentation lookup strategies

use crate::crawler::Fetcher;
use crate::resilience::{CallError, CallOptions, ResilientCaller};

/// Official documentation entry points, keyed by letters-only lowercase name
const OFFICIAL_SITES: &[(&str, &str)] = &[
    ("react", "https://react.dev/"),
    ("vue", "https://vuejs.org/"),
    ("angular", "https://angular.io/docs"),
    ("svelte", "https://svelte.dev/docs"),
    ("nextjs", "https://nextjs.org/docs"),
    ("express", "https://expressjs.com/"),
    ("django", "https://docs.djangoproject.com/"),
    ("flask", "https://flask.palletsprojects.com/"),
    ("fastapi", "https://fastapi.tiangolo.com/"),
    ("nodejs", "https://nodejs.org/docs/"),
    ("typescript", "https://www.typescriptlang.org/docs/"),
    ("tailwind", "https://tailwindcss.com/docs"),
    ("bootstrap", "https://getbootstrap.com/docs/"),
];

/// A located documentation site
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyMatch {
    pub url: String,
    pub name: String,
}

/// Why a strategy came back empty-handed
#[derive(Debug, Clone, thiserror::Error)]
pub enum StrategyError {
    #[error("{0}")]
    NotFound(String),

    #[error("{source_name} lookup failed: {error}")]
    Probe {
        source_name: &'static str,
        error: CallError,
    },
}

/// One independent way of locating a framework's documentation
#[derive(Debug, Clone, PartialEq)]
pub enum SearchStrategy {
    /// Built-in catalog; never touches the network
    OfficialSites,

    /// HEAD probe of `{base_url}/{framework}/`
    DevDocs { base_url: String },

    /// HEAD probe of `template` with `{framework}` substituted
    ReadTheDocs { template: String },
}

impl SearchStrategy {
    pub fn source(&self) -> &'static str {
        match self {
            Self::OfficialSites => "official",
            Self::DevDocs { .. } => "devdocs",
            Self::ReadTheDocs { .. } => "readthedocs",
        }
    }

    /// Higher wins when ranking results
    pub fn priority(&self) -> u8 {
        match self {
            Self::OfficialSites => 3,
            Self::DevDocs { .. } => 2,
            Self::ReadTheDocs { .. } => 1,
        }
    }

    pub fn confidence(&self) -> f64 {
        match self {
            Self::OfficialSites => 1.0,
            Self::DevDocs { .. } => 0.9,
            Self::ReadTheDocs { .. } => 0.8,
        }
    }

    /// Looks up `framework`, probing through `caller` with `options`
    pub async fn search(
        &self,
        framework: &str,
        fetcher: &dyn Fetcher,
        caller: &ResilientCaller,
        options: &CallOptions,
    ) -> Result<StrategyMatch, StrategyError> {
        match self {
            Self::OfficialSites => {
                let key = catalog_key(framework);
                OFFICIAL_SITES
                    .iter()
                    .find(|(name, _)| *name == key)
                    .map(|(_, url)| StrategyMatch {
                        url: url.to_string(),
                        name: format!("{} Official Documentation", framework),
                    })
                    .ok_or_else(|| {
                        StrategyError::NotFound("No official documentation found".to_string())
                    })
            }
            Self::DevDocs { base_url } => {
                let url = format!(
                    "{}/{}/",
                    base_url.trim_end_matches('/'),
                    framework.to_lowercase()
                );
                self.probe(&url, fetcher, caller, options).await?;
                Ok(StrategyMatch {
                    url,
                    name: format!("{} - DevDocs", framework),
                })
            }
            Self::ReadTheDocs { template } => {
                let url = template.replace("{framework}", &framework.to_lowercase());
                self.probe(&url, fetcher, caller, options).await?;
                Ok(StrategyMatch {
                    url,
                    name: format!("{} - Read the Docs", framework),
                })
            }
        }
    }

    async fn probe(
        &self,
        url: &str,
        fetcher: &dyn Fetcher,
        caller: &ResilientCaller,
        options: &CallOptions,
    ) -> Result<(), StrategyError> {
        caller
            .call_with(options, || fetcher.probe(url))
            .await
            .map_err(|error| {
                if matches!(error.root(), CallError::Rejected(_)) {
                    StrategyError::NotFound(format!("Not found on {}", self.display_name()))
                } else {
                    StrategyError::Probe {
                        source_name: self.display_name(),
                        error,
                    }
                }
            })
    }

    fn display_name(&self) -> &'static str {
        match self {
            Self::OfficialSites => "Official Sites",
            Self::DevDocs { .. } => "DevDocs",
            Self::ReadTheDocs { .. } => "ReadTheDocs",
        }
    }
}

/// `"Next.js"` -> `"nextjs"`
fn catalog_key(framework: &str) -> String {
    framework
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_key() {
        assert_eq!(catalog_key("Next.js"), "nextjs");
        assert_eq!(catalog_key("Node.JS"), "nodejs");
        assert_eq!(catalog_key("Tailwind CSS 3"), "tailwindcss");
    }

    #[test]
    fn test_priorities_and_confidence() {
        let devdocs = SearchStrategy::DevDocs {
            base_url: "https://devdocs.io".to_string(),
        };
        let rtd = SearchStrategy::ReadTheDocs {
            template: "https://{framework}.readthedocs.io/".to_string(),
        };

        assert!(SearchStrategy::OfficialSites.priority() > devdocs.priority());
        assert!(devdocs.priority() > rtd.priority());
        assert_eq!(SearchStrategy::OfficialSites.confidence(), 1.0);
        assert_eq!(devdocs.confidence(), 0.9);
        assert_eq!(rtd.confidence(), 0.8);
    }
}
