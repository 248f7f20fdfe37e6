//! Question catalogs
//!
//! A catalog is the ordered list of questions asked for one service category.
//! Catalogs are data, not code: the built-in set lives in `builtin.toml` and is
//! parsed by [`loader`], and operators may point the runtime at their own file.
//!
//! Resolution is total. An unknown service name degrades to the `default`
//! catalog, and an alias redirects exactly one level to a direct catalog.

pub mod loader;

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Service name of the catalog every unknown service falls back to.
pub const DEFAULT_SERVICE: &str = "default";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDefinition {
    pub key: String,
    /// Topic hints for free-text matching. Never used to drive the state machine.
    #[serde(default)]
    pub patterns: Vec<String>,
    pub phrasings: Vec<String>,
    #[serde(default)]
    pub suggestions: Option<Vec<String>>,
    #[serde(default)]
    pub multi_select: bool,
}

impl QuestionDefinition {
    pub fn new(key: impl Into<String>, phrasings: Vec<String>) -> Self {
        Self {
            key: key.into(),
            patterns: Vec::new(),
            phrasings,
            suggestions: None,
            multi_select: false,
        }
    }

    pub fn with_patterns(mut self, patterns: Vec<String>) -> Self {
        self.patterns = patterns;
        self
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>, multi_select: bool) -> Self {
        self.suggestions = Some(suggestions);
        self.multi_select = multi_select;
        self
    }

    /// Suggestion chips, treating an empty list the same as none.
    pub fn suggestion_chips(&self) -> Option<&[String]> {
        self.suggestions.as_deref().filter(|chips| !chips.is_empty())
    }

    /// Case-insensitive check for whether `text` touches this question's topic.
    pub fn mentions(&self, text: &str) -> bool {
        let normalized = text.to_lowercase();
        self.patterns.iter().any(|pattern| normalized.contains(&pattern.to_lowercase()))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Catalog {
    questions: Vec<QuestionDefinition>,
}

impl Catalog {
    /// Builds a catalog, enforcing that it is non-empty, keys are unique and
    /// every question has at least one phrasing.
    pub fn new(service: &str, questions: Vec<QuestionDefinition>) -> Result<Self, CatalogError> {
        if questions.is_empty() {
            return Err(CatalogError::EmptyCatalog { service: service.to_string() });
        }

        let mut seen = BTreeSet::new();
        for question in &questions {
            if !seen.insert(question.key.as_str()) {
                return Err(CatalogError::DuplicateKey {
                    service: service.to_string(),
                    key: question.key.clone(),
                });
            }
            if question.phrasings.is_empty() {
                return Err(CatalogError::MissingPhrasing {
                    service: service.to_string(),
                    key: question.key.clone(),
                });
            }
        }

        Ok(Self { questions })
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn question(&self, index: usize) -> Option<&QuestionDefinition> {
        self.questions.get(index)
    }

    pub fn questions(&self) -> &[QuestionDefinition] {
        &self.questions
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.questions.iter().map(|question| question.key.as_str())
    }

    pub fn position(&self, key: &str) -> Option<usize> {
        self.questions.iter().position(|question| question.key == key)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CatalogEntry {
    Direct(Arc<Catalog>),
    AliasOf(String),
}

/// Outcome of resolving a service name, kept for diagnostics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedCatalog {
    pub resolved_name: String,
    pub via_alias: bool,
    pub fell_back: bool,
    pub catalog: Arc<Catalog>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogRegistry {
    entries: BTreeMap<String, CatalogEntry>,
    default: Arc<Catalog>,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("could not read catalog file `{path}`: {source}")]
    ReadFile { path: String, source: std::io::Error },
    #[error("could not parse catalog source `{origin}`: {source}")]
    Parse { origin: String, source: toml::de::Error },
    #[error("catalog `{service}` has no questions")]
    EmptyCatalog { service: String },
    #[error("catalog `{service}` defines question key `{key}` more than once")]
    DuplicateKey { service: String, key: String },
    #[error("question `{key}` in catalog `{service}` has no phrasings")]
    MissingPhrasing { service: String, key: String },
    #[error("service `{0}` is defined more than once")]
    DuplicateService(String),
    #[error("no `default` catalog is defined")]
    MissingDefault,
    #[error("`default` must be a catalog, not an alias")]
    DefaultIsAlias,
    #[error("alias `{service}` points at unknown service `{target}`")]
    UnknownAliasTarget { service: String, target: String },
    #[error("alias `{service}` points at alias `{target}`; aliases resolve one level only")]
    AliasChain { service: String, target: String },
}

impl CatalogRegistry {
    /// Validates a full set of entries. Alias targets must be direct catalogs,
    /// which also rules out alias cycles.
    pub fn from_entries(entries: BTreeMap<String, CatalogEntry>) -> Result<Self, CatalogError> {
        let default = match entries.get(DEFAULT_SERVICE) {
            Some(CatalogEntry::Direct(catalog)) => Arc::clone(catalog),
            Some(CatalogEntry::AliasOf(_)) => return Err(CatalogError::DefaultIsAlias),
            None => return Err(CatalogError::MissingDefault),
        };

        for (service, entry) in &entries {
            let CatalogEntry::AliasOf(target) = entry else {
                continue;
            };
            match entries.get(target) {
                Some(CatalogEntry::Direct(_)) => {}
                Some(CatalogEntry::AliasOf(_)) => {
                    return Err(CatalogError::AliasChain {
                        service: service.clone(),
                        target: target.clone(),
                    });
                }
                None => {
                    return Err(CatalogError::UnknownAliasTarget {
                        service: service.clone(),
                        target: target.clone(),
                    });
                }
            }
        }

        Ok(Self { entries, default })
    }

    /// The catalogs shipped with the crate.
    pub fn builtin() -> Result<Self, CatalogError> {
        loader::from_toml_str(loader::BUILTIN_CATALOGS, "builtin")
    }

    pub fn from_toml_str(raw: &str, origin: &str) -> Result<Self, CatalogError> {
        loader::from_toml_str(raw, origin)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        loader::from_path(path)
    }

    pub fn default_catalog(&self) -> Arc<Catalog> {
        Arc::clone(&self.default)
    }

    pub fn entry(&self, service: &str) -> Option<&CatalogEntry> {
        self.entries.get(service)
    }

    /// Service names in sorted order, aliases included.
    pub fn services(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn resolve(&self, service: &str) -> Arc<Catalog> {
        self.resolve_name(service).catalog
    }

    pub fn resolve_name(&self, service: &str) -> ResolvedCatalog {
        match self.entries.get(service) {
            Some(CatalogEntry::Direct(catalog)) => ResolvedCatalog {
                resolved_name: service.to_string(),
                via_alias: false,
                fell_back: false,
                catalog: Arc::clone(catalog),
            },
            Some(CatalogEntry::AliasOf(target)) => match self.entries.get(target) {
                Some(CatalogEntry::Direct(catalog)) => {
                    debug!(
                        event_name = "catalog.alias_resolved",
                        service,
                        target = target.as_str(),
                        "service resolved through alias"
                    );
                    ResolvedCatalog {
                        resolved_name: target.clone(),
                        via_alias: true,
                        fell_back: false,
                        catalog: Arc::clone(catalog),
                    }
                }
                _ => self.fallback(service),
            },
            None => self.fallback(service),
        }
    }

    fn fallback(&self, service: &str) -> ResolvedCatalog {
        debug!(
            event_name = "catalog.fallback_default",
            service, "unknown service, using default catalog"
        );
        ResolvedCatalog {
            resolved_name: DEFAULT_SERVICE.to_string(),
            via_alias: false,
            fell_back: true,
            catalog: self.default_catalog(),
        }
    }
}
