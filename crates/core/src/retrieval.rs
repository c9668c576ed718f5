use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::domain::citation::Citation;

pub const DEFAULT_MAX_RESULTS: usize = 3;
pub const SNIPPET_CHARS: usize = 300;
const MIN_TERM_CHARS: usize = 3;
const METADATA_KEYS: [&str; 3] = ["plan_type", "state", "effective_date"];

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("failed to read policy corpus {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid policy document at {path}:{line}: {source}")]
    Parse {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// One line of the policy corpus (JSON Lines).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolicyDocument {
    pub doc_id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub plan_type: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub effective_date: Option<String>,
}

impl PolicyDocument {
    fn metadata_value(&self, key: &str) -> Option<&str> {
        match key {
            "plan_type" => self.plan_type.as_deref(),
            "state" => self.state.as_deref(),
            "effective_date" => self.effective_date.as_deref(),
            _ => None,
        }
    }

    fn to_citation(&self) -> Citation {
        let metadata: BTreeMap<String, Value> = METADATA_KEYS
            .iter()
            .map(|key| {
                let value = self.metadata_value(key).map_or(Value::Null, Value::from);
                ((*key).to_string(), value)
            })
            .collect();

        Citation {
            doc_id: self.doc_id.clone(),
            title: self.title.clone(),
            snippet: self.content.chars().take(SNIPPET_CHARS).collect(),
            url: self.url.clone(),
            metadata,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalFilters {
    #[serde(default)]
    pub plan_type: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

impl RetrievalFilters {
    fn admits(&self, document: &PolicyDocument) -> bool {
        let matches = |wanted: &Option<String>, actual: &Option<String>| match wanted {
            Some(wanted) => {
                actual.as_deref().is_some_and(|actual| actual.eq_ignore_ascii_case(wanted))
            }
            None => true,
        };
        matches(&self.plan_type, &document.plan_type) && matches(&self.state, &document.state)
    }
}

#[async_trait]
pub trait RetrievalService: Send + Sync {
    async fn search(
        &self,
        query: &str,
        filters: &RetrievalFilters,
    ) -> Result<Vec<Citation>, RetrievalError>;

    fn document_count(&self) -> usize;
}

/// In-process corpus scanned on every search. Ranking is corpus order.
#[derive(Clone, Debug)]
pub struct LocalCorpus {
    documents: Vec<PolicyDocument>,
    max_results: usize,
}

impl LocalCorpus {
    pub fn load(path: impl AsRef<Path>, max_results: usize) -> Result<Self, RetrievalError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|source| RetrievalError::Io { path: path.to_path_buf(), source })?;

        let mut documents = Vec::new();
        for (index, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let document = serde_json::from_str(line).map_err(|source| RetrievalError::Parse {
                path: path.to_path_buf(),
                line: index + 1,
                source,
            })?;
            documents.push(document);
        }

        Ok(Self::from_documents(documents, max_results))
    }

    pub fn from_documents(documents: Vec<PolicyDocument>, max_results: usize) -> Self {
        Self { documents, max_results: max_results.clamp(1, DEFAULT_MAX_RESULTS) }
    }

    pub fn documents(&self) -> &[PolicyDocument] {
        &self.documents
    }

    fn matching<F>(&self, filters: &RetrievalFilters, predicate: F) -> Vec<Citation>
    where
        F: Fn(&str) -> bool,
    {
        self.documents
            .iter()
            .filter(|document| filters.admits(document))
            .filter(|document| predicate(&document.content.to_lowercase()))
            .take(self.max_results)
            .map(PolicyDocument::to_citation)
            .collect()
    }

    pub fn search_sync(&self, query: &str, filters: &RetrievalFilters) -> Vec<Citation> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        let phrase_hits = self.matching(filters, |content| content.contains(&needle));
        if !phrase_hits.is_empty() {
            return phrase_hits;
        }

        let terms: Vec<String> = needle
            .split(|ch: char| !ch.is_alphanumeric())
            .filter(|term| term.chars().count() >= MIN_TERM_CHARS)
            .map(str::to_string)
            .collect();
        if terms.is_empty() {
            return Vec::new();
        }

        self.matching(filters, |content| terms.iter().all(|term| content.contains(term.as_str())))
    }
}

#[async_trait]
impl RetrievalService for LocalCorpus {
    async fn search(
        &self,
        query: &str,
        filters: &RetrievalFilters,
    ) -> Result<Vec<Citation>, RetrievalError> {
        Ok(self.search_sync(query, filters))
    }

    fn document_count(&self) -> usize {
        self.documents.len()
    }
}
