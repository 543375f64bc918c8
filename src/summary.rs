//! Read-only views over the two stores for dashboards and list columns.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::error::Result;
use crate::status::ErrorStatus;
use crate::store::types::{ResolveOptions, ResolvedError, UrlHash};
use crate::store::ValidationStore;

const REMOVED_ELEMENT_CODES: &[&str] = &["invalid_element", "DISALLOWED_TAG"];
const REMOVED_ATTRIBUTE_CODES: &[&str] = &["invalid_attribute", "DISALLOWED_ATTR"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub new: usize,
    pub acknowledged: usize,
    pub ignored: usize,
}

impl StatusCounts {
    pub fn add(&mut self, status: ErrorStatus) {
        *self.slot(status) += 1;
    }

    pub fn get(&self, status: ErrorStatus) -> usize {
        match status {
            ErrorStatus::New => self.new,
            ErrorStatus::Acknowledged => self.acknowledged,
            ErrorStatus::Ignored => self.ignored,
        }
    }

    pub fn total(&self) -> usize {
        self.new + self.acknowledged + self.ignored
    }

    fn slot(&mut self, status: ErrorStatus) -> &mut usize {
        match status {
            ErrorStatus::New => &mut self.new,
            ErrorStatus::Acknowledged => &mut self.acknowledged,
            ErrorStatus::Ignored => &mut self.ignored,
        }
    }
}

/// Occurrence counts per category for one URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GroupedSummary {
    /// node name -> count
    pub removed_elements: BTreeMap<String, usize>,
    /// attribute name -> count
    pub removed_attributes: BTreeMap<String, usize>,
    /// source type -> source name -> count
    pub sources_with_invalid_output: BTreeMap<String, BTreeMap<String, usize>>,
}

impl GroupedSummary {
    pub fn is_empty(&self) -> bool {
        self.removed_elements.is_empty()
            && self.removed_attributes.is_empty()
            && self.sources_with_invalid_output.is_empty()
    }
}

pub struct SummaryAggregator {
    store: Arc<ValidationStore>,
}

impl SummaryAggregator {
    pub fn new(store: Arc<ValidationStore>) -> Self {
        Self { store }
    }

    /// Tally of a URL's resolved errors by record status, ignored included.
    pub async fn status_counts(&self, url_hash: &UrlHash) -> Result<StatusCounts> {
        let resolved = self
            .store
            .resolve_errors(url_hash, ResolveOptions::default())
            .await?;
        Ok(count_statuses(&resolved))
    }

    pub async fn grouped_summary(&self, url_hash: &UrlHash) -> Result<GroupedSummary> {
        let resolved = self
            .store
            .resolve_errors(url_hash, ResolveOptions::default())
            .await?;
        Ok(summarize(&resolved))
    }

    /// Per status, how many stored URLs reference at least one error in it.
    pub async fn urls_with_status(&self) -> Result<StatusCounts> {
        let mut urls = StatusCounts::default();
        for result in self.store.results().list(usize::MAX).await? {
            let counts = self.status_counts(&result.url_hash()).await?;
            for status in ErrorStatus::ALL {
                if counts.get(status) > 0 {
                    urls.add(status);
                }
            }
        }
        Ok(urls)
    }
}

pub fn count_statuses(resolved: &[ResolvedError]) -> StatusCounts {
    let mut counts = StatusCounts::default();
    for error in resolved {
        counts.add(error.status());
    }
    counts
}

/// Group resolved errors by removed element, removed attribute and the
/// source responsible for the invalid output.
pub fn summarize(resolved: &[ResolvedError]) -> GroupedSummary {
    let mut summary = GroupedSummary::default();

    for error in resolved {
        let descriptor = &error.record.descriptor;

        // innermost source that names its origin
        let source = error.source_list().into_iter().rev().find_map(|source| {
            let kind = source.get("type").and_then(Value::as_str)?.to_string();
            let name = source.get("name").and_then(Value::as_str)?.to_string();
            Some((kind, name))
        });
        if let Some((kind, name)) = source {
            *summary
                .sources_with_invalid_output
                .entry(kind)
                .or_default()
                .entry(name)
                .or_default() += 1;
        }

        let (Some(code), Some(node_name)) = (descriptor.code(), descriptor.node_name()) else {
            continue;
        };
        let bucket = if REMOVED_ELEMENT_CODES.contains(&code) {
            &mut summary.removed_elements
        } else if REMOVED_ATTRIBUTE_CODES.contains(&code) {
            &mut summary.removed_attributes
        } else {
            continue;
        };
        *bucket.entry(node_name.to_string()).or_default() += 1;
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::{canonicalize, ErrorDescriptor};
    use crate::store::types::ErrorRecord;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn resolved(value: Value, status: ErrorStatus) -> ResolvedError {
        let descriptor = ErrorDescriptor::from_value(value).unwrap();
        let (key, canonical) = canonicalize(&descriptor);
        let mut record = ErrorRecord::new(key, canonical);
        record.status = status;
        ResolvedError {
            record,
            sources: descriptor.raw_sources(),
        }
    }

    #[test]
    fn test_summarize_groups_by_category() {
        let errors = vec![
            resolved(
                json!({"code": "invalid_element", "node_name": "script", "sources": [
                    {"type": "theme", "name": "twentyseventeen"},
                    {"type": "plugin", "name": "jetpack"}
                ]}),
                ErrorStatus::New,
            ),
            resolved(
                json!({"code": "invalid_element", "node_name": "script", "sources": [{"type": "plugin", "name": "jetpack"}]}),
                ErrorStatus::Ignored,
            ),
            resolved(
                json!({"code": "invalid_attribute", "node_name": "onclick", "sources": ["s1"]}),
                ErrorStatus::Acknowledged,
            ),
            resolved(json!({"code": "DISALLOWED_TAG", "node_name": "style"}), ErrorStatus::New),
            resolved(json!({"code": "other", "node_name": "iframe"}), ErrorStatus::New),
        ];

        let summary = summarize(&errors);
        assert_eq!(
            summary.removed_elements,
            BTreeMap::from([("script".to_string(), 2), ("style".to_string(), 1)])
        );
        assert_eq!(
            summary.removed_attributes,
            BTreeMap::from([("onclick".to_string(), 1)])
        );
        assert_eq!(
            summary.sources_with_invalid_output,
            BTreeMap::from([(
                "plugin".to_string(),
                BTreeMap::from([("jetpack".to_string(), 2)])
            )])
        );

        let counts = count_statuses(&errors);
        assert_eq!(
            counts,
            StatusCounts {
                new: 3,
                acknowledged: 1,
                ignored: 1
            }
        );
        assert_eq!(counts.total(), 5);
    }

    #[test]
    fn test_summarize_single_object_source() {
        let errors = vec![resolved(
            json!({"code": "invalid_attribute", "node_name": "onload", "sources": {"type": "theme", "name": "t"}}),
            ErrorStatus::New,
        )];
        let summary = summarize(&errors);
        assert_eq!(
            summary.sources_with_invalid_output,
            BTreeMap::from([("theme".to_string(), BTreeMap::from([("t".to_string(), 1)]))])
        );
    }

    #[test]
    fn test_summarize_empty() {
        assert!(summarize(&[]).is_empty());
        assert_eq!(count_statuses(&[]), StatusCounts::default());
    }
}
