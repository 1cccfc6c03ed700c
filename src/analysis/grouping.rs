use std::collections::BTreeMap;

use crate::analysis::stats;
use crate::data::types::{AnalysisResult, DataItem};
use crate::error::ComputationError;

/// Partitions items by exact (case-sensitive) category and aggregates each group.
pub fn group_by_category(items: &[DataItem]) -> Result<AnalysisResult, ComputationError> {
    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for item in items {
        groups.entry(item.category.as_str()).or_default().push(item.value);
    }

    groups
        .into_iter()
        .map(|(category, values)| Ok((category.to_string(), stats::summarize(&values)?)))
        .collect()
}
