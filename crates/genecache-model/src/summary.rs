// SPDX-License-Identifier: Apache-2.0

use crate::FlattenedRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Label of the bucket that collects records without the grouping field.
pub const NOT_AVAILABLE_LABEL: &str = "N/A";

/// Buckets holding this share of the total or less lose their label.
pub const SMALL_BUCKET_PERCENT: u64 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub label: String,
    pub count: u64,
}

/// Parallel label/count sequences. Labels may be blank; counts always sum to
/// the number of records scanned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyTable {
    labels: Vec<String>,
    counts: Vec<u64>,
}

impl FrequencyTable {
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    #[must_use]
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.labels
            .iter()
            .map(String::as_str)
            .zip(self.counts.iter().copied())
    }

    #[must_use]
    pub fn buckets(&self) -> Vec<Bucket> {
        self.iter()
            .map(|(label, count)| Bucket {
                label: label.to_string(),
                count,
            })
            .collect()
    }

    fn push(&mut self, label: String, count: u64) {
        self.labels.push(label);
        self.counts.push(count);
    }
}

fn is_small_share(count: u64, total: u64) -> bool {
    u128::from(count) * 100 <= u128::from(total) * u128::from(SMALL_BUCKET_PERCENT)
}

/// Buckets `records` by the value of `group_field`.
///
/// The `N/A` bucket is always first and also absorbs empty values. Insertion
/// order of the remaining buckets follows the scan order.
pub fn summarize_records<'a, I>(records: I, group_field: &str) -> FrequencyTable
where
    I: IntoIterator<Item = &'a FlattenedRecord>,
{
    let mut order: Vec<(String, u64)> = vec![(NOT_AVAILABLE_LABEL.to_string(), 0)];
    let mut index: HashMap<String, usize> =
        HashMap::from([(NOT_AVAILABLE_LABEL.to_string(), 0)]);

    for record in records {
        let slot = match record.get(group_field).filter(|v| !v.is_empty()) {
            None => 0,
            Some(value) => match index.get(value) {
                Some(slot) => *slot,
                None => {
                    order.push((value.to_string(), 0));
                    index.insert(value.to_string(), order.len() - 1);
                    order.len() - 1
                }
            },
        };
        order[slot].1 += 1;
    }

    let total: u64 = order.iter().map(|(_, count)| count).sum();
    let mut table = FrequencyTable::default();
    for (label, count) in order {
        if is_small_share(count, total) {
            table.push(String::new(), count);
        } else {
            table.push(label, count);
        }
    }
    table
}
