// SPDX-License-Identifier: Apache-2.0

use genecache_model::{
    flatten, summarize_records, FlattenedRecord, GeneId, SourceDocument, SourceRecord,
    NOT_AVAILABLE_LABEL,
};
use serde_json::json;

fn flattened(raw: serde_json::Value) -> FlattenedRecord {
    flatten(&SourceRecord::from_json(&raw).expect("source record"))
}

#[test]
fn hgnc_style_record_flattens_to_expected_field_map() {
    let record = flattened(json!({"hgnc_id": "1", "symbol": "A1BG", "alias": ["X", "Y"]}));
    let expected: FlattenedRecord = [("hgnc_id", "1"), ("symbol", "A1BG"), ("alias", "X|Y")]
        .into_iter()
        .collect();
    assert_eq!(record, expected);
}

#[test]
fn empty_list_is_stored_as_empty_string_not_omitted() {
    let record = flattened(json!({"hgnc_id": "HGNC:5", "prev_symbol": []}));
    assert_eq!(record.get("prev_symbol"), Some(""));
}

#[test]
fn unknown_fields_pass_through_opaquely() {
    let record = flattened(json!({
        "hgnc_id": "HGNC:5",
        "future_field": {"nested": true},
        "_version_": 1793
    }));
    assert_eq!(record.get("future_field"), Some(r#"{"nested":true}"#));
    assert_eq!(record.get("_version_"), Some("1793"));
}

#[test]
fn source_document_requires_response_docs() {
    let doc = SourceDocument::from_slice(
        br#"{"responseHeader":{"status":0},
            "response":{"numFound":1,"docs":[{"hgnc_id":"HGNC:5"}]}}"#,
    )
    .expect("document");
    assert_eq!(doc.records().len(), 1);

    assert!(SourceDocument::from_slice(br#"{"response":{}}"#).is_err());
    assert!(SourceDocument::from_slice(br#"{"docs":[]}"#).is_err());
    assert!(SourceDocument::from_slice(b"not json").is_err());
}

#[test]
fn gene_id_rejects_hidden_trimming() {
    assert!(GeneId::parse("HGNC:5").is_ok());
    assert!(GeneId::parse(" HGNC:5").is_err());
    assert!(GeneId::parse("").is_err());
    assert!(GeneId::parse(&"9".repeat(200)).is_err());
}

fn group_records(groups: &[(&str, usize)], missing: usize) -> Vec<FlattenedRecord> {
    let mut records = Vec::new();
    for (value, n) in groups {
        for i in 0..*n {
            records.push(
                [("hgnc_id", format!("{value}-{i}")), ("locus_group", value.to_string())]
                    .into_iter()
                    .collect(),
            );
        }
    }
    for i in 0..missing {
        records.push([("hgnc_id", format!("missing-{i}"))].into_iter().collect());
    }
    records
}

#[test]
fn small_buckets_lose_label_but_keep_count() {
    let records = group_records(
        &[("protein-coding gene", 50), ("pseudogene", 47), ("other", 3)],
        0,
    );
    let table = summarize_records(&records, "locus_group");

    assert_eq!(table.total(), 100);
    let pairs: Vec<(String, u64)> = table
        .iter()
        .map(|(label, count)| (label.to_string(), count))
        .collect();
    assert!(pairs.contains(&("protein-coding gene".to_string(), 50)));
    assert!(pairs.contains(&("pseudogene".to_string(), 47)));
    assert!(pairs.contains(&(String::new(), 3)));
    assert!(!pairs.iter().any(|(label, _)| label == "other"));
}

#[test]
fn counts_sum_to_records_scanned_for_any_grouping_field() {
    let records = group_records(&[("a", 10), ("b", 1), ("c", 40)], 9);
    for field in ["locus_group", "hgnc_id", "does_not_exist"] {
        let table = summarize_records(&records, field);
        assert_eq!(table.total(), records.len() as u64, "field {field}");
        assert_eq!(table.labels().len(), table.counts().len());
    }
}

#[test]
fn missing_grouping_field_counts_into_single_na_bucket() {
    let records = group_records(&[("a", 10)], 10);
    let table = summarize_records(&records, "locus_group");
    let na: Vec<_> = table
        .iter()
        .filter(|(label, _)| *label == NOT_AVAILABLE_LABEL)
        .collect();
    assert_eq!(na, vec![(NOT_AVAILABLE_LABEL, 10)]);
}

#[test]
fn bucket_multiset_is_stable_across_scan_order() {
    let mut records = group_records(&[("a", 5), ("b", 30), ("c", 65)], 2);
    let forward = summarize_records(&records, "locus_group");
    records.reverse();
    let backward = summarize_records(&records, "locus_group");

    let mut lhs = forward.buckets();
    let mut rhs = backward.buckets();
    lhs.sort_by(|a, b| a.label.cmp(&b.label).then(a.count.cmp(&b.count)));
    rhs.sort_by(|a, b| a.label.cmp(&b.label).then(a.count.cmp(&b.count)));
    assert_eq!(lhs, rhs);
}
