//! Reconciliation over registry snapshots.

use abasync_core::{ReportDataSet, ReportHandle, ReportRegistry, ReportRow};
use abasync_reconcile::{records_to_csv, CombineConfig, CombineEngine};
use serde_json::{json, Value};
use std::sync::Arc;

fn rows(value: Value) -> ReportDataSet {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_object().unwrap().clone())
        .collect::<Vec<ReportRow>>()
}

async fn finished(registry: &ReportRegistry, kind: &str, data: Value) -> ReportHandle {
    let handle = registry.create("19", kind).await;
    registry
        .complete_success(&handle, "rows=1", Some(1), Arc::new(rows(data)))
        .await
        .unwrap();
    handle
}

fn projects() -> Value {
    json!([{"ProjNr": "P-100", "ProjName": "Umbau Empfang", "AdrNrIntern": 500, "DebNr": 0}])
}

fn addresses() -> Value {
    json!([{"NR": 500, "NAME": "Muster AG", "TEL": "061 000 00 00", "TEL2": "", "NATEL": ""}])
}

#[tokio::test]
async fn test_missing_address_gives_empty_result() {
    let registry = ReportRegistry::new();
    finished(&registry, "npo", projects()).await;
    finished(&registry, "akp", json!([{"NR": 1, "ADR_NR": 500}])).await;

    let engine = CombineEngine::default();
    assert!(engine.combine_registry(&registry).await.is_empty());
}

#[tokio::test]
async fn test_missing_primary_gives_empty_result() {
    let registry = ReportRegistry::new();
    finished(&registry, "adr", addresses()).await;

    assert!(CombineEngine::default()
        .combine_registry(&registry)
        .await
        .is_empty());
}

#[tokio::test]
async fn test_contacts_fan_out() {
    let registry = ReportRegistry::new();
    finished(&registry, "npo", projects()).await;
    finished(&registry, "adr", addresses()).await;
    finished(
        &registry,
        "akp",
        json!([
            {"NR": 1, "ADR_NR": "500", "VORNAME": "Anna", "NAME": "Meier", "TEL": "061 111 11 11"},
            {"NR": 2, "ADR_NR": 500, "VORNAME": "Beat", "NAME": "Keller", "TEL": "061 222 22 22"},
            {"NR": 3, "ADR_NR": 999, "VORNAME": "Carla", "NAME": "Other"}
        ]),
    )
    .await;

    let records = CombineEngine::default().combine_registry(&registry).await;
    assert_eq!(records.len(), 2);

    assert_eq!(records[0]["AKP_VORNAME"], "Anna");
    assert_eq!(records[1]["AKP_VORNAME"], "Beat");

    // Identical apart from the contact fields.
    let strip = |record: &serde_json::Map<String, Value>| {
        record
            .iter()
            .filter(|(k, _)| !k.starts_with("AKP_"))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect::<serde_json::Map<_, _>>()
    };
    assert_eq!(strip(&records[0]), strip(&records[1]));
    assert_eq!(records[0]["NPO_ProjNr"], "P-100");
    assert_eq!(records[0]["ADR_NAME"], "Muster AG");
    assert_eq!(records[0]["Status"], "new");
}

#[tokio::test]
async fn test_no_contacts_gives_single_record() {
    let registry = ReportRegistry::new();
    finished(&registry, "npo", projects()).await;
    finished(&registry, "adr", addresses()).await;
    finished(&registry, "akp", json!([{"NR": 3, "ADR_NR": 999}])).await;

    let records = CombineEngine::default().combine_registry(&registry).await;
    assert_eq!(records.len(), 1);
    assert!(records[0].keys().all(|k| !k.starts_with("AKP_")));
    assert_eq!(records[0]["Status"], "new");
}

#[tokio::test]
async fn test_phone_fallback() {
    let registry = ReportRegistry::new();
    finished(&registry, "npo", projects()).await;
    finished(
        &registry,
        "adr",
        json!([{"NR": 500, "NAME": "Muster AG", "TEL": "", "TEL2": "061 999 99 99", "NATEL": "079"}]),
    )
    .await;
    finished(
        &registry,
        "akp",
        json!([{"NR": 1, "ADR_NR": 500, "TEL": " ", "TEL_DIREKT": null, "NATEL": "", "TEL2": "", "TEL_PRIVAT": "044 123"}]),
    )
    .await;

    let records = CombineEngine::default().combine_registry(&registry).await;
    assert_eq!(records[0]["ADR_TEL"], "061 999 99 99");
    assert_eq!(records[0]["AKP_TEL"], "044 123");
    assert_eq!(records[0]["ADR_TEL2"], "061 999 99 99");
}

#[tokio::test]
async fn test_latest_successful_dataset_wins() {
    let registry = ReportRegistry::new();
    finished(&registry, "npo", projects()).await;
    finished(&registry, "adr", json!([{"NR": 500, "NAME": "Old Name"}])).await;
    finished(&registry, "adr", json!([{"NR": 500, "NAME": "New Name"}])).await;

    let failed = registry.create("19", "adr").await;
    registry.fail(&failed, "boom").await.unwrap();
    registry.create("19", "adr").await;

    let records = CombineEngine::default().combine_registry(&registry).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["ADR_NAME"], "New Name");
}

#[tokio::test]
async fn test_combination_is_deterministic() {
    let registry = ReportRegistry::new();
    finished(
        &registry,
        "npo",
        json!([
            {"ProjNr": "P-1", "AdrNrIntern": 2},
            {"ProjNr": "P-2", "AdrNrIntern": "0", "DebNr": 1},
            {"ProjNr": "P-3", "AdrNrIntern": 1}
        ]),
    )
    .await;
    finished(&registry, "adr", json!([{"NR": 1}, {"NR": 2}])).await;
    finished(
        &registry,
        "akp",
        json!([{"NR": 10, "ADR_NR": 1}, {"NR": 11, "ADR_NR": 2}, {"NR": 12, "ADR_NR": 1}]),
    )
    .await;

    let engine = CombineEngine::default();
    let first = engine.combine_registry(&registry).await;
    let second = engine.combine_registry(&registry).await;
    assert_eq!(first, second);

    let order: Vec<(Value, Value)> = first
        .iter()
        .map(|r| (r["NPO_ProjNr"].clone(), r["AKP_NR"].clone()))
        .collect();
    assert_eq!(
        order,
        vec![
            (json!("P-1"), json!(11)),
            (json!("P-2"), json!(10)),
            (json!("P-2"), json!(12)),
            (json!("P-3"), json!(10)),
            (json!("P-3"), json!(12)),
        ]
    );
}

#[tokio::test]
async fn test_custom_kinds() {
    let registry = ReportRegistry::new();
    finished(&registry, "dko", json!([{"ProjNr": "D-1", "AdrNrIntern": 5}])).await;
    finished(&registry, "adr", json!([{"NR": 5, "NAME": "Five"}])).await;

    let engine = CombineEngine::new(CombineConfig {
        primary_kind: "dko".into(),
        ..CombineConfig::default()
    });
    let records = engine.combine_registry(&registry).await;
    assert_eq!(records[0]["DKO_ProjNr"], "D-1");
}

#[tokio::test]
async fn test_combined_records_export_as_csv() {
    let registry = ReportRegistry::new();
    finished(&registry, "npo", json!([{"ProjNr": "P-1", "AdrNrIntern": 1}])).await;
    finished(&registry, "adr", json!([{"NR": 1, "NAME": "Eins"}])).await;

    let records = CombineEngine::default().combine_registry(&registry).await;
    let csv = String::from_utf8(records_to_csv(&records).unwrap()).unwrap();
    assert_eq!(
        csv,
        "NPO_ProjNr,NPO_AdrNrIntern,ADR_NR,ADR_NAME,Status\nP-1,1,1,Eins,new\n"
    );
}
