// Model parsing and serialization tests

use chrono::DateTime;
use occupancy_relay::models::*;
use serde_json::json;

#[test]
fn test_snapshot_serializes_flat() {
    let json = serde_json::to_value(Snapshot::new(5, 2, 3)).unwrap();
    assert_eq!(json, json!({"entered": 5, "departed": 2, "inside": 3}));
}

#[test]
fn test_snapshot_consistency() {
    assert!(Snapshot::new(5, 2, 3).is_consistent());
    assert!(Snapshot::new(1, 3, -2).is_consistent());
    assert!(!Snapshot::new(5, 2, 4).is_consistent());
}

#[test]
fn test_update_accepts_any_subset() {
    let update = SnapshotUpdate::from_json(json!({"departed": 3})).unwrap();
    assert_eq!(
        update,
        SnapshotUpdate {
            departed: Some(3),
            ..Default::default()
        }
    );
    assert!(SnapshotUpdate::from_json(json!({})).unwrap().is_empty());
}

#[test]
fn test_update_null_means_absent() {
    let update = SnapshotUpdate::from_json(json!({"entered": null, "inside": 2})).unwrap();
    assert_eq!(update.entered, None);
    assert_eq!(update.inside, Some(2));
}

#[test]
fn test_update_rejects_non_objects() {
    for value in [json!([1, 2, 3]), json!(null), json!(true), json!("x"), json!(4)] {
        let err = SnapshotUpdate::from_json(value).unwrap_err();
        assert!(err.to_string().contains("expected a JSON object"));
    }
}

#[test]
fn test_update_rejects_negative_counters() {
    assert!(SnapshotUpdate::from_json(json!({"entered": -1})).is_err());
    assert!(SnapshotUpdate::from_json(json!({"departed": -4})).is_err());
    // `inside` may go negative.
    assert_eq!(
        SnapshotUpdate::from_json(json!({"inside": -4})).unwrap().inside,
        Some(-4)
    );
}

#[test]
fn test_update_apply_to_overlays_present_fields() {
    let base = Snapshot::new(5, 2, 3);
    let update = SnapshotUpdate {
        entered: Some(6),
        inside: Some(4),
        ..Default::default()
    };
    assert_eq!(update.apply_to(base), Snapshot::new(6, 2, 4));
    assert_eq!(SnapshotUpdate::full(base).apply_to(Snapshot::default()), base);
}

#[test]
fn test_command_signal_wire_encoding() {
    assert_eq!(CommandSignal::Idle.as_str(), "1");
    assert_eq!(CommandSignal::Reset.as_str(), "0");
    assert_eq!(CommandSignal::from(true), CommandSignal::Reset);
    assert_eq!(CommandSignal::from(false), CommandSignal::Idle);
    assert_eq!(CommandSignal::from_wire("0"), Some(CommandSignal::Reset));
    assert_eq!(CommandSignal::from_wire("1\n"), Some(CommandSignal::Idle));
    assert_eq!(CommandSignal::from_wire("reset"), None);
}

#[test]
fn test_history_series_projection() {
    let t0 = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
    let t1 = DateTime::from_timestamp(1_700_000_002, 0).unwrap();
    let records = vec![
        HistoryRecord::new(&Snapshot::new(5, 2, 3), t0),
        HistoryRecord::new(&Snapshot::new(6, 2, 4), t1),
    ];
    let series = HistorySeries::from_records(&records);
    assert_eq!(series.labels, vec!["2023-11-14 22:13:20", "2023-11-14 22:13:22"]);
    assert_eq!(series.values, vec![3, 4]);
    assert_eq!(
        serde_json::to_value(&series).unwrap(),
        json!({
            "labels": ["2023-11-14 22:13:20", "2023-11-14 22:13:22"],
            "values": [3, 4],
        })
    );
}

#[test]
fn test_history_series_unavailable_carries_error() {
    let series = HistorySeries::unavailable("db locked");
    assert!(series.is_empty());
    assert_eq!(
        serde_json::to_value(&series).unwrap(),
        json!({"labels": [], "values": [], "error": "db locked"})
    );
}
