//! Model serde and ordering behaviour that other crates rely on.

use chrono::{TimeZone, Utc};
use hindsight_core::config::ReifyConfig;
use hindsight_core::models::*;
use proptest::prelude::*;

// ═══════════════════════════════════════════════════════════════════════════
// Version records
// ═══════════════════════════════════════════════════════════════════════════

fn record(sequence: u64, secs: i64, event: VersionEvent) -> VersionRecord {
    VersionRecord {
        sequence,
        item_type: "Chapter".to_string(),
        item_id: 1,
        event,
        attribute_payload: None,
        created_at: Utc.timestamp_opt(secs, 0).unwrap(),
        whodunnit: None,
    }
}

#[test]
fn version_events_parse_their_own_names() {
    for event in [VersionEvent::Create, VersionEvent::Update, VersionEvent::Destroy] {
        assert_eq!(VersionEvent::parse(event.as_str()), Some(event));
    }
    assert_eq!(VersionEvent::parse("touch"), None);
    assert!(!VersionEvent::Create.carries_pre_state());
    assert!(VersionEvent::Destroy.carries_pre_state());
}

#[test]
fn chronological_order_breaks_timestamp_ties_by_sequence() {
    let mut records = vec![
        record(3, 10, VersionEvent::Update),
        record(2, 10, VersionEvent::Update),
        record(1, 20, VersionEvent::Create),
    ];
    records.sort_by(VersionRecord::chronological);
    let order: Vec<u64> = records.iter().map(|r| r.sequence).collect();
    assert_eq!(order, vec![2, 3, 1]);
}

#[test]
fn boundary_comparison_is_strict() {
    let r = record(1, 100, VersionEvent::Update);
    assert!(!r.is_after(r.created_at), "a version at exactly as_of has applied");
    assert!(r.is_after(r.instant_before()));
}

// ═══════════════════════════════════════════════════════════════════════════
// Historical entities
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn historical_entity_json_round_trip_keeps_nested_graph() {
    let as_of = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let child = HistoricalEntity::new(
        "Section",
        7,
        as_of,
        SnapshotSource::Version { sequence: 4 },
        AttributeSet::new().with("name", "section 2").with("chapter_id", 1_i64),
    );
    let mut nested = std::collections::BTreeMap::new();
    nested.insert("sections".to_string(), vec![child]);
    let root = HistoricalEntity::new(
        "Chapter",
        1,
        as_of,
        SnapshotSource::Live,
        AttributeSet::new().with("name", "ch_2"),
    )
    .with_associations(nested);

    let json = serde_json::to_string(&root).unwrap();
    let back: HistoricalEntity = serde_json::from_str(&json).unwrap();
    assert_eq!(back, root);
    assert_eq!(back.association("sections").unwrap()[0].text("name"), Some("section 2"));
}

#[test]
fn unloaded_associations_are_distinguishable_from_empty_ones() {
    let as_of = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let bare = HistoricalEntity::new("Chapter", 1, as_of, SnapshotSource::Live, AttributeSet::new());
    assert!(!bare.is_nested_loaded());
    assert!(bare.association("sections").is_none());

    let loaded = bare.clone().with_associations(Default::default());
    assert!(loaded.is_nested_loaded());
    assert!(loaded.association("sections").is_none());
}

// ═══════════════════════════════════════════════════════════════════════════
// Config serde resilience
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn reify_config_missing_fields_take_defaults() {
    let config: ReifyConfig = serde_json::from_str(r#"{ "max_depth": 3 }"#).unwrap();
    assert_eq!(config.max_depth, 3);
    assert!(config.strict_payloads);
    assert!(config.deadline().is_none());
}

// ═══════════════════════════════════════════════════════════════════════════
// Attribute payloads
// ═══════════════════════════════════════════════════════════════════════════

fn scalar() -> impl Strategy<Value = AttributeValue> {
    prop_oneof![
        Just(AttributeValue::Null),
        any::<bool>().prop_map(AttributeValue::Bool),
        any::<i64>().prop_map(AttributeValue::Integer),
        "[a-z ]{0,12}".prop_map(AttributeValue::Text),
    ]
}

proptest! {
    // Untyped payload decoding keeps every scalar the recorder can write.
    #[test]
    fn prop_untyped_payload_round_trip(fields in proptest::collection::btree_map("[a-z_]{1,8}", scalar(), 0..8)) {
        let set: AttributeSet = fields.into_iter().collect();
        let payload: serde_json::Value = serde_json::from_str(&set.to_payload()).unwrap();
        let back: AttributeSet = payload
            .as_object()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), AttributeValue::from_json(v)))
            .collect();
        prop_assert_eq!(back, set);
    }
}
