//! Signature determinism and dedup-set behavior

use std::collections::HashSet;
use trade_history_ingestor::ingest::SignatureStore;
use trade_history_ingestor::{Trade, TradeSide};

fn trade(ts: i64, price: &str, size: &str, trader: &str) -> Trade {
    Trade {
        timestamp: ts,
        price: price.parse().unwrap(),
        size: size.parse().unwrap(),
        trader_id: trader.to_string(),
        market_id: "0xmarket".to_string(),
        side: TradeSide::Buy,
        outcome_index: None,
    }
}

#[test]
fn test_equal_fields_produce_equal_signatures() {
    let a = trade(1_700_000_000, "0.42", "10.5", "0xabc");
    let b = trade(1_700_000_000, "0.42", "10.5", "0xabc");
    assert_eq!(a.signature(), b.signature());
}

#[test]
fn test_any_differing_field_changes_the_signature() {
    let base = trade(1_700_000_000, "0.42", "10.5", "0xabc");
    let variants = [
        trade(1_700_000_001, "0.42", "10.5", "0xabc"),
        trade(1_700_000_000, "0.43", "10.5", "0xabc"),
        trade(1_700_000_000, "0.42", "10.6", "0xabc"),
        trade(1_700_000_000, "0.42", "10.5", "0xabd"),
    ];
    for variant in &variants {
        assert_ne!(base.signature(), variant.signature());
    }
}

#[test]
fn test_signature_format_is_pipe_joined() {
    let t = trade(1_700_000_000, "0.42", "10.5", "0xabc");
    assert_eq!(t.signature(), "1700000000|0.42|10.5|0xabc");
}

#[test]
fn test_store_deduplicates_across_seed_and_inserts() {
    let mut store = SignatureStore::new();

    let persisted: HashSet<String> = (0..100)
        .map(|i| trade(1_700_000_000 + i, "0.5", "1", "0xabc").signature())
        .collect();
    store.seed(persisted);
    assert_eq!(store.len(), 100);

    // Re-fetching persisted trades yields no new entries
    for i in 0..100 {
        let sig = trade(1_700_000_000 + i, "0.5", "1", "0xabc").signature();
        assert!(!store.insert(sig));
    }

    // Genuinely new trades are accepted exactly once
    let fresh = trade(1_800_000_000, "0.5", "1", "0xabc").signature();
    assert!(store.insert(fresh.clone()));
    assert!(!store.insert(fresh));
    assert_eq!(store.len(), 101);
}
