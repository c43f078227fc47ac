//! Round-trip behavior of serialized filters: structural equality, query
//! agreement, victim survival, and rejection of incompatible state.

use cuckoocraft::serde_support::CuckooFilterSerdeSupport;
use cuckoocraft::{CuckooFilter, CuckooFilterBuilder, I64Funnel, U64Funnel};

#[test]
fn test_roundtrip_after_partial_fill() {
    // a large table filled to a fraction of capacity
    let filter: CuckooFilter<u64, U64Funnel> =
        CuckooFilter::builder(U64Funnel, 2_000_000).build().unwrap();
    for i in 0..100_000u64 {
        assert!(filter.put(&i));
    }

    let bytes = CuckooFilterSerdeSupport::to_bytes(&filter).unwrap();
    let restored: CuckooFilter<u64, U64Funnel> =
        CuckooFilterSerdeSupport::from_bytes(&bytes).unwrap();

    assert!(restored == filter);
    assert_eq!(restored.count(), filter.count());
    assert_eq!(restored.num_buckets(), filter.num_buckets());
    assert_eq!(restored.storage_size(), filter.storage_size());
    for i in 0..100_000u64 {
        assert!(restored.might_contain(&i), "lost {i} in round trip");
    }
    // absent keys answer the same on both sides
    for i in 5_000_000..5_001_000u64 {
        assert_eq!(restored.might_contain(&i), filter.might_contain(&i));
    }
}

#[test]
fn test_roundtrip_preserves_victim() {
    let filter: CuckooFilter<u64, U64Funnel> =
        CuckooFilter::builder(U64Funnel, 10_000).build().unwrap();
    // nine duplicates park the last copy in the victim slot
    let mut item = None;
    for candidate in 0..1_000u64 {
        let mut successes = 0;
        while filter.put(&candidate) {
            successes += 1;
        }
        if successes == 9 {
            item = Some(candidate);
            break;
        }
        // candidate landed on coinciding buckets; drain it and try the next
        while filter.delete(&candidate) {}
    }
    let item = item.expect("no candidate with distinct buckets in 1000 tries");

    let bytes = CuckooFilterSerdeSupport::to_bytes(&filter).unwrap();
    let restored: CuckooFilter<u64, U64Funnel> =
        CuckooFilterSerdeSupport::from_bytes(&bytes).unwrap();

    assert!(restored == filter);
    assert_eq!(restored.approximate_count(&item), 9);
    for _ in 0..9 {
        assert!(restored.delete(&item));
    }
    assert!(!restored.might_contain(&item));
}

#[test]
fn test_roundtrip_then_mutate() {
    let filter: CuckooFilter<u64, U64Funnel> =
        CuckooFilter::builder(U64Funnel, 50_000).build().unwrap();
    for i in 0..10_000u64 {
        assert!(filter.put(&i));
    }

    let json = CuckooFilterSerdeSupport::to_json(&filter).unwrap();
    let restored: CuckooFilter<u64, U64Funnel> =
        CuckooFilterSerdeSupport::from_json(&json).unwrap();

    // the rebuilt lock array must support the full mutation surface
    for i in 10_000..20_000u64 {
        assert!(restored.put(&i));
    }
    for i in 0..5_000u64 {
        assert!(restored.delete(&i));
    }
    assert_eq!(restored.count(), 15_000);
    assert!(filter != restored);
}

#[test]
fn test_funnel_mismatch_rejected() {
    let filter: CuckooFilter<u64, U64Funnel> =
        CuckooFilter::builder(U64Funnel, 10_000).build().unwrap();
    filter.put(&1);
    let bytes = CuckooFilterSerdeSupport::to_bytes(&filter).unwrap();

    let result: cuckoocraft::Result<CuckooFilter<i64, I64Funnel>> =
        CuckooFilterSerdeSupport::from_bytes(&bytes);
    let err = result.unwrap_err();
    assert!(err.to_string().contains("funnel"), "unexpected error: {err}");
}

#[test]
fn test_roundtrip_with_custom_configuration() {
    let filter: CuckooFilter<u64, U64Funnel> = CuckooFilterBuilder::new(U64Funnel, 25_000)
        .false_positive_rate(0.002)
        .hash_algorithm(cuckoocraft::Algorithm::SipHash24)
        .expected_concurrency(4)
        .build()
        .unwrap();
    for i in 0..5_000u64 {
        assert!(filter.put(&i));
    }

    let bytes = CuckooFilterSerdeSupport::to_bytes(&filter).unwrap();
    let restored: CuckooFilter<u64, U64Funnel> =
        CuckooFilterSerdeSupport::from_bytes(&bytes).unwrap();

    assert!(restored == filter);
    assert_eq!(restored.algorithm(), cuckoocraft::Algorithm::SipHash24);
    assert_eq!(restored.tag_bits(), filter.tag_bits());
    assert_eq!(restored.expected_concurrency(), 4);
    for i in 0..5_000u64 {
        assert!(restored.might_contain(&i));
    }
}
