//! End-to-end behavior of the public filter surface.

use cuckoocraft::{Algorithm, CuckooCraftError, CuckooFilter, CuckooFilterBuilder, U64Funnel};

fn build_filter(max_keys: u64) -> CuckooFilter<u64, U64Funnel> {
    CuckooFilter::builder(U64Funnel, max_keys).build().unwrap()
}

#[test]
fn test_no_false_negatives() {
    // 100k inserts into a 130k filter at 1% fpp with the 32-bit hash;
    // every inserted key must be reported present
    let filter: CuckooFilter<u64, U64Funnel> = CuckooFilterBuilder::new(U64Funnel, 130_000)
        .false_positive_rate(0.01)
        .hash_algorithm(Algorithm::Murmur3_32)
        .build()
        .unwrap();
    for i in 0..100_000u64 {
        assert!(filter.put(&i), "insert {i} failed well below capacity");
    }
    for i in 0..100_000u64 {
        assert!(filter.might_contain(&i), "false negative for {i}");
    }
    assert_eq!(filter.count(), 100_000);
}

#[test]
fn test_fresh_filter_definitely_absent() {
    let filter = build_filter(10_000);
    for i in 0..1_000u64 {
        assert!(!filter.might_contain(&i));
        assert_eq!(filter.approximate_count(&i), 0);
    }
}

#[test]
fn test_duplicate_ceiling() {
    let filter = build_filter(130_000);
    for attempt in 1..=9 {
        assert!(filter.put(&42), "duplicate insert {attempt} should succeed");
    }
    assert!(!filter.put(&42), "tenth duplicate insert must fail");
    assert_eq!(filter.approximate_count(&42), 9);

    for removed in 1..=9 {
        assert!(filter.delete(&42), "duplicate delete {removed} should succeed");
    }
    assert_eq!(filter.approximate_count(&42), 0);
    assert!(!filter.might_contain(&42));
    assert_eq!(filter.count(), 0);
}

#[test]
fn test_false_delete_rate_bounded() {
    let filter: CuckooFilter<u64, U64Funnel> = CuckooFilterBuilder::new(U64Funnel, 130_000)
        .false_positive_rate(0.01)
        .build()
        .unwrap();
    for i in 0..100_000u64 {
        assert!(filter.put(&i));
    }
    // deleting never-inserted keys succeeds only on fingerprint collision
    let mut false_deletes = 0;
    for i in 1_000_000..1_010_000u64 {
        if filter.delete(&i) {
            false_deletes += 1;
        }
    }
    assert!(
        false_deletes < 200,
        "false-delete rate too high: {false_deletes} of 10000"
    );
}

#[test]
fn test_load_factor_at_first_failure() {
    let filter = build_filter(100_000);
    let mut inserted = 0u64;
    for i in 0.. {
        if !filter.put(&i) {
            break;
        }
        inserted += 1;
    }
    assert_eq!(filter.count(), inserted);
    assert!(
        filter.load_factor() > 0.95,
        "first failure at load factor {}",
        filter.load_factor()
    );
}

#[test]
fn test_delete_from_empty_filter() {
    let filter = build_filter(10_000);
    assert!(!filter.delete(&7));
    assert_eq!(filter.count(), 0);
    assert_eq!(filter.load_factor(), 0.0);
}

#[test]
fn test_deletes_reopen_capacity() {
    let filter = build_filter(10_000);
    let mut inserted = Vec::new();
    for i in 0.. {
        if !filter.put(&i) {
            break;
        }
        inserted.push(i);
    }
    // free some room, then insert fresh keys
    for i in inserted.iter().take(500) {
        assert!(filter.delete(i));
    }
    let mut reinserted = 0;
    for i in 10_000_000..10_000_400u64 {
        if filter.put(&i) {
            reinserted += 1;
        }
    }
    assert!(reinserted > 300, "only {reinserted} inserts after deletes");
}

#[test]
fn test_geometry_getters() {
    let filter = build_filter(130_000);
    assert_eq!(filter.num_buckets(), 65_536);
    assert_eq!(filter.actual_capacity(), 65_536 * 4);
    assert_eq!(filter.tag_bits(), 8);
    assert_eq!(filter.storage_size(), 65_536 * 4 * 8);
    assert_eq!(filter.expected_concurrency(), 16);
}

#[test]
fn test_builder_rejects_invalid_configurations() {
    assert!(matches!(
        CuckooFilterBuilder::<u64, _>::new(U64Funnel, 1).build(),
        Err(CuckooCraftError::InvalidMaxKeys { .. })
    ));
    assert!(matches!(
        CuckooFilterBuilder::<u64, _>::new(U64Funnel, 1_000)
            .false_positive_rate(0.3)
            .build(),
        Err(CuckooCraftError::FalsePositiveRateOutOfBounds { .. })
    ));
    assert!(matches!(
        CuckooFilterBuilder::<u64, _>::new(U64Funnel, 1_000)
            .expected_concurrency(6)
            .build(),
        Err(CuckooCraftError::InvalidConcurrency { .. })
    ));
    assert!(matches!(
        CuckooFilterBuilder::<u64, _>::new(U64Funnel, 300_000_000)
            .hash_algorithm(Algorithm::Murmur3_32)
            .build(),
        Err(CuckooCraftError::UnsupportedHashConfiguration { .. })
    ));
}

#[test]
fn test_all_algorithms_end_to_end() {
    for algorithm in [
        Algorithm::Murmur3_32,
        Algorithm::Murmur3_128,
        Algorithm::Sha256,
        Algorithm::SipHash24,
        Algorithm::XxHash64,
    ] {
        let filter: CuckooFilter<u64, U64Funnel> = CuckooFilterBuilder::new(U64Funnel, 10_000)
            .hash_algorithm(algorithm)
            .build()
            .unwrap();
        for i in 0..5_000u64 {
            assert!(filter.put(&i), "{algorithm:?}: insert {i}");
        }
        for i in 0..5_000u64 {
            assert!(filter.might_contain(&i), "{algorithm:?}: false negative {i}");
        }
        for i in 0..5_000u64 {
            assert!(filter.delete(&i), "{algorithm:?}: delete {i}");
        }
        assert_eq!(filter.count(), 0, "{algorithm:?}");
    }
}
