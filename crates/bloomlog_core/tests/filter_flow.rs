use bloomlog_core::{BloomError, BloomFilter};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs;
use tempfile::tempdir;

#[test]
fn small_filter_scenario() {
    let bf = BloomFilter::new(500, 0.0005).unwrap();
    bf.put("123456");
    assert!(bf.contains("123456"));
    assert!(!bf.contains("1234567"));
}

#[test]
fn large_filter_dump_and_load() {
    let tmp = tempdir().unwrap();
    let bf = BloomFilter::new(40_000_000, 0.01).unwrap();
    bf.put("123456");
    bf.dump(tmp.path(), "test").unwrap();

    assert_eq!(
        fs::metadata(tmp.path().join("test.bitmap")).unwrap().len(),
        bf.bit_size().div_ceil(32) * 4
    );

    let back = BloomFilter::load(tmp.path(), "test").unwrap();
    assert_eq!(back.meta(), bf.meta());
    assert!(back.contains("123456"));
    assert!(!back.contains("1234567"));
}

#[test]
fn false_positive_rate_stays_near_target() {
    let n = 10_000u64;
    let p = 0.01;
    let bf = BloomFilter::new(n, p).unwrap();
    let mut rng = StdRng::seed_from_u64(42);
    let inserted: Vec<String> = (0..n).map(|_| format!("in-{}", rng.random::<u64>())).collect();
    for k in &inserted {
        bf.put(k);
    }
    assert!(inserted.iter().all(|k| bf.contains(k)));

    let trials = 100_000;
    let hits = (0..trials)
        .filter(|_| bf.contains(&format!("out-{}", rng.random::<u64>())))
        .count();
    let rate = hits as f64 / trials as f64;
    assert!(rate <= p * 1.5, "false positive rate {rate}");
}

#[test]
fn reload_then_keep_inserting() {
    let tmp = tempdir().unwrap();
    let bf = BloomFilter::new(1000, 0.01).unwrap();
    bf.put("a");
    bf.put("b");
    bf.dump(tmp.path(), "s").unwrap();

    let back = BloomFilter::load(tmp.path(), "s").unwrap();
    assert_eq!(back.total(), 2);
    assert!(back.put("a"));
    assert!(!back.put("c"));
    assert_eq!(back.total(), 3);

    // second dump replaces the first
    back.dump(tmp.path(), "s").unwrap();
    assert_eq!(fs::read_to_string(tmp.path().join("s.meta")).unwrap(), "1000:7:9586:3");
}

#[test]
fn load_failures_name_the_cause() {
    let tmp = tempdir().unwrap();
    assert!(matches!(
        BloomFilter::load(tmp.path(), "none"),
        Err(BloomError::MissingFile { .. })
    ));

    fs::write(tmp.path().join("m.meta"), "1:2:3").unwrap();
    assert!(matches!(
        BloomFilter::load(tmp.path(), "m"),
        Err(BloomError::MetaFieldCount(3))
    ));

    fs::write(tmp.path().join("m.meta"), "1000:7:abc:0").unwrap();
    let err = BloomFilter::load(tmp.path(), "m").err().unwrap();
    assert!(err.to_string().contains("bitSize"), "{err}");

    fs::write(tmp.path().join("m.meta"), "1000:7:9586:0").unwrap();
    assert!(matches!(
        BloomFilter::load(tmp.path(), "m"),
        Err(BloomError::MissingFile { .. })
    ));

    fs::write(tmp.path().join("m.bitmap"), vec![0u8; 100]).unwrap();
    assert!(matches!(
        BloomFilter::load(tmp.path(), "m"),
        Err(BloomError::Truncated { expected: 1200, found: 100, .. })
    ));
}
