//! Witness semantics across region backings.

use relay_region::{AtomicRegion, HeapRegion, MmapRegion};

fn exercise<R: AtomicRegion>(region: &R) {
    assert_eq!(region.len() % 8, 0);
    assert_eq!(region.load_acquire_u64(0), 0);

    region.store_release_u64(0, 42);
    assert_eq!(region.load_acquire_u64(0), 42);

    // Successful CAS returns the expected value as witness.
    assert_eq!(region.compare_and_swap_u64(0, 42, 43), 42);
    assert_eq!(region.load_acquire_u64(0), 43);

    // Failed CAS returns the conflicting current value and leaves it alone.
    assert_eq!(region.compare_and_swap_u64(0, 42, 99), 43);
    assert_eq!(region.load_acquire_u64(0), 43);

    // Offsets address independent words.
    region.store_release_u64(8, 7);
    assert_eq!(region.load_acquire_u64(8), 7);
    assert_eq!(region.load_acquire_u64(0), 43);
}

#[test]
fn heap_region_cas() {
    let region = HeapRegion::new(64);
    exercise(&region);
}

#[test]
#[should_panic(expected = "offset out of region bounds")]
fn mmap_region_rejects_out_of_range_offset() {
    let path = format!("/tmp/relay_region_oob_{}", std::process::id());
    let region = MmapRegion::create(&path, 64).expect("create region");
    let _ = std::fs::remove_file(&path);
    region.load_acquire_u64(64);
}

#[test]
#[should_panic(expected = "offset must be 8-aligned")]
fn mmap_region_rejects_misaligned_offset() {
    let path = format!("/tmp/relay_region_misaligned_{}", std::process::id());
    let region = MmapRegion::create(&path, 64).expect("create region");
    let _ = std::fs::remove_file(&path);
    region.store_release_u64(4, 1);
}

#[test]
fn mmap_region_cas() {
    let path = format!("/tmp/relay_region_test_{}", std::process::id());
    let region = MmapRegion::create(&path, 64).expect("create region");
    exercise(&region);

    // A second mapping of the same file observes the stores.
    let peer = MmapRegion::open(&path).expect("open region");
    assert_eq!(peer.load_acquire_u64(0), 43);
    assert_eq!(peer.load_acquire_u64(8), 7);

    let _ = std::fs::remove_file(&path);
}
