//! Put/get/flush throughput against both reference backends

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use frontswap_cache::{
    BackendRef, Frontswap, PageBuf, PoolBackend, SegmentedBackend, SwapPage, SwapSlot,
};
use std::sync::Arc;

const AREA_PAGES: u64 = 16 * 1024;

fn cache_with(backend: BackendRef) -> Frontswap {
    let cache = Frontswap::with_defaults();
    cache.register_backend(backend);
    cache
        .activate_area(0, AREA_PAGES)
        .expect("fresh cache has no areas");
    cache
}

fn bench_backend(c: &mut Criterion, name: &str, make: fn() -> BackendRef) {
    let mut group = c.benchmark_group(name);

    group.bench_function("put_flush", |b| {
        let cache = cache_with(make());
        let page = SwapPage::new(SwapSlot::new(0, 7), PageBuf::filled(0xA5));
        b.iter(|| {
            cache.put(black_box(&page)).unwrap();
            cache.flush_page(page.slot());
        });
    });

    group.bench_function("get_hit", |b| {
        let cache = cache_with(make());
        let slot = SwapSlot::new(0, 7);
        cache
            .put(&SwapPage::new(slot, PageBuf::filled(0xA5)))
            .unwrap();
        let mut page = SwapPage::empty(slot);
        b.iter(|| cache.get(black_box(&mut page)).unwrap());
    });

    group.bench_function("get_miss", |b| {
        let cache = cache_with(make());
        let mut page = SwapPage::empty(SwapSlot::new(0, 9));
        b.iter(|| cache.get(black_box(&mut page)).is_err());
    });

    group.bench_function("fill_area", |b| {
        b.iter_batched(
            || cache_with(make()),
            |cache| {
                let data = PageBuf::filled(1);
                for offset in 0..1024 {
                    let page = SwapPage::new(SwapSlot::new(0, offset), data.clone());
                    cache.put(&page).unwrap();
                }
                cache
            },
            BatchSize::LargeInput,
        );
    });

    group.finish();
}

fn segmented(c: &mut Criterion) {
    bench_backend(c, "segmented", || -> BackendRef {
        Arc::new(SegmentedBackend::new())
    });
}

fn pool(c: &mut Criterion) {
    bench_backend(c, "pool", || -> BackendRef {
        Arc::new(PoolBackend::new(AREA_PAGES as usize).expect("mmap pool"))
    });
}

criterion_group!(benches, segmented, pool);
criterion_main!(benches);
