//! Pending fetch coalescing: one getter per outstanding request shape.

#[path = "../support/mod.rs"]
mod support;

mod runtime;

use collection_cache::{CacheError, CollectionCache, Options};
use futures::executor::block_on;
use serde_json::json;
use support::{ids, init_tracing, posts, ParkedGetters};

fn first_page() -> Options {
    Options::new().with("sort", "date").skip(0).limit(3)
}

#[test]
fn concurrent_gets_share_one_getter() {
    init_tracing();
    let cache = CollectionCache::default();
    let getters = ParkedGetters::new();

    let fetches: Vec<_> = (0..5)
        .map(|_| cache.get_with(&first_page(), getters.getter()))
        .collect();

    assert_eq!(getters.calls(), 1);
    assert_eq!(cache.pending_fetches(), 1);

    getters.take().supply(posts(0, 3));

    for fetch in fetches {
        let page = block_on(fetch).unwrap();
        assert_eq!(
            ids(&page),
            vec![
                Some("post-0".to_string()),
                Some("post-1".to_string()),
                Some("post-2".to_string()),
            ]
        );
    }
    assert_eq!(cache.pending_fetches(), 0);
}

#[test]
fn getterless_get_joins_pending_fetch() {
    let cache = CollectionCache::default();
    let getters = ParkedGetters::new();

    let opener = cache.get_with(&first_page(), getters.getter());
    let follower = cache.get(&first_page());

    getters.take().supply(posts(0, 3));

    assert_eq!(block_on(opener).unwrap().len(), 3);
    assert_eq!(block_on(follower).unwrap().len(), 3);
}

#[test]
fn distinct_ranges_fetch_separately() {
    let cache = CollectionCache::default();
    let getters = ParkedGetters::new();

    let first = cache.get_with(&first_page(), getters.getter());
    let second = cache.get_with(
        &Options::new().with("sort", "date").skip(3).limit(3),
        getters.getter(),
    );

    assert_eq!(getters.calls(), 2);
    assert_eq!(cache.pending_fetches(), 2);

    let settle_first = getters.take();
    let settle_second = getters.take();
    assert_eq!(settle_second.range().skip, 3);

    settle_second.supply(posts(3, 3));
    settle_first.supply(posts(0, 3));

    assert_eq!(ids(&block_on(second).unwrap())[0], Some("post-3".to_string()));
    assert_eq!(ids(&block_on(first).unwrap())[0], Some("post-0".to_string()));

    let all = cache
        .all(&Options::new().with("sort", "date"))
        .now()
        .unwrap()
        .unwrap();
    assert_eq!(all.len(), 6);
}

#[test]
fn fetch_is_pending_until_settled() {
    let cache = CollectionCache::default();
    let getters = ParkedGetters::new();

    let fetch = cache.get_with(&first_page(), getters.getter());
    assert_eq!(fetch.now(), None);

    // The dropped Fetch does not cancel the underlying request.
    assert_eq!(cache.pending_fetches(), 1);
    getters.take().supply(posts(0, 3));
    assert_eq!(cache.pending_fetches(), 0);

    let cached = cache.get(&first_page()).now().unwrap().unwrap();
    assert_eq!(cached.len(), 3);
}

#[test]
fn failure_reaches_every_waiter() {
    let cache = CollectionCache::default();
    let getters = ParkedGetters::new();

    let a = cache.get_with(&first_page(), getters.getter());
    let b = cache.get_with(&first_page(), getters.getter());

    getters.take().fail("upstream returned 503");

    let expected = Err(CacheError::GetterFailure("upstream returned 503".into()));
    assert_eq!(block_on(a), expected);
    assert_eq!(block_on(b), expected);
    assert_eq!(cache.pending_fetches(), 0);
    assert!(cache.list().is_empty());
}

#[test]
fn failure_allows_retry() {
    let cache = CollectionCache::default();

    let failed = cache.get_with(&first_page(), |settle| settle.fail("boom"));
    assert!(matches!(
        failed.now(),
        Some(Err(CacheError::GetterFailure(_)))
    ));

    let retried = cache.get_with(&first_page(), |settle| settle.supply(posts(0, 3)));
    assert_eq!(retried.now().unwrap().unwrap().len(), 3);
}

#[test]
fn supplying_a_non_array_is_invalid_payload() {
    let cache = CollectionCache::default();
    let getters = ParkedGetters::new();

    let a = cache.get_with(&first_page(), getters.getter());
    let b = cache.get(&first_page());

    getters.take().supply(json!({ "not": "array" }));

    assert!(matches!(block_on(a), Err(CacheError::InvalidPayload { .. })));
    assert!(matches!(block_on(b), Err(CacheError::InvalidPayload { .. })));
    assert!(cache.list().is_empty());
    assert_eq!(cache.view_len(&first_page()), 0);
    assert_eq!(cache.pending_fetches(), 0);
}

#[test]
fn dropping_settle_abandons_fetch() {
    let cache = CollectionCache::default();

    let fetch = cache.get_with(&first_page(), drop);

    assert_eq!(fetch.now(), Some(Err(CacheError::Abandoned)));
    assert_eq!(cache.pending_fetches(), 0);
}

#[test]
fn short_supply_pads_with_absent_positions() {
    let cache = CollectionCache::default();

    let page = cache
        .get_with(&first_page(), |settle| settle.supply(posts(0, 1)))
        .now()
        .unwrap()
        .unwrap();

    assert_eq!(ids(&page), vec![Some("post-0".to_string()), None, None]);
}

#[test]
fn supply_writes_at_requested_skip() {
    let cache = CollectionCache::default();
    let second_page = Options::new().skip(2).limit(2);

    cache
        .get_with(&second_page, |settle| {
            assert_eq!(settle.range().skip, 2);
            settle.supply(posts(2, 2));
        })
        .now()
        .unwrap()
        .unwrap();

    let all = cache.all(&Options::new()).now().unwrap().unwrap();
    assert_eq!(
        ids(&all),
        vec![
            None,
            None,
            Some("post-2".to_string()),
            Some("post-3".to_string()),
        ]
    );
}

#[test]
fn all_with_fetches_full_range() {
    let cache = CollectionCache::default();
    let getters = ParkedGetters::new();

    let fetch = cache.all_with(&Options::new().with("sort", "date").skip(7), getters.getter());
    let settle = getters.take();
    assert_eq!(settle.range().skip, 0);
    assert_eq!(settle.range().limit, None);

    settle.supply(posts(0, 4));
    assert_eq!(block_on(fetch).unwrap().len(), 4);
}

#[test]
fn destroy_ignores_outstanding_settlement() {
    init_tracing();
    let cache = CollectionCache::default();
    let getters = ParkedGetters::new();

    let fetch = cache.get_with(&first_page(), getters.getter());
    cache.destroy();

    assert_eq!(cache.pending_fetches(), 0);
    assert_eq!(block_on(fetch), Err(CacheError::Abandoned));

    getters.take().supply(posts(0, 3));

    assert!(cache.list().is_empty());
    assert_eq!(cache.view_len(&first_page()), 0);
}

#[test]
fn stale_settlement_does_not_touch_new_fetch() {
    let cache = CollectionCache::default();
    let getters = ParkedGetters::new();

    let _abandoned = cache.get_with(&first_page(), getters.getter());
    cache.destroy();
    let fresh = cache.get_with(&first_page(), getters.getter());
    assert_eq!(getters.calls(), 2);

    let stale = getters.take();
    let current = getters.take();

    stale.supply(posts(100, 3));
    assert_eq!(cache.pending_fetches(), 1);

    current.supply(posts(0, 3));
    assert_eq!(ids(&block_on(fresh).unwrap())[0], Some("post-0".to_string()));
}
