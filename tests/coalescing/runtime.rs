//! Getters that settle from spawned tasks, the way a network client would.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use collection_cache::{CacheError, CollectionCache, Options, Settle};
use futures::future::join_all;
use serde_json::json;

use crate::support::{ids, posts};

fn spawned_getter(calls: Arc<AtomicUsize>, delay: Duration) -> impl FnOnce(Settle) {
    move |settle| {
        calls.fetch_add(1, Ordering::SeqCst);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let range = settle.range();
            settle.supply(posts(range.skip, range.limit.unwrap_or(5)));
        });
    }
}

#[tokio::test]
async fn concurrent_callers_share_a_spawned_fetch() {
    let cache = CollectionCache::default();
    let calls = Arc::new(AtomicUsize::new(0));
    let options = Options::new().with("sort", "date").skip(0).limit(4);

    let fetches = (0..8).map(|_| {
        cache.get_with(
            &options,
            spawned_getter(Arc::clone(&calls), Duration::from_millis(20)),
        )
    });
    let pages = join_all(fetches).await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    for page in pages {
        assert_eq!(ids(&page.unwrap()).len(), 4);
    }
    assert_eq!(cache.pending_fetches(), 0);
    assert_eq!(cache.list().len(), 4);
}

#[tokio::test]
async fn callers_across_tasks_coalesce() {
    let cache = CollectionCache::default();
    let calls = Arc::new(AtomicUsize::new(0));
    let options = Options::new().with("author", "ada").skip(10).limit(2);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let cache = cache.clone();
            let options = options.clone();
            let calls = Arc::clone(&calls);
            tokio::spawn(async move {
                cache
                    .get_with(&options, spawned_getter(calls, Duration::from_millis(50)))
                    .await
            })
        })
        .collect();

    for handle in handles {
        let page = handle.await.unwrap().unwrap();
        assert_eq!(
            ids(&page),
            vec![Some("post-10".to_string()), Some("post-11".to_string())]
        );
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failure_from_a_task_reaches_every_caller() {
    let cache = CollectionCache::default();
    let options = Options::new().skip(0).limit(3);

    let opener = cache.get_with(&options, |settle| {
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            settle.fail("connection reset");
        });
    });
    let follower = cache.get(&options);

    let results = join_all([opener, follower]).await;
    for result in results {
        assert_eq!(
            result,
            Err(CacheError::GetterFailure("connection reset".into()))
        );
    }
}

#[tokio::test]
async fn update_during_fetch_is_visible_after_supply() {
    let cache = CollectionCache::default();
    let options = Options::new().skip(0).limit(1);

    let (tx, rx) = tokio::sync::oneshot::channel::<Settle>();
    let fetch = cache.get_with(&options, move |settle| {
        let _ = tx.send(settle);
    });

    let settle = rx.await.unwrap();
    cache.update("post-0", json!({ "title": "Edited" })).unwrap();
    settle.supply(json!([{ "id": "post-0", "title": "Fetched", "body": "text" }]));

    let page = fetch.await.unwrap();
    let item = page[0].as_ref().unwrap();
    assert_eq!(item["title"], json!("Fetched"));
    assert_eq!(item["body"], json!("text"));
}
