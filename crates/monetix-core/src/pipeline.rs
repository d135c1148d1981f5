//! Paced pagination and batched lookups
//!
//! Both helpers are generic over the fetch/lookup future so the client can
//! plug in HTTP calls while tests drive them with plain closures.

use crate::error::Result;
use futures::future::join_all;
use std::future::Future;
use std::time::Duration;

/// One page of results plus the cursor to the next page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_page_token: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next_page_token: Option<String>) -> Self {
        Self {
            items,
            next_page_token,
        }
    }

    pub fn last(items: Vec<T>) -> Self {
        Self::new(items, None)
    }
}

pub(crate) async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// Follow a cursor chain until a page comes back without a token
///
/// The first call gets `None`. An empty token ends the chain just like a
/// missing one. `page_delay` is only awaited when another page follows, and
/// the first error aborts the whole walk.
pub async fn collect_pages<T, F, Fut>(mut fetch_page: F, page_delay: Duration) -> Result<Vec<T>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let mut all = Vec::new();
    let mut token: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = fetch_page(token.take()).await?;
        pages += 1;
        all.extend(page.items);

        token = page.next_page_token.filter(|t| !t.is_empty());
        if token.is_none() {
            break;
        }
        pause(page_delay).await;
    }

    tracing::debug!("Collected {} items over {} pages", all.len(), pages);
    Ok(all)
}

/// Run `lookup` for every key, at most `batch_size` at a time
///
/// A batch is fully settled before the next one starts, with `batch_delay`
/// in between (never after the last batch). The output is index-aligned with
/// `keys`.
pub async fn lookup_in_batches<K, V, F, Fut>(
    keys: &[K],
    batch_size: usize,
    batch_delay: Duration,
    lookup: F,
) -> Vec<Option<V>>
where
    K: Clone,
    F: Fn(K) -> Fut,
    Fut: Future<Output = Option<V>>,
{
    let batch_size = batch_size.max(1);
    let mut results = Vec::with_capacity(keys.len());

    let mut batches = keys.chunks(batch_size).peekable();
    while let Some(batch) = batches.next() {
        let settled = join_all(batch.iter().cloned().map(&lookup)).await;
        results.extend(settled);

        if batches.peek().is_some() {
            pause(batch_delay).await;
        }
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MonetixError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_collect_pages_follows_token_chain() {
        let seen = Arc::new(Mutex::new(Vec::<Option<String>>::new()));
        let seen_in_fetch = seen.clone();

        let items = collect_pages(
            move |token: Option<String>| {
                seen_in_fetch.lock().unwrap().push(token.clone());
                async move {
                    Ok(match token.as_deref() {
                        None => Page::new(vec![1, 2], Some("t1".to_string())),
                        Some("t1") => Page::new(vec![3], Some("t2".to_string())),
                        Some("t2") => Page::last(vec![4, 5]),
                        Some(other) => panic!("unexpected token {other}"),
                    })
                }
            },
            Duration::ZERO,
        )
        .await
        .unwrap();

        assert_eq!(items, vec![1, 2, 3, 4, 5]);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![None, Some("t1".to_string()), Some("t2".to_string())]
        );
    }

    #[tokio::test]
    async fn test_empty_token_ends_chain() {
        let calls = AtomicUsize::new(0);
        let items = collect_pages(
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(Page::new(vec!["only"], Some(String::new()))) }
            },
            Duration::ZERO,
        )
        .await
        .unwrap();

        assert_eq!(items, vec!["only"]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_page_error_aborts() {
        let result: Result<Vec<u32>> = collect_pages(
            |token: Option<String>| async move {
                match token {
                    None => Ok(Page::new(vec![1], Some("next".to_string()))),
                    Some(_) => Err(MonetixError::Upstream {
                        status: 429,
                        body: "slow down".to_string(),
                    }),
                }
            },
            Duration::ZERO,
        )
        .await;

        assert_eq!(result.unwrap_err().status(), Some(429));
    }

    #[tokio::test(start_paused = true)]
    async fn test_page_delay_only_between_pages() {
        let start = tokio::time::Instant::now();
        collect_pages(
            |token: Option<String>| async move {
                Ok(match token {
                    None => Page::new(vec![0u8], Some("a".to_string())),
                    Some(_) => Page::last(vec![1u8]),
                })
            },
            Duration::from_millis(250),
        )
        .await
        .unwrap();

        assert_eq!(start.elapsed(), Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_in_batches_bounds_concurrency() {
        let in_flight = AtomicUsize::new(0);
        let max_in_flight = AtomicUsize::new(0);
        let calls = AtomicUsize::new(0);
        let keys: Vec<usize> = (0..12).collect();

        let results = lookup_in_batches(&keys, 5, Duration::from_millis(200), |k| {
            let in_flight = &in_flight;
            let max_in_flight = &max_in_flight;
            let calls = &calls;
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_in_flight.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Some(k * 10)
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 12);
        assert_eq!(max_in_flight.load(Ordering::SeqCst), 5);
        let expected: Vec<Option<usize>> = keys.iter().map(|k| Some(k * 10)).collect();
        assert_eq!(results, expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_delay_between_batches_only() {
        let start = tokio::time::Instant::now();
        let keys: Vec<u32> = (0..11).collect();

        // ceil(11 / 5) = 3 batches, so two gaps
        lookup_in_batches(&keys, 5, Duration::from_millis(200), |k| async move { Some(k) }).await;

        assert_eq!(start.elapsed(), Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_missing_values_stay_in_place() {
        let keys = vec!["a", "b", "c", "d"];
        let results = lookup_in_batches(&keys, 5, Duration::ZERO, |k| async move {
            (k != "c").then(|| k.to_uppercase())
        })
        .await;

        assert_eq!(
            results,
            vec![
                Some("A".to_string()),
                Some("B".to_string()),
                None,
                Some("D".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_zero_batch_size_is_sequential() {
        let keys = vec![1, 2, 3];
        let results = lookup_in_batches(&keys, 0, Duration::ZERO, |k| async move { Some(k) }).await;
        assert_eq!(results, vec![Some(1), Some(2), Some(3)]);
    }

    #[tokio::test]
    async fn test_empty_keys() {
        let keys: Vec<u8> = Vec::new();
        let results = lookup_in_batches(&keys, 5, Duration::from_secs(1), |k| async move { Some(k) }).await;
        assert!(results.is_empty());
    }
}
