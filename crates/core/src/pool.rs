//! Bounded worker pool for fan-out over upstream calls.
//!
//! A fixed number of workers pull items from one shared queue until it is
//! empty. Popping happens under a lock so each item is handed out exactly
//! once. Results come back in input order regardless of completion order.

use std::collections::VecDeque;
use std::future::Future;

use futures::future::join_all;
use tokio::sync::Mutex;

/// Run `f` over every item with at most `workers` calls in flight.
pub async fn run_bounded<T, R, F, Fut>(items: Vec<T>, workers: usize, f: F) -> Vec<R>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = R>,
{
    let total = items.len();
    if total == 0 {
        return Vec::new();
    }

    let queue = Mutex::new(items.into_iter().enumerate().collect::<VecDeque<_>>());
    let results = Mutex::new(Vec::with_capacity(total));
    let workers = workers.clamp(1, total);

    join_all((0..workers).map(|_| drain(&queue, &results, &f))).await;

    let mut results = results.into_inner();
    results.sort_by_key(|(index, _)| *index);
    results.into_iter().map(|(_, r)| r).collect()
}

async fn drain<T, R, F, Fut>(
    queue: &Mutex<VecDeque<(usize, T)>>,
    results: &Mutex<Vec<(usize, R)>>,
    f: &F,
) where
    F: Fn(T) -> Fut,
    Fut: Future<Output = R>,
{
    loop {
        let next = queue.lock().await.pop_front();
        let Some((index, item)) = next else {
            break;
        };
        let result = f(item).await;
        results.lock().await.push((index, result));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_results_keep_input_order() {
        let items: Vec<u64> = (0..20).collect();
        let out = run_bounded(items, 4, |n| async move {
            // Later items finish first.
            tokio::time::sleep(Duration::from_millis(20 - n)).await;
            n * 2
        })
        .await;

        assert_eq!(out, (0..20).map(|n| n * 2).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let out = run_bounded((0..16).collect::<Vec<u32>>(), 3, |n| {
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                n
            }
        })
        .await;

        assert_eq!(out.len(), 16);
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_each_item_processed_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let out = run_bounded(vec!["a", "b", "c"], 8, |s| {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                s.to_uppercase()
            }
        })
        .await;

        assert_eq!(out, vec!["A", "B", "C"]);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let out: Vec<u32> = run_bounded(Vec::<u32>::new(), 4, |n| async move { n }).await;
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_zero_workers_still_runs() {
        let out = run_bounded(vec![1, 2], 0, |n| async move { n + 1 }).await;
        assert_eq!(out, vec![2, 3]);
    }
}
