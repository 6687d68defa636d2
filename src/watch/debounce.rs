// src/watch/debounce.rs

//! Settling raw filesystem events into batches.

use std::collections::BTreeSet;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

/// Collect changed paths until `window` passes without a new one, then hand
/// the whole settled batch to `on_batch`.
///
/// Every event restarts the quiet period, so a burst of saves becomes one
/// batch. Duplicate paths within a batch are collapsed. When the channel
/// closes, any pending batch is flushed before returning. `on_batch`
/// returning `false` stops the loop.
pub async fn run_debounced<F, Fut>(
    mut rx: mpsc::UnboundedReceiver<PathBuf>,
    window: Duration,
    mut on_batch: F,
) where
    F: FnMut(Vec<PathBuf>) -> Fut,
    Fut: Future<Output = bool>,
{
    let mut pending: BTreeSet<PathBuf> = BTreeSet::new();
    let mut deadline = Instant::now();

    loop {
        if pending.is_empty() {
            match rx.recv().await {
                Some(path) => {
                    pending.insert(path);
                    deadline = Instant::now() + window;
                }
                None => break,
            }
            continue;
        }

        tokio::select! {
            maybe_path = rx.recv() => match maybe_path {
                Some(path) => {
                    pending.insert(path);
                    deadline = Instant::now() + window;
                }
                None => break,
            },
            _ = sleep_until(deadline) => {
                let batch: Vec<PathBuf> = std::mem::take(&mut pending).into_iter().collect();
                debug!(paths = batch.len(), "debounce window elapsed; flushing batch");
                if !on_batch(batch).await {
                    return;
                }
            }
        }
    }

    if !pending.is_empty() {
        let batch: Vec<PathBuf> = pending.into_iter().collect();
        debug!(paths = batch.len(), "event channel closed; flushing final batch");
        on_batch(batch).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    type Batches = Arc<Mutex<Vec<Vec<PathBuf>>>>;

    fn recorder(seen: &Batches) -> impl FnMut(Vec<PathBuf>) -> std::future::Ready<bool> + use<> {
        let seen = Arc::clone(seen);
        move |batch| {
            seen.lock().unwrap().push(batch);
            std::future::ready(true)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn burst_becomes_one_batch() {
        let (tx, rx) = mpsc::unbounded_channel();
        let seen: Batches = Arc::default();
        let handle = tokio::spawn(run_debounced(rx, Duration::from_millis(100), recorder(&seen)));

        for name in ["a.scss", "b.scss", "a.scss"] {
            tx.send(PathBuf::from(name)).unwrap();
            tokio::time::sleep(Duration::from_millis(30)).await;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;

        {
            let batches = seen.lock().unwrap();
            assert_eq!(batches.len(), 1);
            assert_eq!(batches[0], vec![PathBuf::from("a.scss"), PathBuf::from("b.scss")]);
        }

        drop(tx);
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn separated_events_make_separate_batches() {
        let (tx, rx) = mpsc::unbounded_channel();
        let seen: Batches = Arc::default();
        let handle = tokio::spawn(run_debounced(rx, Duration::from_millis(50), recorder(&seen)));

        tx.send(PathBuf::from("index.html")).unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;
        tx.send(PathBuf::from("index.html")).unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;

        assert_eq!(seen.lock().unwrap().len(), 2);
        drop(tx);
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn pending_batch_is_flushed_on_close() {
        let (tx, rx) = mpsc::unbounded_channel();
        let seen: Batches = Arc::default();

        tx.send(PathBuf::from("js/script.js")).unwrap();
        drop(tx);
        run_debounced(rx, Duration::from_secs(10), recorder(&seen)).await;

        assert_eq!(seen.lock().unwrap().len(), 1);
    }
}
