//! Latest-wins recomputation.
//!
//! A view (for example a live report) is recomputed whenever its inputs
//! change. Triggers are coalesced through a `tokio::sync::watch` channel,
//! and a trigger that arrives while a computation is in flight drops that
//! computation and starts over. Only results computed against the newest
//! trigger are delivered, so a stale result can never overwrite a fresh one.

use std::future::Future;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Sending half of a recompute loop. Each [`fire`](Self::fire) bumps a
/// generation counter; bursts collapse into one pending generation.
#[derive(Debug)]
pub struct RecomputeTrigger {
    tx: watch::Sender<u64>,
}

impl RecomputeTrigger {
    pub fn new() -> (Self, watch::Receiver<u64>) {
        let (tx, rx) = watch::channel(0);
        (Self { tx }, rx)
    }

    pub fn fire(&self) {
        self.tx.send_modify(|generation| *generation = generation.wrapping_add(1));
    }
}

/// Counters returned when a recompute loop exits.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RecomputeStats {
    pub completed: u64,
    pub superseded: u64,
}

/// Run a latest-wins recompute loop until `cancel` fires, the trigger is
/// dropped, or `deliver` returns `false`.
///
/// `compute` receives the generation it is computing for. `deliver` is
/// only called with results whose generation is still the newest.
pub async fn run_latest_wins<T, F, Fut, D>(
    mut trigger: watch::Receiver<u64>,
    cancel: CancellationToken,
    mut compute: F,
    mut deliver: D,
) -> RecomputeStats
where
    F: FnMut(u64) -> Fut,
    Fut: Future<Output = T>,
    D: FnMut(T) -> bool,
{
    let mut stats = RecomputeStats::default();

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return stats,
            changed = trigger.changed() => {
                if changed.is_err() {
                    return stats;
                }
            }
        }

        loop {
            let generation = *trigger.borrow_and_update();
            let computation = compute(generation);

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return stats,
                changed = trigger.changed() => {
                    if changed.is_err() {
                        return stats;
                    }
                    stats.superseded += 1;
                    tracing::debug!(generation, "Recompute superseded by newer trigger");
                }
                output = computation => {
                    stats.completed += 1;
                    if !deliver(output) {
                        return stats;
                    }
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::mpsc;
    use tokio::time::sleep;

    use super::*;

    fn spawn_loop(
        compute_for: Duration,
    ) -> (
        RecomputeTrigger,
        mpsc::UnboundedReceiver<u64>,
        CancellationToken,
        tokio::task::JoinHandle<RecomputeStats>,
    ) {
        let (trigger, rx) = RecomputeTrigger::new();
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_latest_wins(
            rx,
            cancel.clone(),
            move |generation| async move {
                sleep(compute_for).await;
                generation
            },
            move |value| out_tx.send(value).is_ok(),
        ));
        (trigger, out_rx, cancel, handle)
    }

    #[tokio::test(start_paused = true)]
    async fn newer_trigger_supersedes_in_flight_compute() {
        let (trigger, mut out, cancel, handle) = spawn_loop(Duration::from_millis(100));

        trigger.fire();
        sleep(Duration::from_millis(50)).await;
        trigger.fire();

        assert_eq!(out.recv().await, Some(2));

        cancel.cancel();
        let stats = handle.await.unwrap();
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.superseded, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_triggers_is_coalesced() {
        let (trigger, mut out, cancel, handle) = spawn_loop(Duration::from_millis(10));

        trigger.fire();
        trigger.fire();
        trigger.fire();

        assert_eq!(out.recv().await, Some(3));

        cancel.cancel();
        let stats = handle.await.unwrap();
        assert_eq!(stats.completed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn sequential_triggers_each_deliver() {
        let (trigger, mut out, cancel, handle) = spawn_loop(Duration::from_millis(10));

        trigger.fire();
        assert_eq!(out.recv().await, Some(1));
        trigger.fire();
        assert_eq!(out.recv().await, Some(2));

        cancel.cancel();
        assert_eq!(handle.await.unwrap().completed, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_trigger_stops_loop() {
        let (trigger, _out, _cancel, handle) = spawn_loop(Duration::from_millis(10));
        drop(trigger);
        let stats = handle.await.unwrap();
        assert_eq!(stats, RecomputeStats::default());
    }
}
