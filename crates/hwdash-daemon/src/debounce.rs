//! Latest-value sampling channel.
//!
//! The writer may set the input as often as it likes; a sampler task
//! republishes the most recent input once per period, and only if a new value
//! arrived since the previous boundary.

use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Write side. Setting never blocks; an unsampled value is overwritten.
#[derive(Debug)]
pub struct DebounceInput<T> {
    tx: watch::Sender<Option<T>>,
}

impl<T> DebounceInput<T> {
    pub fn set(&self, value: T) {
        self.tx.send_replace(Some(value));
    }
}

/// Read side. Cheap to clone; every clone observes the same published value.
#[derive(Debug, Clone)]
pub struct DebounceOutput<T> {
    rx: watch::Receiver<Option<T>>,
}

impl<T: Clone> DebounceOutput<T> {
    /// The last published value, `None` before the first publish.
    pub fn get(&self) -> Option<T> {
        self.rx.borrow().clone()
    }

    /// Waits for the next publish. Returns false once the sampler has stopped.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

/// Creates a channel and spawns its sampler on the current runtime.
///
/// An `initial` value is published at the first boundary. The sampler stops
/// when `cancel` fires or the input is dropped.
pub fn channel<T>(
    initial: Option<T>,
    period: Duration,
    cancel: CancellationToken,
) -> (DebounceInput<T>, DebounceOutput<T>)
where
    T: Clone + Send + Sync + 'static,
{
    let (input_tx, input_rx) = watch::channel(None);
    if let Some(value) = initial {
        input_tx.send_replace(Some(value));
    }
    let (output_tx, output_rx) = watch::channel(None);

    tokio::spawn(sample(input_rx, output_tx, period, cancel));

    (
        DebounceInput { tx: input_tx },
        DebounceOutput { rx: output_rx },
    )
}

async fn sample<T: Clone>(
    mut input: watch::Receiver<Option<T>>,
    output: watch::Sender<Option<T>>,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        match input.has_changed() {
            Ok(true) => {
                let value = input.borrow_and_update().clone();
                output.send_replace(value);
            }
            Ok(false) => {}
            // Input dropped.
            Err(_) => break,
        }
    }
    trace!("Debounce sampler stopped");
}
