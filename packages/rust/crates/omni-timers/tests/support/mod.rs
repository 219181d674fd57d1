#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use omni_timers::{CollectingErrorSink, JobCallback, TimerClient, TimerConfig, callback_fn};

pub fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

/// Client that re-checks quickly so wall-clock tests settle fast.
pub fn client() -> TimerClient {
    TimerClient::new(TimerConfig::default().with_poll_interval(ms(10)))
}

pub fn collecting_client() -> (TimerClient, Arc<CollectingErrorSink>) {
    let sink = Arc::new(CollectingErrorSink::new());
    let client = TimerClient::with_error_sink(
        TimerConfig::default().with_poll_interval(ms(10)),
        sink.clone(),
    );
    (client, sink)
}

/// Shared log of callback runs, in execution order.
#[derive(Clone, Default)]
pub struct Recorder {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn push(&self, entry: impl Into<String>) {
        self.entries
            .lock()
            .expect("recorder lock poisoned")
            .push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().expect("recorder lock poisoned").clone()
    }

    /// Callback that appends `entry` each time it runs.
    pub fn callback(&self, entry: &str) -> Arc<dyn JobCallback> {
        let recorder = self.clone();
        let entry = entry.to_string();
        callback_fn(move |_ctx| {
            let recorder = recorder.clone();
            let entry = entry.clone();
            async move {
                recorder.push(entry);
                anyhow::Ok(())
            }
        })
    }
}

/// Callback that bumps `counter` each time it runs.
pub fn counting(counter: &Arc<AtomicUsize>) -> Arc<dyn JobCallback> {
    let counter = Arc::clone(counter);
    callback_fn(move |_ctx| {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            anyhow::Ok(())
        }
    })
}
