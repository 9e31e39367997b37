//! Shared doubles for session-level tests

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use marketpulse::models::bar::{Bar, Timeframe};
use marketpulse::models::signal::StreamUpdate;
use marketpulse::services::{BarSource, BroadcastClosed, Broadcaster, FetchError};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// Build bars with one-minute spacing starting at `start_minute`.
pub fn minute_bars(start_minute: i64, closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            Bar::new(
                Utc.timestamp_opt((start_minute + i as i64) * 60, 0).unwrap(),
                close,
                close + 0.1,
                close - 0.1,
                close,
                1000.0,
            )
        })
        .collect()
}

/// Per-symbol scripted source: each fetch pops the next scripted response;
/// an exhausted script keeps answering with an empty batch.
pub struct ScriptedSource {
    scripts: Mutex<HashMap<String, VecDeque<Result<Vec<Bar>, FetchError>>>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
        }
    }

    pub fn script(self, symbol: &str, responses: Vec<Result<Vec<Bar>, FetchError>>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(symbol.to_string(), responses.into());
        self
    }
}

#[async_trait]
impl BarSource for ScriptedSource {
    async fn fetch(
        &self,
        symbol: &str,
        _timeframe: Timeframe,
        _count: usize,
    ) -> Result<Vec<Bar>, FetchError> {
        let mut scripts = self.scripts.lock().unwrap();
        match scripts.get_mut(symbol).and_then(|queue| queue.pop_front()) {
            Some(response) => response,
            None => Ok(Vec::new()),
        }
    }
}

/// Broadcaster that records every emission.
#[derive(Clone, Default)]
pub struct CollectingBroadcaster {
    updates: Arc<Mutex<Vec<StreamUpdate>>>,
}

impl CollectingBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> Vec<StreamUpdate> {
        self.updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl Broadcaster for CollectingBroadcaster {
    async fn emit(&mut self, update: StreamUpdate) -> Result<(), BroadcastClosed> {
        self.updates.lock().unwrap().push(update);
        Ok(())
    }
}
