// src/rate_limit.rs
//
// Fixed-window request counter, in-memory and per-process. Counters reset at
// fixed wall-clock boundaries, so bursts across a window edge are admitted.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;

#[derive(Debug, Clone, Copy)]
struct WindowEntry {
    count: u32,
    reset_at_ms: i64,
}

#[derive(Debug)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_at_ms: i64,
}

#[derive(Clone, Default)]
pub struct RateLimiter {
    entries: Arc<Mutex<HashMap<String, WindowEntry>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&self, identifier: &str, max_requests: u32, window_ms: i64) -> RateLimitDecision {
        self.check_at(identifier, max_requests, window_ms, Utc::now().timestamp_millis())
    }

    fn check_at(
        &self,
        identifier: &str,
        max_requests: u32,
        window_ms: i64,
        now_ms: i64,
    ) -> RateLimitDecision {
        let mut entries = self.entries.lock().unwrap();
        let entry = entries
            .entry(identifier.to_string())
            .or_insert(WindowEntry { count: 0, reset_at_ms: now_ms + window_ms });

        if now_ms > entry.reset_at_ms {
            entry.count = 0;
            entry.reset_at_ms = now_ms + window_ms;
        }

        let allowed = entry.count < max_requests;
        if allowed {
            entry.count += 1;
        }

        RateLimitDecision {
            allowed,
            remaining: max_requests.saturating_sub(entry.count),
            reset_at_ms: entry.reset_at_ms,
        }
    }

    /// Drops expired windows. Called from a periodic task, not from request
    /// traffic.
    pub fn sweep(&self) {
        let now_ms = Utc::now().timestamp_millis();
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|_, e| now_ms <= e.reset_at_ms);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
