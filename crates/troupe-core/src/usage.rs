//! LLM usage accounting.
//!
//! [`UsageTracker`] is an explicitly constructed object - there is no
//! process-wide singleton. The orchestrator scopes one tracker per request
//! and merges summaries at its boundary, so concurrent requests never
//! interfere. Call and token totals are kept in atomics so a shared tracker
//! also stays consistent under concurrent recording.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tracing::debug;

use crate::llm::TokenUsage;
use crate::pricing;
use crate::role::AgentRole;

/// One recorded LLM call, attributable to an agent and a model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    pub timestamp: DateTime<Utc>,
    pub agent: AgentRole,
    pub model: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub cost: f64,
}

impl UsageRecord {
    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// Aggregate of calls, tokens, and cost for one breakdown key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageBucket {
    pub calls: u64,
    pub tokens: u64,
    pub cost: f64,
}

impl UsageBucket {
    fn add(&mut self, record: &UsageRecord) {
        self.calls += 1;
        self.tokens += record.total_tokens();
        self.cost += record.cost;
    }

    fn merge(&mut self, other: &UsageBucket) {
        self.calls += other.calls;
        self.tokens += other.tokens;
        self.cost += other.cost;
    }
}

/// Snapshot of accumulated usage since the last reset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageSummary {
    pub total_calls: u64,
    pub total_tokens: u64,
    pub total_cost: f64,
    /// 0.0 when no calls were recorded
    pub average_tokens_per_call: f64,
    pub by_agent: BTreeMap<AgentRole, UsageBucket>,
    pub by_model: BTreeMap<String, UsageBucket>,
}

impl UsageSummary {
    /// Summarize a batch of records.
    pub fn from_records(records: &[UsageRecord]) -> Self {
        let mut summary = UsageSummary::default();
        for record in records {
            summary.total_calls += 1;
            summary.total_tokens += record.total_tokens();
            summary.total_cost += record.cost;
            summary.by_agent.entry(record.agent).or_default().add(record);
            summary
                .by_model
                .entry(record.model.clone())
                .or_default()
                .add(record);
        }
        summary.average_tokens_per_call = if summary.total_calls == 0 {
            0.0
        } else {
            summary.total_tokens as f64 / summary.total_calls as f64
        };
        summary
    }

    /// Fold another summary into this one, bucket-wise.
    pub fn merge(&mut self, other: &UsageSummary) {
        self.total_calls += other.total_calls;
        self.total_tokens += other.total_tokens;
        self.total_cost += other.total_cost;
        for (agent, bucket) in &other.by_agent {
            self.by_agent.entry(*agent).or_default().merge(bucket);
        }
        for (model, bucket) in &other.by_model {
            self.by_model
                .entry(model.clone())
                .or_default()
                .merge(bucket);
        }
        self.average_tokens_per_call = if self.total_calls == 0 {
            0.0
        } else {
            self.total_tokens as f64 / self.total_calls as f64
        };
    }
}

/// Accumulates per-call usage, attributable to an agent and a model.
#[derive(Debug, Default)]
pub struct UsageTracker {
    calls: AtomicU64,
    tokens: AtomicU64,
    records: Mutex<Vec<UsageRecord>>,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a pre-built usage event.
    pub fn record(&self, record: UsageRecord) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.tokens.fetch_add(record.total_tokens(), Ordering::Relaxed);
        debug!(
            agent = %record.agent,
            model = %record.model,
            tokens = record.total_tokens(),
            cost = record.cost,
            "usage_recorded"
        );
        self.records
            .lock()
            .expect("usage records lock poisoned")
            .push(record);
    }

    /// Track one LLM call, computing cost from the pricing table.
    pub fn track(&self, agent: AgentRole, model: &str, usage: TokenUsage) -> UsageRecord {
        let record = UsageRecord {
            timestamp: Utc::now(),
            agent,
            model: model.to_string(),
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            cost: pricing::cost_for(model, usage.prompt_tokens, usage.completion_tokens),
        };
        self.record(record.clone());
        record
    }

    /// Bind an agent attribution for subsequent tracking calls.
    pub fn scope(&self, agent: AgentRole) -> UsageScope<'_> {
        UsageScope {
            tracker: self,
            agent,
        }
    }

    /// Total recorded calls since the last reset.
    pub fn total_calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    /// Total recorded tokens since the last reset.
    pub fn total_tokens(&self) -> u64 {
        self.tokens.load(Ordering::Relaxed)
    }

    /// Clear all accumulated state.
    ///
    /// Callers own the measurement window: reset between logically
    /// independent runs when sharing a tracker.
    pub fn reset(&self) {
        self.records
            .lock()
            .expect("usage records lock poisoned")
            .clear();
        self.calls.store(0, Ordering::Relaxed);
        self.tokens.store(0, Ordering::Relaxed);
        debug!("usage_tracker_reset");
    }

    /// All records since the last reset.
    pub fn records(&self) -> Vec<UsageRecord> {
        self.records
            .lock()
            .expect("usage records lock poisoned")
            .clone()
    }

    /// Summarize accumulated usage with by-agent and by-model breakdowns.
    pub fn get_summary(&self) -> UsageSummary {
        let records = self.records.lock().expect("usage records lock poisoned");
        UsageSummary::from_records(&records)
    }
}

/// A tracker handle with an agent attribution bound in.
///
/// Replaces a mutable "current agent" context: instrumentation at the call
/// site receives the scope explicitly instead of reading shared state.
#[derive(Clone, Copy)]
pub struct UsageScope<'a> {
    tracker: &'a UsageTracker,
    agent: AgentRole,
}

impl UsageScope<'_> {
    /// Track one LLM call attributed to the scoped agent.
    pub fn track(&self, model: &str, usage: TokenUsage) -> UsageRecord {
        self.tracker.track(self.agent, model, usage)
    }

    pub fn agent(&self) -> AgentRole {
        self.agent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_totals_match_recorded_events() {
        let tracker = UsageTracker::new();
        tracker.track(AgentRole::Planner, "gpt-4", TokenUsage::new(100, 50));
        tracker.track(AgentRole::Coder, "gpt-4", TokenUsage::new(200, 100));
        tracker.track(AgentRole::Coder, "gpt-3.5-turbo", TokenUsage::new(10, 10));

        let summary = tracker.get_summary();
        assert_eq!(summary.total_calls, 3);
        assert_eq!(summary.total_tokens, 470);
        assert_eq!(summary.by_agent[&AgentRole::Coder].calls, 2);
        assert_eq!(summary.by_model["gpt-4"].tokens, 450);
        assert!((summary.average_tokens_per_call - 470.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn empty_tracker_reports_zero_average() {
        let summary = UsageTracker::new().get_summary();
        assert_eq!(summary.total_calls, 0);
        assert_eq!(summary.average_tokens_per_call, 0.0);
    }

    #[test]
    fn reset_clears_all_state() {
        let tracker = UsageTracker::new();
        tracker.track(AgentRole::Tester, "gpt-4", TokenUsage::new(5, 5));
        tracker.reset();

        assert_eq!(tracker.total_calls(), 0);
        assert_eq!(tracker.total_tokens(), 0);
        assert!(tracker.records().is_empty());
    }

    #[test]
    fn scope_attributes_to_bound_agent() {
        let tracker = UsageTracker::new();
        let scope = tracker.scope(AgentRole::Reviewer);
        scope.track("gpt-4", TokenUsage::new(10, 20));

        let summary = tracker.get_summary();
        assert_eq!(summary.by_agent[&AgentRole::Reviewer].tokens, 30);
    }

    #[test]
    fn summaries_merge_bucketwise() {
        let a = UsageTracker::new();
        a.track(AgentRole::Planner, "gpt-4", TokenUsage::new(100, 0));
        let b = UsageTracker::new();
        b.track(AgentRole::Planner, "gpt-4", TokenUsage::new(0, 100));
        b.track(AgentRole::Coder, "gpt-3.5-turbo", TokenUsage::new(50, 50));

        let mut merged = a.get_summary();
        merged.merge(&b.get_summary());

        assert_eq!(merged.total_calls, 3);
        assert_eq!(merged.total_tokens, 300);
        assert_eq!(merged.by_agent[&AgentRole::Planner].calls, 2);
        assert_eq!(merged.by_agent[&AgentRole::Planner].tokens, 200);
        assert_eq!(merged.average_tokens_per_call, 100.0);
    }

    #[test]
    fn concurrent_tracking_keeps_totals_consistent() {
        use std::sync::Arc;
        let tracker = Arc::new(UsageTracker::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let t = Arc::clone(&tracker);
            handles.push(std::thread::spawn(move || {
                for _ in 0..100 {
                    t.track(AgentRole::Coder, "gpt-4", TokenUsage::new(1, 1));
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(tracker.total_calls(), 800);
        assert_eq!(tracker.total_tokens(), 1600);
        assert_eq!(tracker.get_summary().total_calls, 800);
    }
}
