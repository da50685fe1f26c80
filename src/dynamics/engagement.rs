//! Engagement bookkeeping for tracked objects.
//!
//! An engagement exists only once started; ending it fixes its duration.
//! Ended engagements stay pending until the next snapshot of their object
//! reports them, active ones are reported on every snapshot.

use std::collections::HashMap;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngagementPhase {
    Active,
    Ended { duration: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngagementRecord {
    pub object_id: String,
    pub name: String,
    pub instance_id: Option<String>,
    /// Occurrence counter per (object, name), starting at 1.
    pub number: u32,
    pub start_time: f64,
    pub phase: EngagementPhase,
}

impl EngagementRecord {
    pub fn is_active(&self) -> bool {
        matches!(self.phase, EngagementPhase::Active)
    }

    /// Duration once ended; `None` while active.
    pub fn end_time(&self) -> Option<f64> {
        match self.phase {
            EngagementPhase::Active => None,
            EngagementPhase::Ended { duration } => Some(duration),
        }
    }

    fn finish(&mut self, now: f64) -> f64 {
        let duration = (now - self.start_time).max(0.0);
        self.phase = EngagementPhase::Ended { duration };
        duration
    }

    fn elapsed(&self, now: f64) -> f64 {
        match self.phase {
            EngagementPhase::Active => (now - self.start_time).max(0.0),
            EngagementPhase::Ended { duration } => duration,
        }
    }

    fn matches(&self, name: &str, instance_id: Option<&str>) -> bool {
        self.is_active()
            && self.name == name
            && instance_id.map_or(true, |id| self.instance_id.as_deref() == Some(id))
    }
}

/// How an `end` request was resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngagementEnd {
    /// A started engagement was found and closed.
    Closed { number: u32, duration: f64 },
    /// No started engagement matched; one was created and closed at once.
    SelfHealed { number: u32, duration: f64 },
}

impl EngagementEnd {
    pub fn number(&self) -> u32 {
        match self {
            EngagementEnd::Closed { number, .. } | EngagementEnd::SelfHealed { number, .. } => {
                *number
            }
        }
    }
}

/// Summary embedded in a dynamic object snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngagementSummary {
    pub engagementtype: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engagementparent: Option<String>,
    pub engagement_count: u32,
    pub engagement_time: f64,
}

#[derive(Debug, Default)]
pub struct EngagementBook {
    counters: HashMap<(String, String), u32>,
    /// Per object: active records plus ended ones not yet reported.
    pending: HashMap<String, Vec<EngagementRecord>>,
    history: HashMap<String, Vec<EngagementRecord>>,
}

impl EngagementBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, object_id: &str, name: &str, instance_id: Option<&str>, now: f64) -> u32 {
        let counter = self
            .counters
            .entry((object_id.to_string(), name.to_string()))
            .or_insert(0);
        *counter += 1;

        let record = EngagementRecord {
            object_id: object_id.to_string(),
            name: name.to_string(),
            instance_id: instance_id.map(str::to_string),
            number: *counter,
            start_time: now,
            phase: EngagementPhase::Active,
        };
        self.pending
            .entry(object_id.to_string())
            .or_default()
            .push(record.clone());
        self.history
            .entry(object_id.to_string())
            .or_default()
            .push(record);
        *counter
    }

    pub fn end(&mut self, object_id: &str, name: &str, instance_id: Option<&str>, now: f64) -> EngagementEnd {
        if let Some((number, duration)) = self.close_matching(object_id, name, instance_id, now) {
            return EngagementEnd::Closed { number, duration };
        }

        log::warn!(
            "engagement '{}' on object {} ended without a start; recording it as instantaneous",
            name,
            object_id
        );
        self.begin(object_id, name, instance_id, now);
        let (number, duration) = self
            .close_matching(object_id, name, instance_id, now)
            .unwrap_or((0, 0.0));
        EngagementEnd::SelfHealed { number, duration }
    }

    /// Close every active engagement on `object_id`; returns how many were closed.
    pub fn end_all(&mut self, object_id: &str, now: f64) -> usize {
        let Some(records) = self.pending.get_mut(object_id) else {
            return 0;
        };
        let mut closed = Vec::new();
        for record in records.iter_mut().filter(|r| r.is_active()) {
            let duration = record.finish(now);
            closed.push((record.name.clone(), record.number, duration));
        }
        for (name, number, duration) in &closed {
            self.mirror_to_history(object_id, name, *number, *duration);
        }
        closed.len()
    }

    /// Summaries for every pending engagement of `object_id`; ended ones are
    /// dropped afterwards, active ones kept for the next snapshot.
    pub fn summarize(&mut self, object_id: &str, now: f64) -> Vec<EngagementSummary> {
        let Some(records) = self.pending.get_mut(object_id) else {
            return Vec::new();
        };
        let summaries = records
            .iter()
            .map(|record| EngagementSummary {
                engagementtype: record.name.clone(),
                engagementparent: record.instance_id.clone(),
                engagement_count: record.number,
                engagement_time: record.elapsed(now),
            })
            .collect();
        records.retain(|record| record.is_active());
        summaries
    }

    pub fn pending(&self, object_id: &str) -> &[EngagementRecord] {
        self.pending.get(object_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn history(&self, object_id: &str) -> &[EngagementRecord] {
        self.history.get(object_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn clear(&mut self) {
        self.counters.clear();
        self.pending.clear();
        self.history.clear();
    }

    fn close_matching(
        &mut self,
        object_id: &str,
        name: &str,
        instance_id: Option<&str>,
        now: f64,
    ) -> Option<(u32, f64)> {
        let record = self
            .pending
            .get_mut(object_id)?
            .iter_mut()
            .find(|record| record.matches(name, instance_id))?;
        let duration = record.finish(now);
        let number = record.number;
        self.mirror_to_history(object_id, name, number, duration);
        Some((number, duration))
    }

    fn mirror_to_history(&mut self, object_id: &str, name: &str, number: u32, duration: f64) {
        if let Some(record) = self
            .history
            .get_mut(object_id)
            .and_then(|records| records.iter_mut().find(|r| r.name == name && r.number == number))
        {
            record.phase = EngagementPhase::Ended { duration };
        }
    }
}
