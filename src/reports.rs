//! Daily safety report
//!
//! The report covers the caller tenant's events for the current UTC day.
//! It is written by the LLM when one is reachable and otherwise rendered
//! locally from the same figures.

use crate::detections::DetectionEvent;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Figures for one tenant and one day
#[derive(Debug, Clone, PartialEq)]
pub struct DailyDigest {
    /// Tenant name
    pub customer_name: String,
    /// `YYYY-MM-DD`, UTC
    pub date: String,
    /// Today's events
    pub total: usize,
    /// Today's unresolved events
    pub unresolved: usize,
    /// Violation label -> count, alphabetical
    pub violations: BTreeMap<String, usize>,
    /// Camera -> count, alphabetical
    pub cameras: BTreeMap<String, usize>,
    /// Recognised people, deduplicated
    pub identified_people: Vec<String>,
}

impl DailyDigest {
    /// Digest of `events` that fall on `now`'s date
    pub fn build(customer_name: &str, events: &[DetectionEvent], now: DateTime<Utc>) -> Self {
        let today = now.date_naive();
        let todays: Vec<&DetectionEvent> = events.iter().filter(|e| e.timestamp.date_naive() == today).collect();

        let mut violations = BTreeMap::new();
        let mut cameras = BTreeMap::new();
        let mut identified_people = Vec::new();
        for event in &todays {
            *violations.entry(event.parsed_detections().violation_summary()).or_insert(0) += 1;
            *cameras.entry(event.camera_id.clone()).or_insert(0) += 1;
            if event.has_identified_person() && !identified_people.contains(&event.person_name) {
                identified_people.push(event.person_name.clone());
            }
        }

        Self {
            customer_name: customer_name.to_string(),
            date: today.format("%Y-%m-%d").to_string(),
            total: todays.len(),
            unresolved: todays.iter().filter(|e| !e.is_resolved).count(),
            violations,
            cameras,
            identified_people,
        }
    }

    /// Prompt asking the LLM to write the report
    pub fn prompt(&self) -> String {
        format!(
            "You are a Safety Officer writing the daily PPE compliance report for {} on {}. \
             Use Markdown with a short summary, a section on the main risks and a list of \
             recommended actions. English only.\n\n{}",
            self.customer_name,
            self.date,
            self.figures()
        )
    }

    /// Report rendered without the LLM
    pub fn to_markdown(&self) -> String {
        let mut out = format!("# Daily Safety Report: {}\n\n**Date:** {}\n\n", self.customer_name, self.date);
        if self.total == 0 {
            out.push_str("No violations were recorded today.\n");
            return out;
        }
        out.push_str(&self.figures());
        out
    }

    fn figures(&self) -> String {
        let mut out = format!(
            "- Total violations: {}\n- Unresolved: {}\n",
            self.total, self.unresolved
        );
        if !self.violations.is_empty() {
            out.push_str("\n## Violations\n");
            for (label, count) in &self.violations {
                out.push_str(&format!("- {}: {}\n", label, count));
            }
        }
        if !self.cameras.is_empty() {
            out.push_str("\n## Cameras\n");
            for (camera, count) in &self.cameras {
                out.push_str(&format!("- {}: {}\n", camera, count));
            }
        }
        if !self.identified_people.is_empty() {
            out.push_str(&format!("\n## Identified personnel\n- {}\n", self.identified_people.join("\n- ")));
        }
        out
    }
}
