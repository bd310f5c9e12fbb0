//! Execution Timeline
//!
//! Tracks when each flow step starts and ends for run reports and
//! Gantt-style charts.

use std::time::{Duration, Instant};

use crate::execution::Action;

/// Type of timeline event.
#[derive(Debug, Clone, PartialEq)]
pub enum EventType {
    /// Unit started executing
    Started,
    /// Unit finished and produced an action
    Completed(Action),
    /// Unit failed
    Failed,
}

/// A single event in the execution timeline.
#[derive(Debug, Clone)]
pub struct TimelineEvent {
    /// Position of the step in the traversal (0 = start node)
    pub step: usize,
    /// Name of the unit
    pub unit: String,
    /// Type of event
    pub event_type: EventType,
    /// When the event occurred
    pub timestamp: Instant,
}

/// Tracks the execution timeline of one flow run.
///
/// Steps are keyed by their position in the traversal, since the same unit
/// may be visited several times when the graph has cycles.
#[derive(Debug, Clone)]
pub struct ExecutionTimeline {
    events: Vec<TimelineEvent>,
    start_time: Instant,
}

impl ExecutionTimeline {
    /// Creates a new timeline starting now.
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            start_time: Instant::now(),
        }
    }

    /// Records an event for a step.
    pub fn add_event(&mut self, step: usize, unit: impl Into<String>, event_type: EventType) {
        self.events.push(TimelineEvent {
            step,
            unit: unit.into(),
            event_type,
            timestamp: Instant::now(),
        });
    }

    /// Returns all recorded events.
    pub fn get_events(&self) -> &[TimelineEvent] {
        &self.events
    }

    /// Returns the total elapsed time since timeline creation.
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Units in the order they were entered.
    pub fn path(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter(|e| e.event_type == EventType::Started)
            .map(|e| e.unit.as_str())
            .collect()
    }

    /// Actions in the order they were produced.
    pub fn actions(&self) -> Vec<Action> {
        self.events
            .iter()
            .filter_map(|e| match &e.event_type {
                EventType::Completed(action) => Some(action.clone()),
                _ => None,
            })
            .collect()
    }

    /// Returns `(unit, duration)` for every finished step, in path order.
    pub fn get_durations(&self) -> Vec<(String, Duration)> {
        let mut durations = Vec::new();

        for event in &self.events {
            if event.event_type == EventType::Started {
                continue;
            }
            let started = self
                .events
                .iter()
                .find(|e| e.step == event.step && e.event_type == EventType::Started);

            if let Some(start) = started {
                durations.push((
                    event.unit.clone(),
                    event.timestamp.duration_since(start.timestamp),
                ));
            }
        }

        durations
    }

    /// Generates an ASCII Gantt chart representation.
    ///
    /// Each step is shown as a bar indicating when it ran
    /// relative to the total execution time.
    pub fn gantt_chart(&self) -> String {
        let mut output = String::from("\nExecution Timeline:\n\n");

        let total_time = Instant::now().duration_since(self.start_time).as_millis();

        if total_time == 0 {
            return output;
        }

        // Scale to 50 characters width
        let scale = 50.0 / total_time as f64;

        for event in &self.events {
            if event.event_type == EventType::Started {
                continue;
            }
            let Some(start) = self
                .events
                .iter()
                .find(|e| e.step == event.step && e.event_type == EventType::Started)
            else {
                continue;
            };

            let begin = start.timestamp.duration_since(self.start_time).as_millis();
            let end = event.timestamp.duration_since(self.start_time).as_millis();

            let start_pos = (begin as f64 * scale) as usize;
            let width = ((end - begin) as f64 * scale).max(1.0) as usize;

            let mut bar = " ".repeat(start_pos);
            bar.push_str(&"#".repeat(width));

            let outcome = match &event.event_type {
                EventType::Completed(action) => action.to_string(),
                _ => "failed".to_string(),
            };

            output.push_str(&format!(
                "{:12} |{}| ({} ms, {})\n",
                truncate(&event.unit, 12),
                bar,
                end - begin,
                outcome
            ));
        }

        output.push_str(&format!("\nTotal: {} ms\n", total_time));
        output
    }
}

impl Default for ExecutionTimeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Truncates a string to a maximum length.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        format!("{:width$}", s, width = max_len)
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_timeline_creation() {
        let timeline = ExecutionTimeline::new();
        assert!(timeline.events.is_empty());
        assert!(timeline.path().is_empty());
    }

    #[test]
    fn test_path_and_actions() {
        let mut timeline = ExecutionTimeline::new();
        timeline.add_event(0, "collect", EventType::Started);
        timeline.add_event(0, "collect", EventType::Completed(Action::from("wait")));
        timeline.add_event(1, "wait", EventType::Started);
        timeline.add_event(1, "wait", EventType::Completed(Action::Default));

        assert_eq!(timeline.path(), vec!["collect", "wait"]);
        assert_eq!(timeline.actions(), vec![Action::from("wait"), Action::Default]);
    }

    #[test]
    fn test_get_durations() {
        let mut timeline = ExecutionTimeline::new();
        timeline.add_event(0, "step1", EventType::Started);
        thread::sleep(Duration::from_millis(50));
        timeline.add_event(0, "step1", EventType::Completed(Action::Default));

        let durations = timeline.get_durations();
        assert_eq!(durations.len(), 1);
        assert_eq!(durations[0].0, "step1");
        assert!(durations[0].1 >= Duration::from_millis(50));
    }

    #[test]
    fn test_repeated_unit_keeps_separate_steps() {
        let mut timeline = ExecutionTimeline::new();
        timeline.add_event(0, "a", EventType::Started);
        timeline.add_event(0, "a", EventType::Completed(Action::Default));
        timeline.add_event(1, "a", EventType::Started);
        timeline.add_event(1, "a", EventType::Failed);

        assert_eq!(timeline.path(), vec!["a", "a"]);
        assert_eq!(timeline.get_durations().len(), 2);
    }

    #[test]
    fn test_get_durations_only_started() {
        let mut timeline = ExecutionTimeline::new();
        timeline.add_event(0, "step1", EventType::Started);

        assert!(timeline.get_durations().is_empty());
    }

    #[test]
    fn test_timeline_elapsed() {
        let timeline = ExecutionTimeline::new();
        thread::sleep(Duration::from_millis(50));

        assert!(timeline.elapsed().as_millis() >= 50);
    }

    #[test]
    fn test_gantt_chart_generation() {
        let mut timeline = ExecutionTimeline::new();

        timeline.add_event(0, "step1", EventType::Started);
        thread::sleep(Duration::from_millis(20));
        timeline.add_event(0, "step1", EventType::Completed(Action::from("go")));

        timeline.add_event(1, "step2", EventType::Started);
        thread::sleep(Duration::from_millis(20));
        timeline.add_event(1, "step2", EventType::Failed);

        let chart = timeline.gantt_chart();
        assert!(chart.contains("step1"));
        assert!(chart.contains("go"));
        assert!(chart.contains("failed"));
        assert!(chart.contains("Total:"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 8), "short   ");
        assert_eq!(truncate("a_very_long_unit_name", 12), "a_very_lo...");
    }

    #[test]
    fn test_timeline_default() {
        let timeline = ExecutionTimeline::default();
        assert!(timeline.get_events().is_empty());
    }
}
