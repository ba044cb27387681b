use serde::{Deserialize, Serialize};

use super::srt;

/// A single caption, times in seconds from the start of the podcast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtitleEntry {
    /// 1-based caption number
    pub index: u32,
    pub start_time: f64,
    pub end_time: f64,
    pub speaker: String,
    pub text: String,
    pub round_id: i32,
}

/// Builds the caption track from round starts and round durations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtitleTimeline {
    entries: Vec<SubtitleEntry>,
    next_index: u32,
    /// Start time of the next round
    cursor: f64,
    total_duration: f64,
    speakers: Vec<String>,
}

impl Default for SubtitleTimeline {
    fn default() -> Self {
        Self::new()
    }
}

impl SubtitleTimeline {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_index: 1,
            cursor: 0.0,
            total_duration: 0.0,
            speakers: Vec::new(),
        }
    }

    /// Append an entry at the cursor; its end time is fixed up by `update_end_time`.
    pub fn add_entry(&mut self, speaker: &str, text: &str, round_id: i32) -> &SubtitleEntry {
        if !self.speakers.iter().any(|s| s == speaker) {
            self.speakers.push(speaker.to_string());
        }

        let index = self.entries.len();
        self.entries.push(SubtitleEntry {
            index: self.next_index,
            start_time: self.cursor,
            end_time: self.cursor,
            speaker: speaker.to_string(),
            text: text.to_string(),
            round_id,
        });
        self.next_index += 1;

        &self.entries[index]
    }

    /// Close the entry owned by `round_id`. Rounds without an entry (music)
    /// still advance the cursor.
    pub fn update_end_time(&mut self, round_id: i32, duration: f64) {
        let cursor = self.cursor;
        if let Some(entry) = self.entries.iter_mut().find(|e| e.round_id == round_id) {
            entry.end_time = cursor + duration;
        }
        self.cursor += duration;
        self.total_duration += duration;
    }

    /// Spread `total` evenly across all entries, in entry order.
    pub fn distribute_evenly(&mut self, total: f64) {
        let count = self.entries.len();
        if count > 0 {
            let step = total / count as f64;
            for (i, entry) in self.entries.iter_mut().enumerate() {
                entry.start_time = i as f64 * step;
                entry.end_time = (i + 1) as f64 * step;
            }
        }

        self.cursor = total;
        self.total_duration = total;
    }

    /// Drop entries appended after the first `len`, e.g. for a round that
    /// never finished before the connection dropped.
    pub fn truncate(&mut self, len: usize) {
        if len >= self.entries.len() {
            return;
        }
        self.entries.truncate(len);
        self.next_index = self.entries.last().map_or(1, |e| e.index + 1);

        let mut speakers: Vec<String> = Vec::new();
        for entry in &self.entries {
            if !speakers.contains(&entry.speaker) {
                speakers.push(entry.speaker.clone());
            }
        }
        self.speakers = speakers;
    }

    pub fn entries(&self) -> &[SubtitleEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn speakers(&self) -> &[String] {
        &self.speakers
    }

    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }

    pub fn to_srt(&self) -> String {
        srt::render(&self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_entry_assigns_monotonic_index() {
        let mut timeline = SubtitleTimeline::new();
        assert_eq!(timeline.add_entry("A", "one", 0).index, 1);
        assert_eq!(timeline.add_entry("B", "two", 1).index, 2);
        assert_eq!(timeline.add_entry("A", "three", 2).index, 3);
        assert_eq!(timeline.speakers(), ["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn test_placeholder_end_equals_start() {
        let mut timeline = SubtitleTimeline::new();
        timeline.add_entry("A", "one", 0);
        timeline.update_end_time(0, 2.0);
        let entry = timeline.add_entry("B", "two", 1).clone();
        assert_eq!(entry.start_time, 2.0);
        assert_eq!(entry.end_time, 2.0);
    }

    #[test]
    fn test_update_end_time_accumulates() {
        let durations = [1.5, 0.25, 3.0];
        let mut timeline = SubtitleTimeline::new();
        for (round, duration) in durations.iter().enumerate() {
            timeline.add_entry("A", "text", round as i32);
            timeline.update_end_time(round as i32, *duration);
        }

        for (entry, duration) in timeline.entries().iter().zip(durations) {
            assert_eq!(entry.end_time, entry.start_time + duration);
        }
        assert_eq!(timeline.entries()[1].start_time, 1.5);
        assert_eq!(timeline.entries()[2].start_time, 1.75);
        assert_eq!(timeline.total_duration(), 4.75);
    }

    #[test]
    fn test_round_without_entry_advances_cursor() {
        let mut timeline = SubtitleTimeline::new();
        // Intro music round has no text
        timeline.update_end_time(-1, 4.0);
        timeline.add_entry("A", "hello", 0);
        timeline.update_end_time(0, 1.0);

        let entry = &timeline.entries()[0];
        assert_eq!(entry.start_time, 4.0);
        assert_eq!(entry.end_time, 5.0);
        assert_eq!(timeline.total_duration(), 5.0);
        assert_eq!(timeline.len(), 1);
    }

    #[test]
    fn test_update_end_time_uses_first_matching_entry() {
        let mut timeline = SubtitleTimeline::new();
        timeline.add_entry("A", "first", 7);
        timeline.add_entry("A", "second", 7);
        timeline.update_end_time(7, 2.0);

        assert_eq!(timeline.entries()[0].end_time, 2.0);
        assert_eq!(timeline.entries()[1].end_time, 0.0);
    }

    #[test]
    fn test_distribute_evenly() {
        let mut timeline = SubtitleTimeline::new();
        for round in 0..3 {
            timeline.add_entry("A", "text", round);
        }
        timeline.distribute_evenly(9.0);

        for (i, entry) in timeline.entries().iter().enumerate() {
            assert_eq!(entry.start_time, i as f64 * 3.0);
            assert_eq!(entry.end_time - entry.start_time, 3.0);
        }
        assert_eq!(timeline.entries()[2].end_time, 9.0);
        assert_eq!(timeline.total_duration(), 9.0);
    }

    #[test]
    fn test_distribute_evenly_without_entries() {
        let mut timeline = SubtitleTimeline::new();
        timeline.distribute_evenly(12.5);
        assert!(timeline.is_empty());
        assert_eq!(timeline.total_duration(), 12.5);
    }

    #[test]
    fn test_truncate_rewinds_index() {
        let mut timeline = SubtitleTimeline::new();
        timeline.add_entry("A", "kept", 0);
        timeline.add_entry("B", "dropped", 1);
        timeline.truncate(1);

        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline.add_entry("B", "again", 1).index, 2);
    }

    #[test]
    fn test_truncate_forgets_speakers_of_dropped_entries() {
        let mut timeline = SubtitleTimeline::new();
        timeline.add_entry("A", "kept", 0);
        timeline.add_entry("C", "interrupted", 1);
        timeline.truncate(1);
        assert_eq!(timeline.speakers(), ["A".to_string()]);

        timeline.add_entry("B", "next", 1);
        timeline.add_entry("A", "again", 2);
        assert_eq!(timeline.speakers(), ["A".to_string(), "B".to_string()]);
    }
}
