// src/services/history_store.rs
use crate::errors::FluxError;
use crate::models::HistoryRecord;

/// Append-only image history of one session, oldest first.
///
/// Unbounded: records are only released by [`HistoryStore::clear`].
#[derive(Debug, Default)]
pub struct HistoryStore {
    records: Vec<HistoryRecord>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: HistoryRecord) {
        self.records.push(record);
    }

    /// The last `k` records, most recent first.
    pub fn recent_window(&self, k: usize) -> Result<Vec<&HistoryRecord>, FluxError> {
        if k == 0 {
            return Err(FluxError::InvalidParameter(
                "recent window must hold at least one record".to_string(),
            ));
        }

        Ok(self.records.iter().rev().take(k).collect())
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Looks up a record by its 1-based display ordinal.
    pub fn select(&self, ordinal: usize) -> Result<&HistoryRecord, FluxError> {
        ordinal
            .checked_sub(1)
            .and_then(|position| self.records.get(position))
            .ok_or(FluxError::HistoryIndex {
                ordinal,
                len: self.records.len(),
            })
    }

    /// Picker labels, in storage order.
    pub fn options(&self) -> Vec<String> {
        self.records
            .iter()
            .enumerate()
            .map(|(i, record)| format!("Image {} - {}", i + 1, record.timestamp()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GenerationMode, GenerationParams, ImageSize};
    use chrono::{Local, TimeZone};

    fn record(steps: u32) -> HistoryRecord {
        let params = GenerationParams {
            model: "flux.latest".into(),
            prompt: format!("frame {}", steps),
            negative_prompt: None,
            style: "modern".into(),
            quality: "hd".into(),
            size: ImageSize::Square,
            steps,
            guidance_scale: 7.5,
            seed: None,
            strength: None,
        };
        let at = Local.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        HistoryRecord::new(params, GenerationMode::TextToImage, &[steps as u8], at)
    }

    #[test]
    fn recent_window_is_reverse_chronological() {
        let mut store = HistoryStore::new();
        for steps in 1..=5 {
            store.append(record(steps));
        }

        let window: Vec<u32> = store
            .recent_window(3)
            .unwrap()
            .iter()
            .map(|r| r.params.steps)
            .collect();

        assert_eq!(window, vec![5, 4, 3]);
    }

    #[test]
    fn window_larger_than_history_returns_everything() {
        let mut store = HistoryStore::new();
        store.append(record(1));
        store.append(record(2));
        assert_eq!(store.recent_window(10).unwrap().len(), 2);
    }

    #[test]
    fn zero_window_is_rejected() {
        let store = HistoryStore::new();
        assert!(matches!(
            store.recent_window(0),
            Err(FluxError::InvalidParameter(_))
        ));
    }

    #[test]
    fn clear_empties_the_store() {
        let mut store = HistoryStore::new();
        for steps in 1..=5 {
            store.append(record(steps));
        }

        store.clear();

        assert!(store.is_empty());
        assert!(store.recent_window(1).unwrap().is_empty());
    }

    #[test]
    fn duplicates_are_kept() {
        let mut store = HistoryStore::new();
        let r = record(7);
        store.append(r.clone());
        store.append(r);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn select_maps_ordinals_to_positions() {
        let mut store = HistoryStore::new();
        for steps in [10, 20, 30] {
            store.append(record(steps));
        }

        assert_eq!(store.select(1).unwrap().params.steps, 10);
        assert_eq!(store.select(3).unwrap().params.steps, 30);
        assert!(matches!(
            store.select(0),
            Err(FluxError::HistoryIndex { ordinal: 0, len: 3 })
        ));
        assert!(matches!(
            store.select(4),
            Err(FluxError::HistoryIndex { ordinal: 4, len: 3 })
        ));
    }

    #[test]
    fn options_label_each_record() {
        let mut store = HistoryStore::new();
        store.append(record(4));
        store.append(record(8));
        assert_eq!(
            store.options(),
            vec![
                "Image 1 - 2024-05-01 09:30:00".to_string(),
                "Image 2 - 2024-05-01 09:30:00".to_string()
            ]
        );
    }
}
