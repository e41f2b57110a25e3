//! Heatwave run detection.
//!
//! A station-day is *hot* when its daily maximum meets the threshold. A
//! *heatwave day* belongs to a maximal block of calendar-consecutive hot days
//! (same station, no gaps) at least `min_run_days` long. Days with a null
//! maximum are never hot, and a day with no row at all is a calendar gap, so
//! either one ends a run.
//!
//! Each station's hot days are scanned once in date order with a two-state
//! machine (`NoRun`, `InRun`); a run is flushed when the next hot day is not
//! the calendar successor of the previous one, or when the sequence ends.

use crate::config::{validate_threshold, PipelineSettings};
use crate::error::{ProcessingError, Result};
use crate::models::{DailyStationTemperature, HeatwaveEvent, HeatwaveFlag};
use chrono::NaiveDate;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::ops::Range;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
enum RunState {
    NoRun,
    InRun { start: usize, prev_day: NaiveDate },
}

#[derive(Debug, Clone, Default)]
pub struct DetectionResult {
    /// One flag per input row, in input order
    pub flags: Vec<HeatwaveFlag>,
    /// Qualifying runs ordered by station then start day
    pub events: Vec<HeatwaveEvent>,
}

impl DetectionResult {
    pub fn hot_days(&self) -> usize {
        self.flags.iter().filter(|f| f.is_hot_day).count()
    }

    pub fn heatwave_days(&self) -> usize {
        self.flags.iter().filter(|f| f.is_heatwave_day).count()
    }
}

struct StationDetection {
    /// (input row index, is_hot_day, is_heatwave_day)
    marks: Vec<(usize, bool, bool)>,
    events: Vec<HeatwaveEvent>,
}

#[derive(Debug, Clone)]
pub struct HeatwaveDetector {
    threshold_c: f64,
    min_run_days: usize,
}

impl HeatwaveDetector {
    pub fn new(threshold_c: f64, min_run_days: usize) -> Result<Self> {
        validate_threshold(threshold_c)?;
        if min_run_days == 0 {
            return Err(ProcessingError::Configuration(
                "Minimum heatwave length must be at least one day".to_string(),
            ));
        }

        Ok(Self {
            threshold_c,
            min_run_days,
        })
    }

    pub fn from_settings(settings: &PipelineSettings) -> Result<Self> {
        Self::new(settings.heat_threshold_c, settings.min_heatwave_days)
    }

    pub fn threshold_c(&self) -> f64 {
        self.threshold_c
    }

    pub fn min_run_days(&self) -> usize {
        self.min_run_days
    }

    /// Flag every row of `daily`. Rows are neither added nor dropped and the
    /// output order matches the input order; stations are processed in
    /// parallel on the current rayon pool.
    pub fn detect(&self, daily: &[DailyStationTemperature]) -> DetectionResult {
        let mut by_station: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (index, row) in daily.iter().enumerate() {
            by_station.entry(row.station_id.as_str()).or_default().push(index);
        }

        let stations: Vec<Vec<usize>> = by_station.into_values().collect();
        let detections: Vec<StationDetection> = stations
            .into_par_iter()
            .map(|indices| self.detect_station(daily, indices))
            .collect();

        let mut marks: Vec<Option<(bool, bool)>> = vec![None; daily.len()];
        let mut events = Vec::new();
        for detection in detections {
            for (index, hot, heatwave) in detection.marks {
                marks[index] = Some((hot, heatwave));
            }
            events.extend(detection.events);
        }

        let flags: Vec<HeatwaveFlag> = daily
            .iter()
            .zip(marks)
            .map(|(row, mark)| {
                let (is_hot_day, is_heatwave_day) = mark.unwrap_or((false, false));
                HeatwaveFlag {
                    station_id: row.station_id.clone(),
                    day: row.day,
                    is_hot_day,
                    is_heatwave_day,
                }
            })
            .collect();

        debug!(
            rows = flags.len(),
            events = events.len(),
            threshold = self.threshold_c,
            "Detected heatwaves"
        );

        DetectionResult { flags, events }
    }

    fn detect_station(&self, daily: &[DailyStationTemperature], mut indices: Vec<usize>) -> StationDetection {
        indices.sort_by_key(|&i| daily[i].day);

        let hot: Vec<usize> = indices
            .iter()
            .copied()
            .filter(|&i| daily[i].is_hot(self.threshold_c))
            .collect();

        let mut heatwave_rows = vec![false; hot.len()];
        let mut events = Vec::new();

        for run in consecutive_runs(hot.iter().map(|&i| daily[i].day)) {
            if run.len() < self.min_run_days {
                continue;
            }
            heatwave_rows[run.clone()].iter_mut().for_each(|flag| *flag = true);
            events.push(self.build_event(daily, &indices, &hot[run]));
        }

        // `hot` is a subsequence of `indices`, so one cursor walks both
        let mut marks = Vec::with_capacity(indices.len());
        let mut hot_cursor = 0;
        for &index in &indices {
            if hot.get(hot_cursor) == Some(&index) {
                marks.push((index, true, heatwave_rows[hot_cursor]));
                hot_cursor += 1;
            } else {
                marks.push((index, false, false));
            }
        }

        StationDetection { marks, events }
    }

    fn build_event(
        &self,
        daily: &[DailyStationTemperature],
        station_indices: &[usize],
        run_indices: &[usize],
    ) -> HeatwaveEvent {
        let first = &daily[run_indices[0]];
        let last = &daily[run_indices[run_indices.len() - 1]];
        let peak_temp_c = run_indices
            .iter()
            .filter_map(|&i| daily[i].daily_max_temp_c)
            .fold(f64::NEG_INFINITY, f64::max);

        let history_start = station_indices.first().map(|&i| daily[i].day);
        let history_end = station_indices.last().map(|&i| daily[i].day);

        HeatwaveEvent {
            station_id: first.station_id.clone(),
            start: first.day,
            end: last.day,
            peak_temp_c,
            at_history_edge: history_start == Some(first.day) || history_end == Some(last.day),
        }
    }
}

/// Split a date-ordered sequence of hot days into maximal runs of
/// calendar-consecutive days, returned as index ranges into the sequence.
pub fn consecutive_runs<I>(hot_days: I) -> Vec<Range<usize>>
where
    I: IntoIterator<Item = NaiveDate>,
{
    let mut runs = Vec::new();
    let mut state = RunState::NoRun;
    let mut len = 0;

    for (pos, day) in hot_days.into_iter().enumerate() {
        state = match state {
            RunState::InRun { start, prev_day } if prev_day.succ_opt() == Some(day) => {
                RunState::InRun { start, prev_day: day }
            }
            RunState::InRun { start, .. } => {
                runs.push(start..pos);
                RunState::InRun {
                    start: pos,
                    prev_day: day,
                }
            }
            RunState::NoRun => RunState::InRun {
                start: pos,
                prev_day: day,
            },
        };
        len = pos + 1;
    }

    if let RunState::InRun { start, .. } = state {
        runs.push(start..len);
    }

    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, d).unwrap()
    }

    fn series(station: &str, start: u32, temps: &[Option<f64>]) -> Vec<DailyStationTemperature> {
        temps
            .iter()
            .enumerate()
            .map(|(i, t)| {
                DailyStationTemperature::new(station.to_string(), day(start + i as u32), *t, *t, 24)
            })
            .collect()
    }

    fn detector() -> HeatwaveDetector {
        HeatwaveDetector::new(32.22, 3).unwrap()
    }

    fn hot_flags(result: &DetectionResult) -> Vec<bool> {
        result.flags.iter().map(|f| f.is_hot_day).collect()
    }

    fn heatwave_flags(result: &DetectionResult) -> Vec<bool> {
        result.flags.iter().map(|f| f.is_heatwave_day).collect()
    }

    #[test]
    fn test_three_day_run_qualifies() {
        let daily = series(
            "X",
            1,
            &[Some(30.0), Some(33.0), Some(34.0), Some(35.0), Some(31.0), Some(20.0)],
        );

        let result = detector().detect(&daily);

        assert_eq!(hot_flags(&result), vec![false, true, true, true, false, false]);
        assert_eq!(heatwave_flags(&result), vec![false, true, true, true, false, false]);
        assert_eq!(result.events.len(), 1);
        assert_eq!(result.events[0].start, day(2));
        assert_eq!(result.events[0].end, day(4));
        assert_eq!(result.events[0].peak_temp_c, 35.0);
        assert!(!result.events[0].at_history_edge);
    }

    #[test]
    fn test_null_day_breaks_run() {
        let daily = series(
            "X",
            1,
            &[Some(30.0), Some(33.0), None, Some(35.0), Some(31.0), Some(20.0)],
        );

        let result = detector().detect(&daily);

        assert_eq!(hot_flags(&result), vec![false, true, false, true, false, false]);
        assert_eq!(heatwave_flags(&result), vec![false; 6]);
        assert!(result.events.is_empty());
    }

    #[test]
    fn test_two_days_not_enough() {
        let daily = series("X", 1, &[Some(20.0), Some(33.0), Some(33.0), Some(20.0)]);

        let result = detector().detect(&daily);

        assert_eq!(hot_flags(&result), vec![false, true, true, false]);
        assert_eq!(heatwave_flags(&result), vec![false; 4]);
    }

    #[test]
    fn test_five_day_run_has_no_internal_gaps() {
        let daily = series(
            "X",
            1,
            &[Some(20.0), Some(33.0), Some(34.0), Some(33.0), Some(36.0), Some(33.0), Some(20.0)],
        );

        let result = detector().detect(&daily);

        assert_eq!(
            heatwave_flags(&result),
            vec![false, true, true, true, true, true, false]
        );
        assert_eq!(result.events[0].length_days(), 5);
    }

    #[test]
    fn test_missing_row_is_a_calendar_gap() {
        // Hot on 1, 2 and 4: no row for day 3
        let mut daily = series("X", 1, &[Some(33.0), Some(33.0)]);
        daily.extend(series("X", 4, &[Some(33.0), Some(20.0)]));

        let result = detector().detect(&daily);

        assert_eq!(heatwave_flags(&result), vec![false; 4]);
    }

    #[test]
    fn test_runs_are_per_station() {
        // A: hot 1-2, B: hot 3. Interleaved they would look consecutive.
        let mut daily = series("A", 1, &[Some(33.0), Some(33.0), Some(20.0)]);
        daily.extend(series("B", 1, &[Some(20.0), Some(20.0), Some(33.0)]));

        let result = detector().detect(&daily);

        assert_eq!(heatwave_flags(&result), vec![false; 6]);
        assert_eq!(result.hot_days(), 3);
    }

    #[test]
    fn test_output_is_projection_of_input_order() {
        let mut daily = series("B", 1, &[Some(33.0), Some(34.0), Some(35.0)]);
        daily.extend(series("A", 1, &[Some(10.0), Some(11.0)]));
        daily.reverse();

        let result = detector().detect(&daily);

        assert_eq!(result.flags.len(), daily.len());
        for (flag, row) in result.flags.iter().zip(&daily) {
            assert_eq!(flag.station_id, row.station_id);
            assert_eq!(flag.day, row.day);
        }
        assert_eq!(heatwave_flags(&result), vec![false, false, true, true, true]);
    }

    #[test]
    fn test_idempotent() {
        let daily = series(
            "X",
            1,
            &[Some(33.0), Some(34.0), None, Some(35.0), Some(36.0), Some(37.0), Some(12.0)],
        );

        let first = detector().detect(&daily);
        let second = detector().detect(&daily);

        assert_eq!(first.flags, second.flags);
        assert_eq!(first.events, second.events);
    }

    #[test]
    fn test_threshold_only_changes_classification() {
        let daily = series("X", 1, &[Some(29.0), Some(30.0), Some(31.0), Some(25.0)]);

        let default = detector().detect(&daily);
        let lowered = HeatwaveDetector::new(29.0, 3).unwrap().detect(&daily);

        assert_eq!(default.heatwave_days(), 0);
        assert_eq!(heatwave_flags(&lowered), vec![true, true, true, false]);
        // Run starts on the station's first day, so its true start is unknown
        assert!(lowered.events[0].at_history_edge);
    }

    #[test]
    fn test_configurable_min_run_length() {
        let daily = series("X", 1, &[Some(33.0), Some(33.0), Some(20.0)]);

        let result = HeatwaveDetector::new(32.22, 2).unwrap().detect(&daily);
        assert_eq!(heatwave_flags(&result), vec![true, true, false]);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(matches!(
            HeatwaveDetector::new(-300.0, 3),
            Err(ProcessingError::InvalidThreshold(_))
        ));
        assert!(HeatwaveDetector::new(f64::NAN, 3).is_err());
        assert!(HeatwaveDetector::new(32.22, 0).is_err());
    }

    #[test]
    fn test_consecutive_runs_state_machine() {
        let days = vec![day(1), day(2), day(4), day(5), day(6), day(9)];
        assert_eq!(consecutive_runs(days), vec![0..2, 2..5, 5..6]);
        assert!(consecutive_runs(Vec::<NaiveDate>::new()).is_empty());
    }

    #[test]
    fn test_runs_cross_month_boundary() {
        let days = vec![
            NaiveDate::from_ymd_opt(2024, 6, 29).unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
            NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
        ];
        assert_eq!(consecutive_runs(days), vec![0..3]);
    }

    /// Grouping by (ordinal date - rank) must find the same runs.
    #[test]
    fn test_matches_date_minus_rank_grouping() {
        use chrono::Datelike;

        let temps: Vec<Option<f64>> = (0..60u32)
            .map(|i| match (i * 7 + i / 5) % 11 {
                0 => None,
                k if k < 6 => Some(33.0 + k as f64),
                k => Some(20.0 + k as f64),
            })
            .collect();
        let daily: Vec<DailyStationTemperature> = temps
            .iter()
            .enumerate()
            .map(|(i, t)| {
                DailyStationTemperature::new(
                    "X".into(),
                    day(1) + chrono::Duration::days(i as i64),
                    *t,
                    *t,
                    24,
                )
            })
            .collect();

        let mut groups: BTreeMap<i64, Vec<NaiveDate>> = BTreeMap::new();
        let hot_days: Vec<NaiveDate> = daily
            .iter()
            .filter(|d| d.is_hot(32.22))
            .map(|d| d.day)
            .collect();
        for (rank, d) in hot_days.iter().enumerate() {
            let group = d.num_days_from_ce() as i64 - (rank as i64 + 1);
            groups.entry(group).or_default().push(*d);
        }
        let expected: Vec<NaiveDate> = groups
            .values()
            .filter(|g| g.len() >= 3)
            .flatten()
            .copied()
            .collect();

        let result = detector().detect(&daily);
        let actual: Vec<NaiveDate> = result
            .flags
            .iter()
            .filter(|f| f.is_heatwave_day)
            .map(|f| f.day)
            .collect();

        assert_eq!(actual, expected);
    }
}
