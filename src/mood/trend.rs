use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::models::mood::{mood_label, MoodEntry};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TrendPoint {
    pub date: NaiveDate,
    /// Short weekday name, e.g. "Mon".
    pub day: String,
    pub mood: Option<i32>,
    pub label: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MoodTrend {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub points: Vec<TrendPoint>,
    pub recorded_days: usize,
    pub average: Option<f64>,
    pub average_label: Option<&'static str>,
}

/// First day of a `days`-long window ending at `end`.
pub fn window_start(end: NaiveDate, days: u32) -> NaiveDate {
    end - Duration::days(i64::from(days.max(1)) - 1)
}

/// One point per day of the window ending at `end`, oldest first, with the
/// average over the days that have an entry.
pub fn mood_trend(entries: &[MoodEntry], end: NaiveDate, days: u32) -> MoodTrend {
    let start = window_start(end, days);
    let by_date: HashMap<NaiveDate, i32> = entries
        .iter()
        .filter(|e| e.mood_date >= start && e.mood_date <= end)
        .filter_map(|e| e.mood().map(|m| (e.mood_date, m.get())))
        .collect();

    let points: Vec<TrendPoint> = start
        .iter_days()
        .take_while(|d| *d <= end)
        .map(|date| {
            let mood = by_date.get(&date).copied();
            TrendPoint {
                date,
                day: date.format("%a").to_string(),
                mood,
                label: mood.map(|m| mood_label(f64::from(m))),
            }
        })
        .collect();

    let recorded: Vec<i32> = points.iter().filter_map(|p| p.mood).collect();
    let average = (!recorded.is_empty()).then(|| {
        let mean = recorded.iter().sum::<i32>() as f64 / recorded.len() as f64;
        (mean * 10.0).round() / 10.0
    });

    MoodTrend {
        start_date: start,
        end_date: end,
        recorded_days: recorded.len(),
        average,
        average_label: average.map(mood_label),
        points,
    }
}
