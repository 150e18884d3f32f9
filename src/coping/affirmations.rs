use chrono::{Datelike, NaiveDate};
use serde::Serialize;

pub const AFFIRMATIONS: [&str; 8] = [
    "I am worthy of love and respect.",
    "I have the strength to overcome challenges.",
    "My feelings are valid and important.",
    "I am growing and learning every day.",
    "I deserve happiness and peace.",
    "I am enough, just as I am.",
    "I have the power to create positive change in my life.",
    "I am resilient and can handle whatever comes my way.",
];

pub const INSPIRATIONS: [&str; 5] = [
    "Every step forward is progress, no matter how small.",
    "Your feelings are valid, and you deserve support.",
    "Today is a new opportunity for growth and healing.",
    "You're stronger than you think, and you're not alone.",
    "Taking care of your mental health is a sign of strength.",
];

pub const JOURNAL_PROMPTS: [&str; 4] = [
    "What am I feeling right now, and where do I feel it in my body?",
    "What are three things I'm grateful for today?",
    "What would I tell a friend going through this situation?",
    "What small step can I take to care for myself today?",
];

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Affirmation {
    pub index: usize,
    pub total: usize,
    pub text: &'static str,
    pub next: usize,
    pub previous: usize,
}

/// Affirmation at `index`, wrapping in both directions.
pub fn affirmation(index: i64) -> Affirmation {
    let total = AFFIRMATIONS.len();
    let index = index.rem_euclid(total as i64) as usize;
    Affirmation {
        index,
        total,
        text: AFFIRMATIONS[index],
        next: (index + 1) % total,
        previous: (index + total - 1) % total,
    }
}

/// Message for `date`; the same all day, different from the previous day.
pub fn daily_inspiration(date: NaiveDate) -> &'static str {
    let day = date.num_days_from_ce().rem_euclid(INSPIRATIONS.len() as i32) as usize;
    INSPIRATIONS[day]
}

/// Prompts shown beside the journal, in display order.
pub fn journal_prompts() -> Vec<&'static str> {
    JOURNAL_PROMPTS.to_vec()
}
