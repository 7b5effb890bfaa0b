use chrono::NaiveDate;
use memrise_model::Progress;
use serde::{Deserialize, Serialize};

/// Ease factor given to imported review cards, in permille.
pub const DEFAULT_FACTOR: u32 = 2500;

/// Scheduling state a card is imported with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CardSchedule {
    /// Never studied. Ordered among new cards by import position.
    New { due: u32 },
    /// Studied before. `due_in_days` is relative to the import day and
    /// negative for overdue cards.
    Review {
        interval: u32,
        reps: u32,
        lapses: u32,
        due_in_days: i64,
        factor: u32,
    },
}

/// Card state for a learnable's progress as of `today`.
pub fn schedule_for(progress: &Progress, today: NaiveDate) -> CardSchedule {
    match progress.interval {
        None => CardSchedule::New {
            due: progress.position,
        },
        Some(interval) => CardSchedule::Review {
            interval: interval.round().max(0.0) as u32,
            reps: progress.attempts,
            lapses: progress.incorrect,
            due_in_days: progress
                .next_date
                .map(|next| (next.date_naive() - today).num_days())
                .unwrap_or(0),
            factor: DEFAULT_FACTOR,
        },
    }
}
