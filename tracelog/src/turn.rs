//! Turn scoping.
//!
//! A "regenerate answer" action re-runs only the downstream part of the
//! graph and appends freshly numbered events next to the older ones. Keeping
//! a single turn stops stale rounds from showing up next to the current one.

use trace_types::{RawLogRecord, TraceEvent};

/// Anything carrying an optional execution-round counter.
pub trait TurnScoped {
    fn turn(&self) -> Option<i64>;
}

impl TurnScoped for TraceEvent {
    fn turn(&self) -> Option<i64> {
        self.turn
    }
}

impl TurnScoped for RawLogRecord {
    fn turn(&self) -> Option<i64> {
        self.turn
    }
}

impl<T: TurnScoped + ?Sized> TurnScoped for &T {
    fn turn(&self) -> Option<i64> {
        (**self).turn()
    }
}

impl<T: TurnScoped> TurnScoped for (usize, T) {
    fn turn(&self) -> Option<i64> {
        self.1.turn()
    }
}

pub fn latest_turn<T: TurnScoped>(items: &[T]) -> Option<i64> {
    items.iter().filter_map(TurnScoped::turn).max()
}

/// Keep only the latest turn.
///
/// Items without a turn are dropped once any item has one; when no item is
/// numbered the input is returned unchanged.
pub fn filter_latest_turn<T: TurnScoped>(items: Vec<T>) -> Vec<T> {
    let Some(latest) = latest_turn(&items) else {
        return items;
    };

    let before = items.len();
    let kept: Vec<T> = items
        .into_iter()
        .filter(|item| item.turn() == Some(latest))
        .collect();
    tracing::trace!(latest, kept = kept.len(), dropped = before - kept.len(), "Turn filter applied");
    kept
}

/// Keep items of `turn`, plus unnumbered items which match any turn.
pub fn filter_to_turn<T: TurnScoped>(items: Vec<T>, turn: i64) -> Vec<T> {
    items
        .into_iter()
        .filter(|item| item.turn().map_or(true, |t| t == turn))
        .collect()
}

/// Whether two items belong to the same round (unnumbered matches anything).
pub fn same_turn(a: Option<i64>, b: Option<i64>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    }
}

/// `#<turn> ` for positive turns, empty otherwise.
pub fn turn_label(turn: Option<i64>) -> String {
    match turn {
        Some(turn) if turn > 0 => format!("#{turn} "),
        _ => String::new(),
    }
}
