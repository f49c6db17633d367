//! Per-user week position, owned by the presentation layer.

use dashmap::DashMap;
use serde::Deserialize;
use std::str::FromStr;

/// A week move requested by a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Navigation {
    /// Back to the week active at scrape time
    #[default]
    Current,
    Next,
    #[serde(alias = "prev")]
    Previous,
}

impl FromStr for Navigation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "current" => Ok(Navigation::Current),
            "next" => Ok(Navigation::Next),
            "prev" | "previous" => Ok(Navigation::Previous),
            other => Err(format!("unknown navigation '{other}'")),
        }
    }
}

impl Navigation {
    /// Name under which the move is recorded in the request log.
    pub fn command(self) -> &'static str {
        match self {
            Navigation::Current => "schedule_current",
            Navigation::Next => "schedule_next",
            Navigation::Previous => "schedule_previous",
        }
    }
}

/// Week index each user is viewing, keyed by `(user_id, group)`.
#[derive(Debug, Default)]
pub struct WeekPositions {
    positions: DashMap<(i64, String), usize>,
}

impl WeekPositions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current index, 0 when the user has not navigated yet.
    pub fn get(&self, user_id: i64, group: &str) -> usize {
        self.positions
            .get(&(user_id, group.to_string()))
            .map(|p| *p)
            .unwrap_or(0)
    }

    pub fn set(&self, user_id: i64, group: &str, index: usize) {
        self.positions.insert((user_id, group.to_string()), index);
    }

    /// Moves by `offset` and clamps into `[0, total_weeks - 1]`.
    pub fn shift(&self, user_id: i64, group: &str, offset: isize, total_weeks: usize) -> usize {
        let mut position = self.positions.entry((user_id, group.to_string())).or_insert(0);
        let max = total_weeks.saturating_sub(1);
        let moved = position.saturating_add_signed(offset).min(max);
        *position = moved;
        moved
    }

    pub fn reset(&self, user_id: i64, group: &str) {
        self.set(user_id, group, 0);
    }

    /// Applies `nav` and returns the resulting index.
    pub fn apply(&self, user_id: i64, group: &str, nav: Navigation, total_weeks: usize) -> usize {
        match nav {
            Navigation::Current => {
                self.reset(user_id, group);
                0
            }
            Navigation::Next => self.shift(user_id, group, 1, total_weeks),
            Navigation::Previous => self.shift(user_id, group, -1, total_weeks),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_position_is_zero() {
        let positions = WeekPositions::new();
        assert_eq!(positions.get(1, "БПИ-24-2"), 0);
    }

    #[test]
    fn test_shift_clamps_to_bounds() {
        let positions = WeekPositions::new();

        assert_eq!(positions.shift(1, "G", 1, 3), 1);
        assert_eq!(positions.shift(1, "G", 1, 3), 2);
        assert_eq!(positions.shift(1, "G", 1, 3), 2);
        assert_eq!(positions.shift(1, "G", -5, 3), 0);
        assert_eq!(positions.get(1, "G"), 0);
    }

    #[test]
    fn test_shift_with_no_weeks_stays_at_zero() {
        let positions = WeekPositions::new();
        assert_eq!(positions.shift(1, "G", 1, 0), 0);
    }

    #[test]
    fn test_positions_are_per_user_and_group() {
        let positions = WeekPositions::new();
        positions.set(1, "A", 2);
        positions.set(2, "A", 1);

        assert_eq!(positions.get(1, "A"), 2);
        assert_eq!(positions.get(2, "A"), 1);
        assert_eq!(positions.get(1, "B"), 0);
    }

    #[test]
    fn test_apply_navigation() {
        let positions = WeekPositions::new();

        assert_eq!(positions.apply(7, "G", Navigation::Next, 3), 1);
        assert_eq!(positions.apply(7, "G", Navigation::Previous, 3), 0);
        assert_eq!(positions.apply(7, "G", Navigation::Next, 3), 1);
        assert_eq!(positions.apply(7, "G", Navigation::Current, 3), 0);
        assert_eq!(positions.get(7, "G"), 0);
    }

    #[test]
    fn test_navigation_from_str() {
        assert_eq!("prev".parse::<Navigation>().unwrap(), Navigation::Previous);
        assert_eq!("next".parse::<Navigation>().unwrap(), Navigation::Next);
        assert!("sideways".parse::<Navigation>().is_err());
    }

    #[test]
    fn test_navigation_command_names() {
        assert_eq!(Navigation::Current.command(), "schedule_current");
        assert_eq!(Navigation::Previous.command(), "schedule_previous");
    }
}
