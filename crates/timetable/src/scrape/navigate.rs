//! Week navigation through the carousel arrows.

use super::selectors::{NEXT_WEEK, PREVIOUS_WEEK};
use crate::browser::{BrowserError, PageDriver};
use tracing::{debug, warn};

/// Direction of a carousel step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    fn control(&self) -> &'static str {
        match self {
            Direction::Forward => NEXT_WEEK,
            Direction::Backward => PREVIOUS_WEEK,
        }
    }
}

/// Moves the carousel one week in `direction`.
///
/// Returns `Ok(false)` when the arrow is missing or disabled, which is how the
/// site signals there are no further weeks. An arrow that goes stale before it
/// can be used counts as missing. The caller waits for the new week to render
/// before reading it.
pub async fn step_week(
    driver: &mut dyn PageDriver,
    direction: Direction,
) -> Result<bool, BrowserError> {
    match try_step(driver, direction).await {
        Err(BrowserError::NoSuchElement(message)) => {
            warn!(?direction, message = %message, "Week arrow went stale");
            Ok(false)
        }
        other => other,
    }
}

async fn try_step(driver: &mut dyn PageDriver, direction: Direction) -> Result<bool, BrowserError> {
    let Some(control) = driver.find(direction.control()).await? else {
        debug!(?direction, "Week arrow not found");
        return Ok(false);
    };

    if !driver.is_enabled(&control).await? {
        debug!(?direction, "Week arrow disabled");
        return Ok(false);
    }

    driver.click(&control).await?;
    Ok(true)
}

pub async fn next_week(driver: &mut dyn PageDriver) -> Result<bool, BrowserError> {
    step_week(driver, Direction::Forward).await
}

pub async fn previous_week(driver: &mut dyn PageDriver) -> Result<bool, BrowserError> {
    step_week(driver, Direction::Backward).await
}
