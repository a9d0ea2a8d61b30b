//! Event window location on the trading calendar.
//!
//! For an event resolved to anchor index `a` (pre-anchor index `p = a - 1`):
//!
//! ```text
//! estimation window : [p - M + 1, p]      M = estimation_window_length
//! event window      : [p, p + L]          L = event_window_length
//! ```
//!
//! The pre-anchor day belongs to both windows. An event is only placed when
//! `a + L` is still on the calendar. Windows are never truncated; any shortfall
//! is an `AlignmentFailure`.

use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::{EventWindowSpec, StudyConfig};
use crate::study::calendar::TradingCalendar;

/// Why an event date could not be placed on the calendar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlignmentFailure {
    #[error("no trading day on or before {event_date}")]
    NoAnchor { event_date: NaiveDate },
    #[error("anchor {anchor_day} is the first trading day; no pre-anchor day")]
    NoPreAnchorDay { anchor_day: NaiveDate },
    #[error("estimation window needs {needed} trading days before {anchor_day}, only {available} available")]
    InsufficientHistory {
        anchor_day: NaiveDate,
        needed: usize,
        available: usize,
    },
    #[error("event window needs {needed} trading days from anchor {anchor_day}, only {available} available")]
    InsufficientTrailingDays {
        anchor_day: NaiveDate,
        needed: usize,
        available: usize,
    },
}

/// Map a raw event date to its estimation and event windows.
pub fn locate(
    event_date: NaiveDate,
    calendar: &TradingCalendar,
    config: &StudyConfig,
) -> Result<EventWindowSpec, AlignmentFailure> {
    let dates = calendar.as_slice();

    let anchor_idx = calendar
        .anchor_index(event_date)
        .ok_or(AlignmentFailure::NoAnchor { event_date })?;
    let anchor_day = dates[anchor_idx];

    let Some(pre_idx) = anchor_idx.checked_sub(1) else {
        return Err(AlignmentFailure::NoPreAnchorDay { anchor_day });
    };

    let est_len = config.estimation_window_length;
    // pre_idx + 1 dates are available up to and including the pre-anchor day.
    if est_len == 0 || pre_idx + 1 < est_len {
        return Err(AlignmentFailure::InsufficientHistory {
            anchor_day,
            needed: est_len,
            available: pre_idx + 1,
        });
    }
    let est_start = pre_idx + 1 - est_len;

    // The anchor needs L trading days after it, even though the window itself
    // ends at `p + L`.
    let fits = anchor_idx
        .checked_add(config.event_window_length)
        .is_some_and(|last| last < dates.len());
    if !fits {
        return Err(AlignmentFailure::InsufficientTrailingDays {
            anchor_day,
            needed: config.event_window_size(),
            available: dates.len() - anchor_idx,
        });
    }
    let event_end = pre_idx + config.event_window_length;

    Ok(EventWindowSpec {
        estimation_window: dates[est_start..=pre_idx].to_vec(),
        pre_anchor_day: dates[pre_idx],
        anchor_day,
        event_window: dates[pre_idx..=event_end].to_vec(),
    })
}
