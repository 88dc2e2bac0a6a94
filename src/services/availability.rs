use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};
use rand::{Rng, RngCore};

use crate::errors::CoreError;
use crate::models::AvailabilityMap;

/// Business hours: bookings start at 10:00 and the office closes at 17:00.
pub const OPENING_TIME: &str = "10:00";
pub const CLOSING_TIME: &str = "17:00";

const OPEN_HOUR: u32 = 10;
const LAST_START_HOUR: u32 = 16;
const HOURLY_OFFER_PROBABILITY: f64 = 0.3;

fn split_token(time: &str) -> Result<(u32, &str), CoreError> {
    time.split_once(':')
        .and_then(|(h, m)| {
            if m != "00" && m != "30" {
                return None;
            }
            Some((h.parse().ok()?, m))
        })
        .ok_or_else(|| CoreError::Contract(format!("malformed half-hour token: {time:?}")))
}

/// Successor of an "HH:MM" half-hour token: "10:00" → "10:30", "10:30" → "11:00".
pub fn advance_half_hour(time: &str) -> Result<String, CoreError> {
    let (hour, minute) = split_token(time)?;
    Ok(if minute == "30" {
        format!("{}:00", hour + 1)
    } else {
        format!("{hour}:30")
    })
}

/// A day's bookable half-hour windows. Mondays offer each hour from 10:00 to
/// 16:00 with 30% probability, as the first half, second half, or both halves
/// of the hour; Wednesdays and Fridays always offer 10:00, 16:00 and 16:30;
/// every other day (weekends included) offers nothing.
pub fn generate_availability(date: NaiveDate, rng: &mut dyn RngCore) -> BTreeSet<String> {
    let mut windows = BTreeSet::new();
    match date.weekday().num_days_from_monday() {
        0 => {
            for hour in OPEN_HOUR..=LAST_START_HOUR {
                if rng.gen::<f64>() >= HOURLY_OFFER_PROBABILITY {
                    continue;
                }
                match rng.gen_range(1..=3) {
                    1 => {
                        windows.insert(format!("{hour}:00"));
                    }
                    2 => {
                        windows.insert(format!("{hour}:30"));
                    }
                    _ => {
                        windows.insert(format!("{hour}:00"));
                        windows.insert(format!("{hour}:30"));
                    }
                }
            }
        }
        2 | 4 => {
            for window in ["10:00", "16:00", "16:30"] {
                windows.insert(window.to_string());
            }
        }
        _ => {}
    }
    windows
}

/// True iff a booking of the given duration starting at `time` fits the open
/// windows. Durations other than 30 or 60 minutes are a caller contract
/// violation.
pub fn is_bookable(
    time: &str,
    duration_minutes: u16,
    windows: &BTreeSet<String>,
) -> Result<bool, CoreError> {
    match duration_minutes {
        30 => Ok(windows.contains(time)),
        60 => {
            let second_half = advance_half_hour(time)?;
            Ok(windows.contains(time) && windows.contains(&second_half))
        }
        other => Err(CoreError::Contract(format!(
            "unsupported appointment duration: {other}"
        ))),
    }
}

/// All bookable start times for the given duration, walking business hours in
/// half-hour steps, ascending.
pub fn filter_by_duration(
    duration_minutes: u16,
    windows: &BTreeSet<String>,
) -> Result<Vec<String>, CoreError> {
    let mut starts = Vec::new();
    let mut cursor = OPENING_TIME.to_string();
    while cursor != CLOSING_TIME {
        if is_bookable(&cursor, duration_minutes, windows)? {
            starts.push(cursor.clone());
        }
        cursor = advance_half_hour(&cursor)?;
    }
    Ok(starts)
}

/// Removes the chosen window (both halves for a 60-minute booking) from the
/// date's availability. Removing a window that is not present means the state
/// machine reached booking with a stale slot — a caller contract violation.
pub fn book_slot(
    date: &str,
    time: &str,
    duration_minutes: u16,
    map: &mut AvailabilityMap,
) -> Result<(), CoreError> {
    if duration_minutes != 30 && duration_minutes != 60 {
        return Err(CoreError::Contract(format!(
            "unsupported appointment duration: {duration_minutes}"
        )));
    }
    let windows = map
        .get_mut(date)
        .ok_or_else(|| CoreError::Contract(format!("no availability generated for {date}")))?;
    if !windows.remove(time) {
        return Err(CoreError::Contract(format!(
            "window {time} on {date} was not available"
        )));
    }
    if duration_minutes == 60 {
        let second_half = advance_half_hour(time)?;
        if !windows.remove(&second_half) {
            return Err(CoreError::Contract(format!(
                "window {second_half} on {date} was not available"
            )));
        }
    }
    Ok(())
}

/// 12-hour display form of an "HH:MM" token, minute digits preserved
/// ("16:30" → "4:30 p.m.").
pub fn format_time(time: &str) -> Result<String, CoreError> {
    let (hour, minute) = split_token(time)?;
    Ok(match hour {
        0 => format!("12:{minute} a.m."),
        12 => format!("12:{minute} p.m."),
        h if h > 12 => format!("{}:{minute} p.m.", h - 12),
        h => format!("{h}:{minute} a.m."),
    })
}

/// Sentence offering a choice among at least two availabilities, naming the
/// first three.
pub fn summarize_times(starts: &[String]) -> Result<String, CoreError> {
    if starts.len() < 2 {
        return Err(CoreError::Contract(
            "time summary needs at least two availabilities".to_string(),
        ));
    }
    let mut summary = if starts.len() > 3 {
        "We have plenty of availability, including ".to_string()
    } else {
        "We have time availabilities at ".to_string()
    };
    summary.push_str(&format_time(&starts[0])?);
    if starts.len() == 2 {
        return Ok(format!("{summary} and {}", format_time(&starts[1])?));
    }
    Ok(format!(
        "{summary}, {} and {}",
        format_time(&starts[1])?,
        format_time(&starts[2])?
    ))
}
