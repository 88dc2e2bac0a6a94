use chrono::{Datelike, NaiveDate};

use crate::models::SlotName;

/// Known services and their appointment length in minutes.
pub const SERVICE_CATALOG: [(&str, u16); 2] = [("consultation", 30), ("full checkup", 60)];

pub fn service_duration(service_type: &str) -> Option<u16> {
    let wanted = service_type.to_lowercase();
    SERVICE_CATALOG
        .iter()
        .find(|(name, _)| *name == wanted)
        .map(|&(_, minutes)| minutes)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub valid: bool,
    pub slot: Option<SlotName>,
    pub message: Option<String>,
}

impl ValidationResult {
    fn ok() -> Self {
        Self {
            valid: true,
            slot: None,
            message: None,
        }
    }

    fn invalid(slot: SlotName, message: &str) -> Self {
        Self {
            valid: false,
            slot: Some(slot),
            message: Some(message.to_string()),
        }
    }

    /// The offending slot and its message, when invalid.
    pub fn offending(&self) -> Option<(SlotName, &str)> {
        match (&self.slot, &self.message) {
            (Some(slot), Some(message)) if !self.valid => Some((*slot, message.as_str())),
            _ => None,
        }
    }
}

fn parse_clock_time(time: &str) -> Option<(u32, u32)> {
    let (h, m) = time.split_once(':')?;
    if h.len() != 2 || m.len() != 2 {
        return None;
    }
    let hour: u32 = h.parse().ok()?;
    let minute: u32 = m.parse().ok()?;
    if hour > 23 || minute > 59 {
        return None;
    }
    Some((hour, minute))
}

/// Checks the supplied values in a fixed order, stopping at the first
/// violation. Absent fields are skipped — absence drives elicitation, not
/// rejection.
pub fn validate_booking(
    service_type: Option<&str>,
    date: Option<&str>,
    time: Option<&str>,
    today: NaiveDate,
) -> ValidationResult {
    if let Some(service) = service_type {
        if service_duration(service).is_none() {
            return ValidationResult::invalid(
                SlotName::ServiceType,
                "I did not recognize that, can I schedule a consultation or a full checkup for you?",
            );
        }
    }

    if let Some(time) = time {
        match parse_clock_time(time) {
            None => {
                return ValidationResult::invalid(
                    SlotName::Time,
                    "I did not recognize that, what time would you like to book your appointment?",
                )
            }
            Some((hour, minute)) => {
                if !(10..=16).contains(&hour) {
                    return ValidationResult::invalid(
                        SlotName::Time,
                        "Our business hours are ten a.m. to five p.m. What time works best for you?",
                    );
                }
                if minute != 0 && minute != 30 {
                    return ValidationResult::invalid(
                        SlotName::Time,
                        "We schedule appointments every half hour, what time works best for you?",
                    );
                }
            }
        }
    }

    if let Some(date) = date {
        match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
            Err(_) => {
                return ValidationResult::invalid(
                    SlotName::Date,
                    "I did not understand that, what date works best for you?",
                )
            }
            Ok(parsed) => {
                if parsed <= today {
                    return ValidationResult::invalid(
                        SlotName::Date,
                        "Appointments must be scheduled a day in advance. Can you try a different date?",
                    );
                }
                if parsed.weekday().num_days_from_monday() >= 5 {
                    return ValidationResult::invalid(
                        SlotName::Date,
                        "Our office is not open on the weekends, can you provide a work day?",
                    );
                }
            }
        }
    }

    ValidationResult::ok()
}
