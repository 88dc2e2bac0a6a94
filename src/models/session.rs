use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::models::slots::SlotSet;

/// Calendar date (ISO "YYYY-MM-DD") → the half-hour windows still open for
/// booking on that date. Generated lazily, once per date per session.
pub type AvailabilityMap = BTreeMap<String, BTreeSet<String>>;

pub const REMEMBERED_SLOTS_KEY: &str = "remembered_slots";
pub const AVAILABILITY_MAP_KEY: &str = "availability_map";
pub const FALLBACK_COUNT_KEY: &str = "fallback_count";
pub const LAST_BOOKING_KEY: &str = "last_booking";
pub const CONNECTED_TO_AGENT_KEY: &str = "connected_to_agent";

/// Typed view of one conversation's session. The flat string-to-string
/// attribute blob exchanged with the session store is parsed here, once, and
/// written back on the way out; attribute keys owned by other collaborators
/// pass through untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub remembered: SlotSet,
    pub availability: AvailabilityMap,
    pub fallback_count: u32,
    pub last_booking: Option<String>,
    pub connected_to_agent: bool,
}

impl SessionState {
    /// Malformed embedded blobs reset that piece of state rather than failing
    /// the turn.
    pub fn from_attributes(attrs: &HashMap<String, String>) -> Self {
        let remembered = attrs
            .get(REMEMBERED_SLOTS_KEY)
            .and_then(|raw| match serde_json::from_str(raw) {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    tracing::warn!(error = %e, "malformed remembered slots, starting empty");
                    None
                }
            })
            .unwrap_or_default();

        let availability = attrs
            .get(AVAILABILITY_MAP_KEY)
            .and_then(|raw| match serde_json::from_str(raw) {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    tracing::warn!(error = %e, "malformed availability map, starting empty");
                    None
                }
            })
            .unwrap_or_default();

        Self {
            remembered,
            availability,
            fallback_count: attrs
                .get(FALLBACK_COUNT_KEY)
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            last_booking: attrs.get(LAST_BOOKING_KEY).cloned(),
            connected_to_agent: attrs
                .get(CONNECTED_TO_AGENT_KEY)
                .map(|v| v == "true")
                .unwrap_or(false),
        }
    }

    pub fn write_attributes(&self, attrs: &mut HashMap<String, String>) -> anyhow::Result<()> {
        attrs.insert(
            REMEMBERED_SLOTS_KEY.to_string(),
            serde_json::to_string(&self.remembered)?,
        );
        attrs.insert(
            AVAILABILITY_MAP_KEY.to_string(),
            serde_json::to_string(&self.availability)?,
        );
        attrs.insert(
            FALLBACK_COUNT_KEY.to_string(),
            self.fallback_count.to_string(),
        );
        match &self.last_booking {
            Some(description) => {
                attrs.insert(LAST_BOOKING_KEY.to_string(), description.clone());
            }
            None => {
                attrs.remove(LAST_BOOKING_KEY);
            }
        }
        if self.connected_to_agent {
            attrs.insert(CONNECTED_TO_AGENT_KEY.to_string(), "true".to_string());
        } else {
            attrs.remove(CONNECTED_TO_AGENT_KEY);
        }
        Ok(())
    }

    pub fn increment_fallback(&mut self) -> u32 {
        self.fallback_count += 1;
        self.fallback_count
    }

    pub fn reset_fallback(&mut self) {
        self.fallback_count = 0;
    }
}
