use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The booking fields, in the order the dialog asks for them. A field is
/// never elicited before every earlier field is present.
pub static ELICITATION_ORDER: [SlotName; 7] = [
    SlotName::ServiceType,
    SlotName::FullName,
    SlotName::ScreeningAnswer1,
    SlotName::ScreeningAnswer2,
    SlotName::ScreeningAnswer3,
    SlotName::Date,
    SlotName::Time,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SlotName {
    ServiceType,
    FullName,
    ScreeningAnswer1,
    ScreeningAnswer2,
    ScreeningAnswer3,
    Date,
    Time,
}

impl SlotName {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotName::ServiceType => "ServiceType",
            SlotName::FullName => "FullName",
            SlotName::ScreeningAnswer1 => "ScreeningAnswer1",
            SlotName::ScreeningAnswer2 => "ScreeningAnswer2",
            SlotName::ScreeningAnswer3 => "ScreeningAnswer3",
            SlotName::Date => "Date",
            SlotName::Time => "Time",
        }
    }
}

/// A raw per-turn slot value as delivered by the hosting dialog engine,
/// optionally with ranked candidate resolutions when the value was inferred
/// rather than typed verbatim.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawSlot {
    pub value: Option<String>,
    #[serde(default)]
    pub resolutions: Vec<String>,
}

impl RawSlot {
    pub fn verbatim(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            resolutions: vec![],
        }
    }
}

pub type RawSlots = BTreeMap<SlotName, RawSlot>;

/// Field-name → value mapping. Empty values count as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotSet {
    values: BTreeMap<SlotName, String>,
}

impl SlotSet {
    pub fn get(&self, slot: SlotName) -> Option<&str> {
        self.values.get(&slot).map(|v| v.as_str())
    }

    pub fn set(&mut self, slot: SlotName, value: impl Into<String>) {
        let value = value.into();
        if value.is_empty() {
            self.values.remove(&slot);
        } else {
            self.values.insert(slot, value);
        }
    }

    pub fn clear(&mut self, slot: SlotName) {
        self.values.remove(&slot);
    }

    pub fn is_filled(&self, slot: SlotName) -> bool {
        self.get(slot).is_some()
    }

    pub fn first_missing(&self, order: &[SlotName]) -> Option<SlotName> {
        order.iter().copied().find(|&slot| !self.is_filled(slot))
    }
}
