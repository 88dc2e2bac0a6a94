use serde::{Deserialize, Serialize};

use super::slots::SlotName;

/// Response cards never show more than five options.
pub const MAX_CARD_BUTTONS: usize = 5;

/// The sole output contract of the dialog core: what the hosting engine
/// should do next with the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DialogDirective {
    ElicitSlot {
        slot: SlotName,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        card: Option<ResponseCard>,
    },
    ConfirmIntent {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        card: Option<ResponseCard>,
    },
    Delegate,
    Close {
        outcome: CloseOutcome,
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseOutcome {
    Fulfilled,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseCard {
    pub title: String,
    pub subtitle: String,
    pub buttons: Vec<CardButton>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardButton {
    pub text: String,
    pub value: String,
}

impl CardButton {
    pub fn new(text: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            value: value.into(),
        }
    }
}

impl ResponseCard {
    pub fn new(
        title: impl Into<String>,
        subtitle: impl Into<String>,
        mut buttons: Vec<CardButton>,
    ) -> Self {
        buttons.truncate(MAX_CARD_BUTTONS);
        Self {
            title: title.into(),
            subtitle: subtitle.into(),
            buttons,
        }
    }
}

impl DialogDirective {
    pub fn elicit_slot(
        slot: SlotName,
        message: impl Into<String>,
        card: Option<ResponseCard>,
    ) -> Self {
        DialogDirective::ElicitSlot {
            slot,
            message: message.into(),
            card,
        }
    }

    pub fn confirm(message: impl Into<String>, card: Option<ResponseCard>) -> Self {
        DialogDirective::ConfirmIntent {
            message: message.into(),
            card,
        }
    }

    pub fn delegate() -> Self {
        DialogDirective::Delegate
    }

    pub fn close(outcome: CloseOutcome, message: impl Into<String>) -> Self {
        DialogDirective::Close {
            outcome,
            message: message.into(),
        }
    }
}
