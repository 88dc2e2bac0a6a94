use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::directive::DialogDirective;
use super::slots::RawSlots;

/// Which hook of the hosting dialog engine invoked us: mid-dialog validation
/// or final fulfillment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationPhase {
    #[default]
    Validation,
    Fulfillment,
}

/// The intents the assistant understands, resolved upstream by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    Welcome,
    BookAppointment,
    CheckAppointment,
    FaqQuery,
    AgentHandoff,
}

/// One parsed conversational turn, as POSTed by the hosting engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnEvent {
    pub user_id: String,
    pub intent: IntentKind,
    #[serde(default)]
    pub input_transcript: String,
    #[serde(default)]
    pub slots: RawSlots,
    #[serde(default)]
    pub phase: InvocationPhase,
}

/// The webhook reply: the directive plus the attribute blob the caller should
/// persist verbatim as the session's new state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnResponse {
    pub directive: DialogDirective,
    pub session_attributes: HashMap<String, String>,
}
