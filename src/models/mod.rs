pub mod directive;
pub mod session;
pub mod slots;
pub mod turn;

pub use directive::{CardButton, CloseOutcome, DialogDirective, ResponseCard};
pub use session::{AvailabilityMap, SessionState};
pub use slots::{RawSlot, RawSlots, SlotName, SlotSet, ELICITATION_ORDER};
pub use turn::{IntentKind, InvocationPhase, TurnEvent, TurnResponse};
