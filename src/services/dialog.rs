use chrono::{Datelike, Duration, NaiveDate};
use rand::RngCore;

use crate::errors::CoreError;
use crate::models::directive::MAX_CARD_BUTTONS;
use crate::models::slots::ELICITATION_ORDER;
use crate::models::{
    CardButton, CloseOutcome, DialogDirective, InvocationPhase, RawSlots, ResponseCard,
    SessionState, SlotName, SlotSet,
};
use crate::services::availability;
use crate::services::memory::{self, SlotPolicies};
use crate::services::validator::{self, SERVICE_CATALOG};

/// Typing this (any casing) aborts the scheduling flow on any turn.
pub const CANCEL_PHRASE: &str = "cancel";

struct TurnContext<'a> {
    slots: SlotSet,
    session: &'a mut SessionState,
    phase: InvocationPhase,
    transcript: &'a str,
    today: NaiveDate,
    rng: &'a mut dyn RngCore,
}

type Rule = fn(&mut TurnContext<'_>) -> Result<Option<DialogDirective>, CoreError>;

/// The elicitation order and terminal conditions as an explicit rule table,
/// evaluated top-down: the first rule that yields a directive decides the
/// turn. The final rule always matches.
const DIALOG_RULES: &[(&str, Rule)] = &[
    ("cancellation requested", cancellation_requested),
    ("invalid slot value", reject_invalid_value),
    ("missing required field", elicit_next_missing),
    ("offer time windows", offer_time_windows),
    ("fulfil booking", fulfil_booking),
    ("defer to dialog engine", defer_to_engine),
];

/// One turn of the appointment-booking dialog. Reconciles slot memory, then
/// walks the rule table; the session is mutated in place and must be
/// persisted by the caller.
pub fn process_turn(
    slots: &RawSlots,
    transcript: &str,
    phase: InvocationPhase,
    policies: &SlotPolicies,
    session: &mut SessionState,
    today: NaiveDate,
    rng: &mut dyn RngCore,
) -> Result<DialogDirective, CoreError> {
    let merged = match memory::reconcile(slots, policies, session) {
        Ok(merged) => merged,
        Err(CoreError::FieldResolution { slot, message }) => {
            // A slot with no valid upstream interpretation ends the turn; the
            // message goes to the user verbatim.
            tracing::info!(slot = slot.as_str(), "slot resolution failed, closing turn");
            return Ok(DialogDirective::close(CloseOutcome::Fulfilled, message));
        }
        Err(other) => return Err(other),
    };

    // A scheduling turn means the user is no longer lost in FAQ fallbacks.
    session.reset_fallback();

    let mut ctx = TurnContext {
        slots: merged,
        session,
        phase,
        transcript,
        today,
        rng,
    };

    for &(name, rule) in DIALOG_RULES {
        if let Some(directive) = rule(&mut ctx)? {
            tracing::debug!(rule = name, "dialog rule produced directive");
            return Ok(directive);
        }
    }

    Err(CoreError::Contract("no dialog rule matched the turn".to_string()))
}

fn cancellation_requested(ctx: &mut TurnContext<'_>) -> Result<Option<DialogDirective>, CoreError> {
    if !ctx.transcript.trim().eq_ignore_ascii_case(CANCEL_PHRASE) {
        return Ok(None);
    }
    Ok(Some(DialogDirective::close(
        CloseOutcome::Cancelled,
        "Okay, I have stopped scheduling that appointment. Is there anything else I can help you with?",
    )))
}

fn reject_invalid_value(ctx: &mut TurnContext<'_>) -> Result<Option<DialogDirective>, CoreError> {
    if ctx.phase != InvocationPhase::Validation {
        return Ok(None);
    }
    let verdict = validator::validate_booking(
        ctx.slots.get(SlotName::ServiceType),
        ctx.slots.get(SlotName::Date),
        ctx.slots.get(SlotName::Time),
        ctx.today,
    );
    let Some((slot, message)) = verdict.offending() else {
        return Ok(None);
    };
    let message = message.to_string();
    ctx.slots.clear(slot);
    let card = suggestion_card(slot, &message, ctx)?;
    Ok(Some(DialogDirective::elicit_slot(slot, message, card)))
}

fn elicit_next_missing(ctx: &mut TurnContext<'_>) -> Result<Option<DialogDirective>, CoreError> {
    if ctx.phase != InvocationPhase::Validation {
        return Ok(None);
    }
    // Time is not elicited here: once the date is known, the scheduling rule
    // owns the rest of the conversation.
    let before_time = &ELICITATION_ORDER[..ELICITATION_ORDER.len() - 1];
    let Some(slot) = ctx.slots.first_missing(before_time) else {
        return Ok(None);
    };
    let message = match slot {
        SlotName::ServiceType => {
            "Sure thing! What type of appointment would you like to schedule?".to_string()
        }
        SlotName::FullName => "What is your first and last name?".to_string(),
        SlotName::ScreeningAnswer1 => {
            "Have you visited our office before? Please reply (Yes/No)".to_string()
        }
        SlotName::ScreeningAnswer2 => {
            "Do you need any accessibility accommodations during your visit? Please reply (Yes/No)"
                .to_string()
        }
        SlotName::ScreeningAnswer3 => {
            "Will you need parking at our office? Please reply (Yes/No)".to_string()
        }
        SlotName::Date => {
            let service = ctx
                .slots
                .get(SlotName::ServiceType)
                .unwrap_or("appointment");
            format!("When would you like to schedule your {service}?")
        }
        SlotName::Time => return Ok(None),
    };
    let card = suggestion_card(slot, &message, ctx)?;
    Ok(Some(DialogDirective::elicit_slot(slot, message, card)))
}

fn offer_time_windows(ctx: &mut TurnContext<'_>) -> Result<Option<DialogDirective>, CoreError> {
    if ctx.phase != InvocationPhase::Validation {
        return Ok(None);
    }
    let before_time = &ELICITATION_ORDER[..ELICITATION_ORDER.len() - 1];
    if ctx.slots.first_missing(before_time).is_some() {
        return Ok(None);
    }
    let service = required(&ctx.slots, SlotName::ServiceType)?;
    let date = required(&ctx.slots, SlotName::Date)?;
    let duration = validator::service_duration(&service).ok_or_else(|| {
        CoreError::Contract(format!("service {service:?} passed validation without a duration"))
    })?;

    // First touch generates and caches the day's windows; repeated lookups in
    // the same session stay deterministic.
    if !ctx.session.availability.contains_key(&date) {
        let parsed = NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|_| {
            CoreError::Contract(format!("date {date:?} passed validation but does not parse"))
        })?;
        let windows = availability::generate_availability(parsed, ctx.rng);
        tracing::debug!(date = %date, windows = windows.len(), "generated day availability");
        ctx.session.availability.insert(date.clone(), windows);
    }
    let windows = ctx
        .session
        .availability
        .get(&date)
        .cloned()
        .ok_or_else(|| CoreError::Contract(format!("availability for {date} vanished")))?;

    let open_starts = availability::filter_by_duration(duration, &windows)?;
    if open_starts.is_empty() {
        // Nothing that day at all; never silently pick another day.
        ctx.slots.clear(SlotName::Date);
        ctx.slots.clear(SlotName::Time);
        let card = ResponseCard::new(
            "Specify date",
            "What day works best for you?",
            date_buttons(ctx.today),
        );
        return Ok(Some(DialogDirective::elicit_slot(
            SlotName::Date,
            "We do not have any availability on that date, is there another day which works for you?",
            Some(card),
        )));
    }

    let mut preface = format!("What time on {date} works for you? ");
    if let Some(time) = ctx.slots.get(SlotName::Time) {
        if availability::is_bookable(time, duration, &windows)? {
            // Everything is present and bookable: terminal pre-booking state.
            return Ok(Some(DialogDirective::delegate()));
        }
        preface = "The time you requested is not available. ".to_string();
    }

    if open_starts.len() == 1 {
        let only = open_starts[0].clone();
        let formatted = availability::format_time(&only)?;
        ctx.slots.set(SlotName::Time, only);
        let card = ResponseCard::new(
            "Confirm appointment",
            format!("Is {formatted} on {date} okay?"),
            vec![CardButton::new("yes", "yes"), CardButton::new("no", "no")],
        );
        return Ok(Some(DialogDirective::confirm(
            format!("{preface}{formatted} is our only availability, does that work for you?"),
            Some(card),
        )));
    }

    let summary = availability::summarize_times(&open_starts)?;
    let buttons = time_buttons_from(&open_starts)?;
    let card = ResponseCard::new("Specify time", "What time works best for you?", buttons);
    Ok(Some(DialogDirective::elicit_slot(
        SlotName::Time,
        format!("{preface}{summary}"),
        Some(card),
    )))
}

fn fulfil_booking(ctx: &mut TurnContext<'_>) -> Result<Option<DialogDirective>, CoreError> {
    if ctx.phase != InvocationPhase::Fulfillment {
        return Ok(None);
    }
    if ctx.slots.first_missing(&ELICITATION_ORDER).is_some() {
        return Ok(None);
    }
    let service = required(&ctx.slots, SlotName::ServiceType)?;
    let name = required(&ctx.slots, SlotName::FullName)?;
    let date = required(&ctx.slots, SlotName::Date)?;
    let time = required(&ctx.slots, SlotName::Time)?;
    let duration = validator::service_duration(&service).ok_or_else(|| {
        CoreError::Contract(format!("service {service:?} has no configured duration"))
    })?;

    if ctx.session.availability.contains_key(&date) {
        availability::book_slot(&date, &time, duration, &mut ctx.session.availability)?;
    } else {
        // The dialog engine owns phase sequencing; a missing day here is a
        // bookkeeping inconsistency, not a reason to fail the conversation.
        tracing::warn!(date = %date, "availability missing at fulfillment time, skipping booking mutation");
    }

    let formatted = availability::format_time(&time)?;
    ctx.session.last_booking = Some(format!("{formatted} at {date}"));

    Ok(Some(DialogDirective::close(
        CloseOutcome::Fulfilled,
        format!("Okay, I have booked your appointment, {name}. We will see you at {formatted} on {date}"),
    )))
}

fn defer_to_engine(_ctx: &mut TurnContext<'_>) -> Result<Option<DialogDirective>, CoreError> {
    Ok(Some(DialogDirective::delegate()))
}

fn required(slots: &SlotSet, slot: SlotName) -> Result<String, CoreError> {
    slots
        .get(slot)
        .map(str::to_string)
        .ok_or_else(|| CoreError::Contract(format!("slot {} missing", slot.as_str())))
}

/// Multiple-choice suggestions for a slot, where suggestions exist: the
/// service catalog, the next five weekdays, or the chosen day's open times.
fn suggestion_card(
    slot: SlotName,
    subtitle: &str,
    ctx: &TurnContext<'_>,
) -> Result<Option<ResponseCard>, CoreError> {
    let buttons = match slot {
        SlotName::ServiceType => service_buttons(),
        SlotName::Date => date_buttons(ctx.today),
        SlotName::Time => cached_time_buttons(&ctx.slots, &*ctx.session)?,
        _ => Vec::new(),
    };
    if buttons.is_empty() {
        return Ok(None);
    }
    let title = match slot {
        SlotName::ServiceType => "Specify appointment type",
        SlotName::Date => "Specify date",
        SlotName::Time => "Specify time",
        _ => "Specify value",
    };
    Ok(Some(ResponseCard::new(title, subtitle, buttons)))
}

fn service_buttons() -> Vec<CardButton> {
    SERVICE_CATALOG
        .iter()
        .map(|&(name, minutes)| CardButton::new(format!("{} ({minutes} min)", capitalize(name)), name))
        .collect()
}

/// The next five weekdays from today. Texts are display-friendly; values are
/// ISO dates the machine accepts back.
fn date_buttons(today: NaiveDate) -> Vec<CardButton> {
    const DAY_ABBREV: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
    let mut buttons = Vec::new();
    let mut day = today;
    while buttons.len() < MAX_CARD_BUTTONS {
        day = day + Duration::days(1);
        let weekday = day.weekday().num_days_from_monday() as usize;
        if weekday < 5 {
            buttons.push(CardButton::new(
                format!("{}-{} ({})", day.month(), day.day(), DAY_ABBREV[weekday]),
                day.format("%Y-%m-%d").to_string(),
            ));
        }
    }
    buttons
}

/// Open times for the already-chosen service and date, when the day's
/// availability has been generated.
fn cached_time_buttons(
    slots: &SlotSet,
    session: &SessionState,
) -> Result<Vec<CardButton>, CoreError> {
    let (Some(service), Some(date)) = (slots.get(SlotName::ServiceType), slots.get(SlotName::Date))
    else {
        return Ok(Vec::new());
    };
    let Some(duration) = validator::service_duration(service) else {
        return Ok(Vec::new());
    };
    let Some(windows) = session.availability.get(date) else {
        return Ok(Vec::new());
    };
    let starts = availability::filter_by_duration(duration, windows)?;
    time_buttons_from(&starts)
}

fn time_buttons_from(starts: &[String]) -> Result<Vec<CardButton>, CoreError> {
    starts
        .iter()
        .take(MAX_CARD_BUTTONS)
        .map(|start| Ok(CardButton::new(availability::format_time(start)?, start.clone())))
        .collect()
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().to_string() + chars.as_str(),
    }
}

// ── Intent closes ──

/// Greeting for the welcome intent, personalized when the session already
/// knows the caller.
pub fn welcome(session: &SessionState) -> DialogDirective {
    let message = match session.remembered.get(SlotName::FullName) {
        Some(name) => format!(
            "Hi {name}! How can I help you today?\nAsk a question, or say \"schedule\" to book an appointment."
        ),
        None => "Hi there! How can I help you today?\nAsk a question, or say \"schedule\" to book an appointment."
            .to_string(),
    };
    DialogDirective::close(CloseOutcome::Fulfilled, message)
}

pub fn check_appointment(session: &SessionState) -> DialogDirective {
    let message = match &session.last_booking {
        Some(description) => format!("You have an appointment booked at {description}"),
        None => "You haven't scheduled any appointments yet.".to_string(),
    };
    DialogDirective::close(CloseOutcome::Fulfilled, message)
}

/// Hands the conversation to a human agent.
pub fn agent_handoff(session: &mut SessionState, handoff_url: &str) -> DialogDirective {
    session.connected_to_agent = true;
    let greeting = match session.remembered.get(SlotName::FullName) {
        Some(name) => format!("Okay {name}."),
        None => "Okay.".to_string(),
    };
    let message = if handoff_url.is_empty() {
        format!("{greeting} Connecting you with an agent now. Thank you!")
    } else {
        format!("{greeting} Please tap here to connect with an agent: {handoff_url}. Thank you!")
    };
    DialogDirective::close(CloseOutcome::Fulfilled, message)
}

/// Wraps a search answer (or its absence) for the FAQ intent and counts the
/// turn against the consecutive-fallback counter.
pub fn faq_answer(answer: Option<String>, session: &mut SessionState) -> DialogDirective {
    let count = session.increment_fallback();
    tracing::debug!(fallback_count = count, answered = answer.is_some(), "FAQ turn");
    let message =
        answer.unwrap_or_else(|| "Sorry, I was not able to understand your question.".to_string());
    DialogDirective::close(CloseOutcome::Fulfilled, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::models::RawSlot;

    // 2026-08-06 is a Thursday; the following Mon/Tue/Wed/Fri are the 10th,
    // 11th, 12th and 14th.
    const TODAY: &str = "2026-08-06";
    const TUESDAY: &str = "2026-08-11";
    const WEDNESDAY: &str = "2026-08-12";

    fn today() -> NaiveDate {
        NaiveDate::parse_from_str(TODAY, "%Y-%m-%d").unwrap()
    }

    fn raw(pairs: &[(SlotName, &str)]) -> RawSlots {
        pairs
            .iter()
            .map(|&(slot, value)| (slot, RawSlot::verbatim(value)))
            .collect()
    }

    fn booking_slots(date: &str, time: Option<&str>) -> RawSlots {
        let mut pairs = vec![
            (SlotName::ServiceType, "full checkup"),
            (SlotName::FullName, "Jane Doe"),
            (SlotName::ScreeningAnswer1, "No"),
            (SlotName::ScreeningAnswer2, "No"),
            (SlotName::ScreeningAnswer3, "No"),
            (SlotName::Date, date),
        ];
        if let Some(time) = time {
            pairs.push((SlotName::Time, time));
        }
        raw(&pairs)
    }

    fn run_transcript(
        slots: RawSlots,
        transcript: &str,
        phase: InvocationPhase,
        session: &mut SessionState,
    ) -> DialogDirective {
        let mut rng = StdRng::seed_from_u64(7);
        process_turn(
            &slots,
            transcript,
            phase,
            &SlotPolicies::default(),
            session,
            today(),
            &mut rng,
        )
        .unwrap()
    }

    fn run(slots: RawSlots, phase: InvocationPhase, session: &mut SessionState) -> DialogDirective {
        run_transcript(slots, "", phase, session)
    }

    fn expect_elicit(directive: DialogDirective) -> (SlotName, String, Option<ResponseCard>) {
        match directive {
            DialogDirective::ElicitSlot { slot, message, card } => (slot, message, card),
            other => panic!("expected ElicitSlot, got {other:?}"),
        }
    }

    #[test]
    fn test_cancel_phrase_closes_cancelled() {
        let mut session = SessionState::default();
        let directive = run_transcript(
            RawSlots::new(),
            "Cancel",
            InvocationPhase::Validation,
            &mut session,
        );
        assert!(matches!(
            directive,
            DialogDirective::Close {
                outcome: CloseOutcome::Cancelled,
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_service_reelicited_with_catalog_card() {
        let mut session = SessionState::default();
        let directive = run(
            raw(&[(SlotName::ServiceType, "haircut")]),
            InvocationPhase::Validation,
            &mut session,
        );
        let (slot, message, card) = expect_elicit(directive);
        assert_eq!(slot, SlotName::ServiceType);
        assert!(message.contains("did not recognize"));
        let card = card.expect("expected a service card");
        assert_eq!(card.buttons.len(), 2);
        assert_eq!(card.buttons[0].value, "consultation");
        assert_eq!(card.buttons[0].text, "Consultation (30 min)");
    }

    #[test]
    fn test_elicitation_walks_the_field_order() {
        let mut session = SessionState::default();
        let directive = run(RawSlots::new(), InvocationPhase::Validation, &mut session);
        let (slot, _, _) = expect_elicit(directive);
        assert_eq!(slot, SlotName::ServiceType);

        let directive = run(
            raw(&[(SlotName::ServiceType, "consultation")]),
            InvocationPhase::Validation,
            &mut session,
        );
        let (slot, message, _) = expect_elicit(directive);
        assert_eq!(slot, SlotName::FullName);
        assert!(message.contains("first and last name"));

        // Service type is remembered from the previous turn.
        let directive = run(
            raw(&[(SlotName::FullName, "Jane Doe")]),
            InvocationPhase::Validation,
            &mut session,
        );
        let (slot, _, _) = expect_elicit(directive);
        assert_eq!(slot, SlotName::ScreeningAnswer1);

        let directive = run(
            raw(&[(SlotName::ScreeningAnswer1, "No")]),
            InvocationPhase::Validation,
            &mut session,
        );
        assert_eq!(expect_elicit(directive).0, SlotName::ScreeningAnswer2);

        let directive = run(
            raw(&[(SlotName::ScreeningAnswer2, "No")]),
            InvocationPhase::Validation,
            &mut session,
        );
        assert_eq!(expect_elicit(directive).0, SlotName::ScreeningAnswer3);

        let directive = run(
            raw(&[(SlotName::ScreeningAnswer3, "No")]),
            InvocationPhase::Validation,
            &mut session,
        );
        let (slot, message, card) = expect_elicit(directive);
        assert_eq!(slot, SlotName::Date);
        assert!(message.contains("consultation"));
        let card = card.expect("expected a date card");
        assert_eq!(card.buttons.len(), 5);
        // Tomorrow is Friday the 7th; the weekend is skipped.
        assert_eq!(card.buttons[0].value, "2026-08-07");
        assert_eq!(card.buttons[1].value, "2026-08-10");
    }

    #[test]
    fn test_day_without_availability_reelicits_date() {
        let mut session = SessionState::default();
        let directive = run(
            booking_slots(TUESDAY, None),
            InvocationPhase::Validation,
            &mut session,
        );
        let (slot, message, card) = expect_elicit(directive);
        assert_eq!(slot, SlotName::Date);
        assert!(message.contains("do not have any availability"));
        assert!(card.is_some());
        // The empty day stays cached for the rest of the session.
        assert!(session.availability[TUESDAY].is_empty());
    }

    #[test]
    fn test_single_window_proposed_for_confirmation() {
        let mut session = SessionState::default();
        // A 60-minute service on a Wednesday leaves exactly one start: 16:00.
        let directive = run(
            booking_slots(WEDNESDAY, None),
            InvocationPhase::Validation,
            &mut session,
        );
        match directive {
            DialogDirective::ConfirmIntent { message, card } => {
                assert!(message.contains("4:00 p.m. is our only availability"));
                let card = card.expect("expected a yes/no card");
                assert_eq!(card.buttons.len(), 2);
            }
            other => panic!("expected ConfirmIntent, got {other:?}"),
        }
    }

    #[test]
    fn test_multiple_windows_elicit_time_with_summary() {
        let mut session = SessionState::default();
        let mut slots = booking_slots(WEDNESDAY, None);
        slots.insert(SlotName::ServiceType, RawSlot::verbatim("consultation"));
        let directive = run(slots, InvocationPhase::Validation, &mut session);
        let (slot, message, card) = expect_elicit(directive);
        assert_eq!(slot, SlotName::Time);
        assert!(message
            .contains("We have time availabilities at 10:00 a.m., 4:00 p.m. and 4:30 p.m."));
        let card = card.expect("expected a time card");
        let values: Vec<&str> = card.buttons.iter().map(|b| b.value.as_str()).collect();
        assert_eq!(values, vec!["10:00", "16:00", "16:30"]);
    }

    #[test]
    fn test_bookable_requested_time_delegates() {
        let mut session = SessionState::default();
        let directive = run(
            booking_slots(WEDNESDAY, Some("16:00")),
            InvocationPhase::Validation,
            &mut session,
        );
        assert_eq!(directive, DialogDirective::Delegate);
    }

    #[test]
    fn test_unbookable_requested_time_notes_it() {
        let mut session = SessionState::default();
        // 10:00 cannot host a 60-minute booking on a Wednesday.
        let directive = run(
            booking_slots(WEDNESDAY, Some("10:00")),
            InvocationPhase::Validation,
            &mut session,
        );
        match directive {
            DialogDirective::ConfirmIntent { message, .. } => {
                assert!(message.starts_with("The time you requested is not available."));
            }
            other => panic!("expected ConfirmIntent, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_time_cleared_and_reelicited() {
        let mut session = SessionState::default();
        let directive = run(
            booking_slots(WEDNESDAY, Some("10:15")),
            InvocationPhase::Validation,
            &mut session,
        );
        let (slot, message, _) = expect_elicit(directive);
        assert_eq!(slot, SlotName::Time);
        assert!(message.contains("every half hour"));
    }

    #[test]
    fn test_weekend_date_reelicited() {
        let mut session = SessionState::default();
        // 2026-08-08 is a Saturday.
        let directive = run(
            booking_slots("2026-08-08", None),
            InvocationPhase::Validation,
            &mut session,
        );
        let (slot, message, _) = expect_elicit(directive);
        assert_eq!(slot, SlotName::Date);
        assert!(message.contains("weekends"));
    }

    #[test]
    fn test_fulfillment_books_and_closes() {
        let mut session = SessionState::default();
        // Prime the day's availability the way a validation turn would.
        let directive = run(
            booking_slots(WEDNESDAY, Some("16:00")),
            InvocationPhase::Validation,
            &mut session,
        );
        assert_eq!(directive, DialogDirective::Delegate);

        let directive = run(
            booking_slots(WEDNESDAY, Some("16:00")),
            InvocationPhase::Fulfillment,
            &mut session,
        );
        match directive {
            DialogDirective::Close { outcome, message } => {
                assert_eq!(outcome, CloseOutcome::Fulfilled);
                assert!(message.contains("Jane Doe"));
                assert!(message.contains("4:00 p.m."));
                assert!(message.contains(WEDNESDAY));
            }
            other => panic!("expected Close, got {other:?}"),
        }
        // Both halves of the hour are gone.
        let remaining: Vec<&str> = session.availability[WEDNESDAY]
            .iter()
            .map(String::as_str)
            .collect();
        assert_eq!(remaining, vec!["10:00"]);
        assert_eq!(
            session.last_booking.as_deref(),
            Some(format!("4:00 p.m. at {WEDNESDAY}").as_str())
        );
    }

    #[test]
    fn test_fulfillment_without_cached_availability_still_closes() {
        let mut session = SessionState::default();
        let directive = run(
            booking_slots(WEDNESDAY, Some("16:00")),
            InvocationPhase::Fulfillment,
            &mut session,
        );
        assert!(matches!(directive, DialogDirective::Close { .. }));
        // The mutation was skipped; nothing was ever generated.
        assert!(session.availability.is_empty());
    }

    #[test]
    fn test_incomplete_fulfillment_turn_delegates() {
        let mut session = SessionState::default();
        let directive = run(
            raw(&[(SlotName::ServiceType, "consultation")]),
            InvocationPhase::Fulfillment,
            &mut session,
        );
        assert_eq!(directive, DialogDirective::Delegate);
    }

    #[test]
    fn test_booking_turn_resets_fallback_counter() {
        let mut session = SessionState::default();
        faq_answer(None, &mut session);
        faq_answer(None, &mut session);
        assert_eq!(session.fallback_count, 2);
        run(RawSlots::new(), InvocationPhase::Validation, &mut session);
        assert_eq!(session.fallback_count, 0);
    }

    #[test]
    fn test_welcome_personalization() {
        let mut session = SessionState::default();
        match welcome(&session) {
            DialogDirective::Close { message, .. } => assert!(message.contains("Hi there!")),
            other => panic!("expected Close, got {other:?}"),
        }
        session.remembered.set(SlotName::FullName, "Jane Doe");
        match welcome(&session) {
            DialogDirective::Close { message, .. } => assert!(message.contains("Hi Jane Doe!")),
            other => panic!("expected Close, got {other:?}"),
        }
    }

    #[test]
    fn test_check_appointment_reports_last_booking() {
        let mut session = SessionState::default();
        match check_appointment(&session) {
            DialogDirective::Close { message, .. } => {
                assert!(message.contains("haven't scheduled"))
            }
            other => panic!("expected Close, got {other:?}"),
        }
        session.last_booking = Some("4:00 p.m. at 2026-08-12".to_string());
        match check_appointment(&session) {
            DialogDirective::Close { message, .. } => {
                assert!(message.contains("booked at 4:00 p.m. at 2026-08-12"))
            }
            other => panic!("expected Close, got {other:?}"),
        }
    }

    #[test]
    fn test_agent_handoff_marks_session() {
        let mut session = SessionState::default();
        let directive = agent_handoff(&mut session, "https://support.example.com/agent");
        assert!(session.connected_to_agent);
        match directive {
            DialogDirective::Close { message, .. } => {
                assert!(message.contains("https://support.example.com/agent"))
            }
            other => panic!("expected Close, got {other:?}"),
        }
    }

    #[test]
    fn test_resolution_failure_closes_with_message() {
        use crate::services::memory::{FieldPolicy, ResolutionMode};

        let policies = SlotPolicies::default().with_policy(
            SlotName::ServiceType,
            FieldPolicy {
                remember: true,
                resolution: ResolutionMode::TopResolution,
            },
        );
        let mut session = SessionState::default();
        let mut rng = StdRng::seed_from_u64(7);
        let directive = process_turn(
            &raw(&[(SlotName::ServiceType, "mystery")]),
            "",
            InvocationPhase::Validation,
            &policies,
            &mut session,
            today(),
            &mut rng,
        )
        .unwrap();
        match directive {
            DialogDirective::Close { outcome, message } => {
                assert_eq!(outcome, CloseOutcome::Fulfilled);
                assert!(message.contains("mystery"));
            }
            other => panic!("expected Close, got {other:?}"),
        }
    }
}
