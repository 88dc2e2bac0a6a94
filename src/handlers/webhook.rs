use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use base64::Engine;
use chrono::Local;
use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{
    CloseOutcome, DialogDirective, IntentKind, SessionState, TurnEvent, TurnResponse,
};
use crate::services::dialog;
use crate::state::AppState;

fn validate_signature(secret: &str, signature: &str, body: &[u8]) -> bool {
    let mut mac = match Hmac::<Sha1>::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return false,
    };
    mac.update(body);
    let expected = base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes());

    expected == signature
}

pub async fn turn_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<TurnResponse>, AppError> {
    // Authenticate the calling engine (skip if no secret is configured — dev mode).
    if !state.config.webhook_secret.is_empty() {
        let signature = headers
            .get("x-webhook-signature")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        if signature.is_empty()
            || !validate_signature(&state.config.webhook_secret, signature, &body)
        {
            tracing::warn!("missing or invalid webhook signature");
            return Err(AppError::Forbidden);
        }
    }

    let event: TurnEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("invalid turn event: {e}")))?;

    tracing::info!(
        user_id = %event.user_id,
        intent = ?event.intent,
        phase = ?event.phase,
        "incoming turn"
    );

    // 1. Load the caller's session.
    let attributes = {
        let db = state.db.lock().unwrap();
        queries::get_session(&db, &event.user_id)?
    }
    .unwrap_or_default();

    let mut session = SessionState::from_attributes(&attributes);

    // 2. Route the turn by intent.
    let directive = match event.intent {
        IntentKind::Welcome => dialog::welcome(&session),
        IntentKind::CheckAppointment => dialog::check_appointment(&session),
        IntentKind::AgentHandoff => {
            dialog::agent_handoff(&mut session, &state.config.agent_handoff_url)
        }
        IntentKind::FaqQuery => {
            let answer = match state.search.query(&event.input_transcript).await {
                Ok(answer) => answer.map(|a| a.text),
                Err(e) => {
                    tracing::error!(error = %e, "search query failed");
                    None
                }
            };
            dialog::faq_answer(answer, &mut session)
        }
        IntentKind::BookAppointment => {
            let today = Local::now().date_naive();
            let mut rng = rand::thread_rng();
            match dialog::process_turn(
                &event.slots,
                &event.input_transcript,
                event.phase,
                &state.policies,
                &mut session,
                today,
                &mut rng,
            ) {
                Ok(directive) => directive,
                Err(e) => {
                    // The engine gets a clean close; the broken invariant goes
                    // to the log.
                    tracing::error!(error = %e, user_id = %event.user_id, "dialog turn failed");
                    DialogDirective::close(
                        CloseOutcome::Fulfilled,
                        "Sorry, I'm having trouble right now. Please try again in a moment.",
                    )
                }
            }
        }
    };

    // 3. Persist the mutated session and sweep expired ones.
    let mut session_attributes = attributes;
    session.write_attributes(&mut session_attributes)?;
    {
        let db = state.db.lock().unwrap();
        queries::save_session(&db, &event.user_id, &session_attributes)?;
        let _ = queries::expire_old_sessions(&db);
    }

    Ok(Json(TurnResponse {
        directive,
        session_attributes,
    }))
}
