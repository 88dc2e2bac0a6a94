use std::collections::BTreeMap;

use crate::errors::CoreError;
use crate::models::slots::{RawSlots, SlotName, SlotSet, ELICITATION_ORDER};
use crate::models::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionMode {
    /// Use the value exactly as supplied.
    Verbatim,
    /// Replace the value with the top-ranked upstream resolution; an empty
    /// resolution list is a field-scoped error.
    TopResolution,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldPolicy {
    pub remember: bool,
    pub resolution: ResolutionMode,
}

/// Per-field configuration of the session memory: which fields stick across
/// turns and how raw values are resolved.
#[derive(Debug, Clone)]
pub struct SlotPolicies {
    policies: BTreeMap<SlotName, FieldPolicy>,
}

impl Default for SlotPolicies {
    /// Every field sticky, every field verbatim.
    fn default() -> Self {
        let policies = ELICITATION_ORDER
            .iter()
            .map(|&slot| {
                (
                    slot,
                    FieldPolicy {
                        remember: true,
                        resolution: ResolutionMode::Verbatim,
                    },
                )
            })
            .collect();
        Self { policies }
    }
}

impl SlotPolicies {
    pub fn with_policy(mut self, slot: SlotName, policy: FieldPolicy) -> Self {
        self.policies.insert(slot, policy);
        self
    }

    fn get(&self, slot: SlotName) -> FieldPolicy {
        self.policies.get(&slot).copied().unwrap_or(FieldPolicy {
            remember: false,
            resolution: ResolutionMode::Verbatim,
        })
    }
}

/// Merges freshly supplied values with the session's remembered ones, then
/// persists the rememberable subset of the result back into the session so
/// the next turn sees it without the user repeating anything.
pub fn reconcile(
    fresh: &RawSlots,
    policies: &SlotPolicies,
    session: &mut SessionState,
) -> Result<SlotSet, CoreError> {
    let mut merged = SlotSet::default();

    for &slot in &ELICITATION_ORDER {
        let policy = policies.get(slot);
        let supplied = fresh
            .get(&slot)
            .and_then(|raw| raw.value.as_deref())
            .filter(|v| !v.is_empty());

        match supplied {
            Some(value) => {
                let resolved = match policy.resolution {
                    ResolutionMode::Verbatim => value.to_string(),
                    ResolutionMode::TopResolution => {
                        match fresh.get(&slot).and_then(|raw| raw.resolutions.first()) {
                            Some(top) => top.clone(),
                            None => {
                                return Err(CoreError::FieldResolution {
                                    slot,
                                    message: format!("Sorry, I don't understand \"{value}\"."),
                                })
                            }
                        }
                    }
                };
                tracing::debug!(slot = slot.as_str(), value = %resolved, "using supplied slot value");
                merged.set(slot, resolved);
            }
            None => {
                if policy.remember {
                    if let Some(previous) = session.remembered.get(slot) {
                        tracing::debug!(slot = slot.as_str(), "backfilling slot from session memory");
                        merged.set(slot, previous.to_string());
                    }
                }
            }
        }
    }

    let mut remembered = SlotSet::default();
    for &slot in &ELICITATION_ORDER {
        if policies.get(slot).remember {
            if let Some(value) = merged.get(slot) {
                remembered.set(slot, value.to_string());
            }
        }
    }
    session.remembered = remembered;

    Ok(merged)
}
