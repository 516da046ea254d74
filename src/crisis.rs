//! Crisis gate: pre-retrieval safety short-circuit on self-harm language.
//!
//! Runs before any external call, so crisis responses are fast and never
//! depend on backend availability. Matching is case-insensitive substring
//! membership — not word-boundary-aware — so any embedded hit triggers.

use crate::models::CrisisDecision;

/// Phrases that trigger the crisis short-circuit.
const CRISIS_PHRASES: &[&str] = &[
    "kill myself",
    "suicide",
    "end my life",
    "want to die",
    "self-harm",
    "hurt myself",
    "cutting",
    "suicidal",
];

/// Fixed resource message returned on the crisis path.
pub const CRISIS_MESSAGE: &str = "I'm deeply concerned about what you're going through. \
Please reach out for immediate support:\n\n\
\u{2022} **National Suicide Prevention Lifeline**: 988 (24/7)\n\
\u{2022} **Crisis Text Line**: Text HOME to 741741\n\
\u{2022} **International Association for Suicide Prevention**: \
https://www.iasp.info/resources/Crisis_Centres/\n\n\
Your life has immeasurable value. Please don't face this alone\u{2014}trained \
counselors are ready to help right now.";

/// Evaluate the concern text against the crisis phrase list.
pub fn evaluate(text: &str) -> CrisisDecision {
    let lowered = text.to_lowercase();
    let triggered = CRISIS_PHRASES
        .iter()
        .any(|phrase| lowered.contains(phrase));

    CrisisDecision {
        triggered,
        message: CRISIS_MESSAGE,
    }
}
