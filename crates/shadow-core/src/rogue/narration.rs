//! Narration for autonomous events.

use super::RogueEventKind;
use crate::adapters::Generator;

const NARRATION_TEMPERATURE: f32 = 0.8;

const NARRATOR_PROMPT: &str = "You are a narrator for a Cold War spy thriller game. \
Generate a short, dramatic, tense narration (2-3 paragraphs max) for a rogue event. \
Write it like an intelligence alert or field report — urgent, professional, \
with dramatic tension. \
Do NOT use character dialogue. Write in third person from the agency's perspective. \
Keep it under 150 words.";

/// Fixed text used when generation is unavailable.
pub fn fallback_narration(kind: RogueEventKind, codename: &str) -> String {
    match kind {
        RogueEventKind::DefectionWarning => format!(
            "ALERT: {codename} has reported being approached by an unknown foreign \
             intelligence operative. The contact attempted to recruit {codename} using \
             undisclosed leverage. {codename} has self-reported this contact per protocol. \
             Assessment: volatile situation requiring immediate Director attention."
        ),
        RogueEventKind::SilentDefection => format!(
            "CRITICAL: All communication channels with {codename} have gone silent. Last \
             contact was 6 hours ago. Extraction team on standby. All assets in the region \
             should assume compromise. This is not a drill."
        ),
        RogueEventKind::DoubleAgentActivation => "ANOMALY: Pattern analysis has flagged \
             inconsistencies in recent intelligence from the field. Multiple data points \
             suggest possible information manipulation. Source cannot be confirmed. Recommend \
             enhanced verification protocols on all incoming intelligence."
            .to_string(),
        RogueEventKind::UnsanctionedAction => format!(
            "BREACH: {codename} has conducted an unauthorized field operation without \
             Director approval. Details are still emerging but initial reports suggest \
             significant operational exposure. Regional assets may be at risk."
        ),
        RogueEventKind::ExternalContact => format!(
            "WARNING: Signals intelligence has detected an unauthorized communication \
             channel near {codename}'s operating area. A foreign intelligence service \
             appears to have made contact. {codename}'s response is unknown."
        ),
        RogueEventKind::CompromiseWarning => "INTEL: An operative has flagged concerns \
             about the reliability of a network asset. Internal review recommended. Details \
             classified pending Director assessment."
            .to_string(),
    }
}

/// Generate narration for an event, falling back to fixed text.
pub async fn narrate(
    generator: &dyn Generator,
    kind: RogueEventKind,
    codename: &str,
    context: &str,
) -> String {
    let user = format!(
        "Operative codename: {codename}\nEvent type: {kind}\nContext: {context}\n\n\
         Generate the rogue event narration."
    );
    match generator.complete(NARRATOR_PROMPT, &user, NARRATION_TEMPERATURE).await {
        Ok(text) if !text.trim().is_empty() => text,
        Ok(_) => fallback_narration(kind, codename),
        Err(e) => {
            tracing::error!(
                codename = %codename,
                kind = %kind,
                error = %e,
                "Rogue narration failed"
            );
            fallback_narration(kind, codename)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallbacks_name_the_operative_unless_hidden() {
        assert!(fallback_narration(RogueEventKind::SilentDefection, "GHOST").contains("GHOST"));
        assert!(fallback_narration(RogueEventKind::ExternalContact, "SABLE").contains("SABLE"));
        let anomaly = fallback_narration(RogueEventKind::DoubleAgentActivation, "GHOST");
        assert!(!anomaly.contains("GHOST"));
        let warning = fallback_narration(RogueEventKind::CompromiseWarning, "CEDAR");
        assert!(warning.starts_with("INTEL:"));
    }
}
