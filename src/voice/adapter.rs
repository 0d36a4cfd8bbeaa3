//! Voice adapter (spec §4.5): for voice-channel targets, issues an
//! outbound call request carrying either a hosted callback URL or an
//! inline script document.

use crate::model::{Alert, Assignment, Channel};
use crate::notification::NotificationPort;
use crate::voice::provider::{CallInstruction, VoiceProvider};
use crate::voice::script::VoiceScriptGenerator;
use async_trait::async_trait;

/// Chooses what the outbound call instructs Twilio to do. The hosted
/// variant points at our own `/prompt` webhook and is the default: it
/// lets the prompt respond to a later `advance`-driven re-page with
/// up-to-date alert state. The inline variant embeds the prompt document
/// directly, skipping a round trip, at the cost of the instruction being
/// frozen at dispatch time.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum InstructionMode {
    HostedPrompt,
    InlinePrompt,
}

pub struct VoiceAdapter {
    from_number: String,
    provider: Box<dyn VoiceProvider>,
    script: VoiceScriptGenerator,
    mode: InstructionMode,
}

impl VoiceAdapter {
    pub fn new(
        from_number: impl Into<String>,
        provider: Box<dyn VoiceProvider>,
        script: VoiceScriptGenerator,
    ) -> Self {
        VoiceAdapter {
            from_number: from_number.into(),
            provider,
            script,
            mode: InstructionMode::HostedPrompt,
        }
    }

    pub fn with_mode(mut self, mode: InstructionMode) -> Self {
        self.mode = mode;
        self
    }

    fn instruction_for(&self, alert: &Alert, assignment: &Assignment) -> CallInstruction {
        match self.mode {
            InstructionMode::HostedPrompt => {
                CallInstruction::HostedUrl(self.script.prompt_url(alert.id, assignment.token))
            }
            InstructionMode::InlinePrompt => {
                CallInstruction::InlineDocument(self.script.prompt(alert, assignment.token))
            }
        }
    }
}

#[async_trait]
impl NotificationPort for VoiceAdapter {
    async fn notify(&self, alert: &Alert, assignment: &Assignment) {
        if assignment.target.channel != Channel::Voice {
            return;
        }

        if assignment.target.address.trim().is_empty() {
            tracing::warn!(
                alert_id = %alert.id,
                assignment_id = %assignment.id,
                "voice target has an empty address, skipping"
            );
            return;
        }

        let instruction = self.instruction_for(alert, assignment);

        match self
            .provider
            .place_call(&self.from_number, &assignment.target.address, instruction)
            .await
        {
            Ok(call_id) => {
                tracing::info!(
                    alert_id = %alert.id,
                    assignment_id = %assignment.id,
                    call_id = %call_id.0,
                    "placed outbound voice call"
                );
            }
            Err(err) => {
                // Best-effort delivery: the port swallows provider failures
                // (spec §4.2, §7). Escalation on timeout is the recovery
                // mechanism, not a retry here.
                tracing::error!(
                    alert_id = %alert.id,
                    assignment_id = %assignment.id,
                    error = %err,
                    "failed to place outbound voice call"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EscalationLevel, EscalationPolicy, Priority, Responder, ResponderId, Target};
    use crate::voice::provider::CallId;
    use chrono::{Duration, Utc};
    use std::sync::{Arc, Mutex};

    struct RecordingProvider {
        calls: Arc<Mutex<Vec<(String, String, CallInstruction)>>>,
        fail: bool,
    }

    #[async_trait]
    impl VoiceProvider for RecordingProvider {
        async fn place_call(
            &self,
            from: &str,
            to: &str,
            instruction: CallInstruction,
        ) -> crate::voice::provider::Result<CallId> {
            if self.fail {
                anyhow::bail!("provider unavailable");
            }
            self.calls
                .lock()
                .unwrap()
                .push((from.to_string(), to.to_string(), instruction));
            Ok(CallId("CAxxxx".into()))
        }
    }

    fn sample(channel: Channel, address: &str) -> (Alert, Assignment) {
        let responder = Responder::new(ResponderId::new(), "Primary", "+15555550100").unwrap();
        let target = Target::with_address(responder, channel, address);
        let level = EscalationLevel::new(vec![target.clone()], Duration::minutes(5)).unwrap();
        let policy = EscalationPolicy::new(vec![level]).unwrap();
        let alert = Alert::new("db down".into(), Priority::Critical, Utc::now(), policy);
        let assignment = Assignment::new(target, 0, Utc::now(), Duration::minutes(5));
        (alert, assignment)
    }

    #[tokio::test]
    async fn places_call_for_voice_target() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let provider = RecordingProvider {
            calls: calls.clone(),
            fail: false,
        };
        let adapter = VoiceAdapter::new(
            "+15550000000",
            Box::new(provider),
            VoiceScriptGenerator::new("https://example.com/oncall/twilio"),
        );

        let (alert, assignment) = sample(Channel::Voice, "+15555550100");
        adapter.notify(&alert, &assignment).await;

        let recorded = calls.lock().unwrap();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].0, "+15550000000");
        assert_eq!(recorded[0].1, "+15555550100");
        match &recorded[0].2 {
            CallInstruction::HostedUrl(url) => assert!(url.contains("/prompt?")),
            other => panic!("unexpected instruction: {other:?}"),
        }
    }

    #[tokio::test]
    async fn ignores_non_voice_targets() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let provider = RecordingProvider {
            calls: calls.clone(),
            fail: false,
        };
        let adapter = VoiceAdapter::new(
            "+15550000000",
            Box::new(provider),
            VoiceScriptGenerator::new("https://example.com"),
        );

        let (alert, assignment) = sample(Channel::Email, "person@example.com");
        adapter.notify(&alert, &assignment).await;

        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn swallows_provider_failure() {
        let provider = RecordingProvider {
            calls: Arc::new(Mutex::new(Vec::new())),
            fail: true,
        };
        let adapter = VoiceAdapter::new(
            "+15550000000",
            Box::new(provider),
            VoiceScriptGenerator::new("https://example.com"),
        );

        let (alert, assignment) = sample(Channel::Voice, "+15555550100");
        // Must not panic even though the provider errors.
        adapter.notify(&alert, &assignment).await;
    }

    #[tokio::test]
    async fn inline_mode_embeds_prompt_document() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let provider = RecordingProvider {
            calls: calls.clone(),
            fail: false,
        };
        let adapter = VoiceAdapter::new(
            "+15550000000",
            Box::new(provider),
            VoiceScriptGenerator::new("https://example.com"),
        )
        .with_mode(InstructionMode::InlinePrompt);

        let (alert, assignment) = sample(Channel::Voice, "+15555550100");
        adapter.notify(&alert, &assignment).await;

        let recorded = calls.lock().unwrap();
        match &recorded[0].2 {
            CallInstruction::InlineDocument(doc) => assert!(doc.contains("<Gather")),
            other => panic!("unexpected instruction: {other:?}"),
        }
    }
}
