pub mod config;
pub mod database;
pub mod error;
pub mod model;
pub mod notification;
pub mod service;
pub mod voice;
pub mod webhook;

#[cfg(test)]
mod tests;

pub type Result<T> = std::result::Result<T, anyhow::Error>;

use crate::database::InMemoryAlertRepository;
use crate::notification::{CompositeNotifier, ConsoleNotifier, NotificationPort};
use crate::service::OnCallService;
use crate::voice::{InstructionMode, TwilioVoiceProvider, VoiceAdapter, VoiceScriptGenerator};
use std::sync::Arc;

/// Builds the default engine wiring: an in-memory repository, policies
/// loaded from `ONCALL_POLICY_FILE` if set, a console sink, and a voice
/// adapter installed only if the Twilio environment triple is complete
/// (spec §6). Returns the service plus the script generator the webhook
/// layer needs to answer callbacks.
pub fn build_default_service() -> Result<(OnCallService, VoiceScriptGenerator)> {
    let policies = config::policies_from_env()?;
    let repository = Arc::new(InMemoryAlertRepository::new());

    let mut delegates: Vec<Box<dyn NotificationPort>> = vec![Box::new(ConsoleNotifier::any_channel())];

    let voice_env = config::voice_environment_from_env();
    let script = VoiceScriptGenerator::new(
        voice_env
            .as_ref()
            .map(|v| v.ack_webhook_base.clone())
            .unwrap_or_else(|| "https://example.com/oncall/twilio".to_string()),
    );

    if let Some(env) = voice_env {
        tracing::info!("Twilio environment present, installing voice adapter");
        let provider = TwilioVoiceProvider::new(env.twilio);
        let adapter = VoiceAdapter::new(env.from_number, Box::new(provider), script.clone())
            .with_mode(InstructionMode::HostedPrompt);
        delegates.push(Box::new(adapter));
    } else {
        tracing::info!("Twilio environment incomplete, voice adapter not installed");
    }

    let notifier = Arc::new(CompositeNotifier::new(delegates));
    let service = OnCallService::new(repository, notifier, policies);

    Ok((service, script))
}
