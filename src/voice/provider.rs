//! The voice-provider client boundary (spec §4.5, design note §9).
//!
//! Spec §1 scopes the voice-provider client that actually places calls out
//! of the core; what remains in scope is the interface the adapter uses
//! and, since the pack has no Twilio crate to reach for, a default
//! implementation built the way teacher's `adapter/pagerduty.rs` builds
//! its own third-party HTTP integration: a `reqwest::Client`, an auth
//! header, and a narrow retry policy on transient failures.

use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use tokio::time::sleep;

pub type Result<T> = std::result::Result<T, anyhow::Error>;

/// Either a hosted URL the provider will fetch for instructions, or an
/// inline script document (typically the prompt document).
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum CallInstruction {
    HostedUrl(String),
    InlineDocument(String),
}

/// Identifies a placed outbound call, for observability.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CallId(pub String);

/// Application-supplied capability for placing outbound voice calls. No
/// global/process-wide client: implementations hold whatever connection
/// state they need and are injected into the adapter (design note §9).
#[async_trait]
pub trait VoiceProvider: Send + Sync {
    async fn place_call(
        &self,
        from: &str,
        to: &str,
        instruction: CallInstruction,
    ) -> Result<CallId>;
}

const RETRY_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
}

/// Default [`VoiceProvider`] backed by the Twilio REST API.
pub struct TwilioVoiceProvider {
    client: reqwest::Client,
    config: TwilioConfig,
}

impl TwilioVoiceProvider {
    pub fn new(config: TwilioConfig) -> Self {
        TwilioVoiceProvider {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn calls_endpoint(&self) -> String {
        format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Calls.json",
            self.config.account_sid
        )
    }
}

#[async_trait]
impl VoiceProvider for TwilioVoiceProvider {
    async fn place_call(
        &self,
        from: &str,
        to: &str,
        instruction: CallInstruction,
    ) -> Result<CallId> {
        let mut form = vec![("From", from.to_string()), ("To", to.to_string())];
        match instruction {
            CallInstruction::HostedUrl(url) => form.push(("Url", url)),
            CallInstruction::InlineDocument(doc) => form.push(("Twiml", doc)),
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            let resp = self
                .client
                .post(self.calls_endpoint())
                .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
                .form(&form)
                .send()
                .await?;

            match resp.status() {
                StatusCode::OK | StatusCode::CREATED => {
                    let body: serde_json::Value = resp.json().await?;
                    let sid = body
                        .get("sid")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string();
                    return Ok(CallId(sid));
                }
                StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
                    let body = resp.text().await.unwrap_or_default();
                    anyhow::bail!("Twilio rejected the call request: {body}");
                }
                status if attempt < RETRY_ATTEMPTS => {
                    tracing::warn!(%status, attempt, "Twilio call request failed, retrying");
                    sleep(RETRY_DELAY).await;
                }
                status => {
                    anyhow::bail!("Twilio call request failed after {attempt} attempts: {status}");
                }
            }
        }
    }
}
