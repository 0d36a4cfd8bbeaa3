//! Voice-call script generator (spec §4.3): produces the XML voice-response
//! documents that drive the interactive phone prompt, and the callback
//! URLs embedding `(alertId, token)` that those documents POST back to.

use crate::model::{Alert, AlertId, AcknowledgementToken};

const GATHER_TIMEOUT_SECONDS: u32 = 10;
const VOICE: &str = "alice";

/// Builds callback URLs and voice documents against a configured base.
#[derive(Debug, Clone)]
pub struct VoiceScriptGenerator {
    /// Base URL without a trailing slash, e.g. `https://example.com/oncall/twilio`.
    callback_base: String,
}

impl VoiceScriptGenerator {
    pub fn new(callback_base: impl Into<String>) -> Self {
        let mut base = callback_base.into();
        while base.ends_with('/') {
            base.pop();
        }
        VoiceScriptGenerator {
            callback_base: base,
        }
    }

    /// `"{base}/{suffix}?alertId={id}&token={token}"` (spec §4.3).
    pub fn callback_url(&self, suffix: &str, alert_id: AlertId, token: AcknowledgementToken) -> String {
        format!(
            "{}/{}?alertId={}&token={}",
            self.callback_base, suffix, alert_id, token
        )
    }

    pub fn prompt_url(&self, alert_id: AlertId, token: AcknowledgementToken) -> String {
        self.callback_url("prompt", alert_id, token)
    }

    pub fn acknowledge_url(&self, alert_id: AlertId, token: AcknowledgementToken) -> String {
        self.callback_url("acknowledge", alert_id, token)
    }

    /// Gathers exactly 1 digit with a 10-second timeout, POSTing to the
    /// acknowledge URL. On no input, falls through to a "no input" message
    /// and redirects (POST) to the prompt URL.
    pub fn prompt(&self, alert: &Alert, token: AcknowledgementToken) -> String {
        let acknowledge_url = self.acknowledge_url(alert.id, token);
        let prompt_url = self.prompt_url(alert.id, token);
        let say = format!(
            "{} priority alert. {} Press 1 to acknowledge. Press 2 to repeat this message.",
            escape_xml(&alert.priority.to_string()),
            escape_xml(&alert.message),
        );

        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <Response>\n\
             \x20 <Gather numDigits=\"1\" timeout=\"{timeout}\" action=\"{action}\" method=\"POST\">\n\
             \x20   <Say voice=\"{voice}\">{say}</Say>\n\
             \x20 </Gather>\n\
             \x20 <Say voice=\"{voice}\">No input received.</Say>\n\
             \x20 <Redirect method=\"POST\">{redirect}</Redirect>\n\
             </Response>",
            timeout = GATHER_TIMEOUT_SECONDS,
            action = escape_xml(&acknowledge_url),
            voice = VOICE,
            say = say,
            redirect = escape_xml(&prompt_url),
        )
    }

    /// Thanks the responder by name if known, states the alert is
    /// acknowledged, hangs up.
    pub fn accepted(&self, responder_name: Option<&str>) -> String {
        let say = match responder_name {
            Some(name) => format!(
                "Thanks, {}. This alert has been acknowledged.",
                escape_xml(name)
            ),
            None => "This alert has been acknowledged.".to_string(),
        };

        hangup_document(&say)
    }

    /// States the alert was already acknowledged, naming the original
    /// responder if known, hangs up.
    pub fn already_handled(&self, original_responder: Option<&str>) -> String {
        let say = match original_responder {
            Some(name) => format!(
                "This alert was already acknowledged by {}.",
                escape_xml(name)
            ),
            None => "This alert was already acknowledged.".to_string(),
        };

        hangup_document(&say)
    }

    /// Speaks a "did not understand" phrase, redirects (POST) to the
    /// prompt URL.
    pub fn invalid_input(&self, alert_id: AlertId, token: AcknowledgementToken) -> String {
        let prompt_url = self.prompt_url(alert_id, token);

        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <Response>\n\
             \x20 <Say voice=\"{voice}\">Sorry, I did not understand that.</Say>\n\
             \x20 <Redirect method=\"POST\">{redirect}</Redirect>\n\
             </Response>",
            voice = VOICE,
            redirect = escape_xml(&prompt_url),
        )
    }

    /// Speaks an operations-team contact message, hangs up. Used for both
    /// assignment-missing and alert-missing cases (spec §4.3: "same class
    /// of message").
    pub fn missing_entity(&self) -> String {
        hangup_document(
            "We could not find this alert or assignment. Please contact the operations team.",
        )
    }
}

fn hangup_document(say: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <Response>\n\
         \x20 <Say voice=\"{voice}\">{say}</Say>\n\
         \x20 <Hangup/>\n\
         </Response>",
        voice = VOICE,
        say = say,
    )
}

/// Escapes the five XML-significant characters before embedding text.
pub fn escape_xml(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}
