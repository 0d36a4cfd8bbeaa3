//! Environment-variable wiring for the default binary (spec §6), plus an
//! optional on-disk policy file so escalation policies need not be
//! hard-coded into the binary that wires defaults.

use crate::model::{EscalationPolicy, Priority};
use crate::voice::provider::TwilioConfig;
use std::collections::HashMap;
use std::env;

const DEFAULT_ACK_WEBHOOK_BASE: &str = "https://example.com/oncall/twilio";

/// The three Twilio settings the voice adapter needs. If any is missing,
/// the voice adapter is not installed (spec §6).
#[derive(Debug, Clone)]
pub struct VoiceEnvironment {
    pub twilio: TwilioConfig,
    pub from_number: String,
    pub ack_webhook_base: String,
}

/// Reads `TWILIO_ACCOUNT_SID`, `TWILIO_AUTH_TOKEN`, `TWILIO_FROM_NUMBER`
/// and `TWILIO_ACK_WEBHOOK_BASE` from the process environment.
pub fn voice_environment_from_env() -> Option<VoiceEnvironment> {
    let account_sid = env::var("TWILIO_ACCOUNT_SID").ok()?;
    let auth_token = env::var("TWILIO_AUTH_TOKEN").ok()?;
    let from_number = env::var("TWILIO_FROM_NUMBER").ok()?;
    let ack_webhook_base =
        env::var("TWILIO_ACK_WEBHOOK_BASE").unwrap_or_else(|_| DEFAULT_ACK_WEBHOOK_BASE.to_string());

    Some(VoiceEnvironment {
        twilio: TwilioConfig {
            account_sid,
            auth_token,
        },
        from_number,
        ack_webhook_base,
    })
}

/// Reads `ONCALL_POLICY_FILE`, if set, and parses it as a YAML map of
/// priority to escalation policy. Returns an empty map if the variable is
/// unset; propagates parse errors (a malformed policy file is a
/// configuration error, not something to silently ignore).
pub fn policies_from_env() -> anyhow::Result<HashMap<Priority, EscalationPolicy>> {
    let Ok(path) = env::var("ONCALL_POLICY_FILE") else {
        return Ok(HashMap::new());
    };

    let contents = std::fs::read_to_string(&path)
        .map_err(|err| anyhow::anyhow!("failed to read policy file {path}: {err}"))?;

    let policies: HashMap<Priority, EscalationPolicy> = serde_yaml::from_str(&contents)
        .map_err(|err| anyhow::anyhow!("failed to parse policy file {path}: {err}"))?;

    Ok(policies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;

    /// Runs `f` with `var` set to `value`, restoring whatever was there
    /// before. Environment variables are process-global, so these tests
    /// hold a static mutex to avoid racing each other.
    fn with_env_var<K: AsRef<OsStr>, R>(var: K, value: Option<&str>, f: impl FnOnce() -> R) -> R {
        use std::sync::Mutex;
        static ENV_LOCK: Mutex<()> = Mutex::new(());
        let _guard = ENV_LOCK.lock().unwrap_or_else(|poison| poison.into_inner());

        let var = var.as_ref();
        let previous = env::var(var).ok();
        match value {
            Some(v) => env::set_var(var, v),
            None => env::remove_var(var),
        }

        let result = f();

        match previous {
            Some(v) => env::set_var(var, v),
            None => env::remove_var(var),
        }

        result
    }

    #[test]
    fn voice_environment_absent_when_incomplete() {
        with_env_var("TWILIO_ACCOUNT_SID", None, || {
            with_env_var("TWILIO_AUTH_TOKEN", Some("token"), || {
                with_env_var("TWILIO_FROM_NUMBER", Some("+15550000000"), || {
                    assert!(voice_environment_from_env().is_none());
                })
            })
        });
    }

    #[test]
    fn voice_environment_defaults_webhook_base() {
        with_env_var("TWILIO_ACCOUNT_SID", Some("AC"), || {
            with_env_var("TWILIO_AUTH_TOKEN", Some("token"), || {
                with_env_var("TWILIO_FROM_NUMBER", Some("+15550000000"), || {
                    with_env_var("TWILIO_ACK_WEBHOOK_BASE", None, || {
                        let env = voice_environment_from_env().unwrap();
                        assert_eq!(env.ack_webhook_base, DEFAULT_ACK_WEBHOOK_BASE);
                    })
                })
            })
        });
    }

    #[test]
    fn policies_from_env_is_empty_when_unset() {
        with_env_var("ONCALL_POLICY_FILE", None, || {
            let policies = policies_from_env().unwrap();
            assert!(policies.is_empty());
        });
    }
}
