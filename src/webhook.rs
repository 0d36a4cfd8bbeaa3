//! Webhook handlers (spec §4.4): two pure functions that translate
//! webhook inputs into the appropriate voice-response document, plus a
//! thin `actix-web` wiring layer mounting them — generalizing the
//! teacher's `run_api_server`/`insert_alerts` pairing in this same file.

use crate::model::{AckStatus, AlertId, AcknowledgementToken};
use crate::service::OnCallService;
use crate::voice::VoiceScriptGenerator;
use actix_web::{web, App, HttpResponse, HttpServer};
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// `prompt(alertId, token)`: resolves the alert and assignment by token;
/// if either is missing, returns the corresponding missing-entity
/// document; otherwise returns the prompt document.
pub fn prompt(
    service: &OnCallService,
    script: &VoiceScriptGenerator,
    alert_id: AlertId,
    token: AcknowledgementToken,
) -> String {
    let Some(alert) = service.get(alert_id) else {
        return script.missing_entity();
    };

    if alert.find_assignment_by_token(token).is_none() {
        return script.missing_entity();
    }

    script.prompt(&alert, token)
}

/// `acknowledge(alertId, token, digits, at)`: resolves alert/assignment
/// first; normalises `digits` (trim whitespace); empty → invalid-input;
/// `"1"` → acknowledge and map the outcome; `"2"` → prompt again; any
/// other digit → invalid-input.
pub async fn acknowledge(
    service: &OnCallService,
    script: &VoiceScriptGenerator,
    alert_id: AlertId,
    token: AcknowledgementToken,
    digits: &str,
    at: DateTime<Utc>,
) -> String {
    let Some(alert) = service.get(alert_id) else {
        return script.missing_entity();
    };

    if alert.find_assignment_by_token(token).is_none() {
        return script.missing_entity();
    }

    match digits.trim() {
        "" => script.invalid_input(alert_id, token),
        "1" => {
            let outcome = service.acknowledge_by_token(alert_id, token, at).await;
            match outcome.status {
                AckStatus::Acknowledged => {
                    let name = responder_name(service, alert_id, outcome.responder);
                    script.accepted(name.as_deref())
                }
                AckStatus::AlreadyAcknowledged => {
                    let name = responder_name(service, alert_id, outcome.responder);
                    script.already_handled(name.as_deref())
                }
                AckStatus::AlertNotFound
                | AckStatus::AssignmentNotFound
                | AckStatus::TokenNotFound => script.missing_entity(),
            }
        }
        "2" => script.prompt(&alert, token),
        _ => script.invalid_input(alert_id, token),
    }
}

fn responder_name(
    service: &OnCallService,
    alert_id: AlertId,
    responder: Option<crate::model::ResponderId>,
) -> Option<String> {
    let responder = responder?;
    let alert = service.get(alert_id)?;
    alert
        .assignments
        .iter()
        .find(|a| a.target.responder.id == responder)
        .map(|a| a.target.responder.name.clone())
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    #[serde(rename = "alertId")]
    alert_id: String,
    token: String,
}

#[derive(Debug, Deserialize)]
pub struct AcknowledgeForm {
    #[serde(rename = "Digits", default)]
    digits: String,
}

/// Mounts `POST /prompt` and `POST /acknowledge`. The HTTP transport
/// itself is out of scope (spec §1); this is the minimal wiring the
/// binary entry point needs to expose the pure handlers above.
pub async fn run_webhook_server(
    endpoint: &str,
    service: OnCallService,
    script: VoiceScriptGenerator,
) -> anyhow::Result<()> {
    let service = web::Data::new(service);
    let script = web::Data::new(script);

    HttpServer::new(move || {
        App::new()
            .app_data(service.clone())
            .app_data(script.clone())
            .route("/prompt", web::post().to(prompt_route))
            .route("/acknowledge", web::post().to(acknowledge_route))
    })
    .bind(endpoint)?
    .run()
    .await?;

    Ok(())
}

async fn prompt_route(
    query: web::Query<CallbackQuery>,
    service: web::Data<OnCallService>,
    script: web::Data<VoiceScriptGenerator>,
) -> HttpResponse {
    let document = match parse_ids(&query.alert_id, &query.token) {
        Some((alert_id, token)) => prompt(&service, &script, alert_id, token),
        None => script.missing_entity(),
    };

    xml_response(document)
}

async fn acknowledge_route(
    query: web::Query<CallbackQuery>,
    form: web::Form<AcknowledgeForm>,
    service: web::Data<OnCallService>,
    script: web::Data<VoiceScriptGenerator>,
) -> HttpResponse {
    let document = match parse_ids(&query.alert_id, &query.token) {
        // An unparseable identifier is treated as a missing entity (spec §7).
        Some((alert_id, token)) => {
            acknowledge(&service, &script, alert_id, token, &form.digits, Utc::now()).await
        }
        None => script.missing_entity(),
    };

    xml_response(document)
}

fn parse_ids(alert_id: &str, token: &str) -> Option<(AlertId, AcknowledgementToken)> {
    Some((alert_id.parse().ok()?, token.parse().ok()?))
}

fn xml_response(document: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/xml")
        .body(document)
}
