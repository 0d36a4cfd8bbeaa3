use oncall::webhook::run_webhook_server;
use oncall::{build_default_service, Result};

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

#[actix_web::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("oncall=info")),
        )
        .init();

    let (service, script) = build_default_service()?;
    let bind_address =
        std::env::var("ONCALL_BIND_ADDRESS").unwrap_or_else(|_| DEFAULT_BIND_ADDRESS.to_string());

    tracing::info!(%bind_address, "starting on-call webhook server");
    run_webhook_server(&bind_address, service, script).await
}
