use anyhow::Context;
use rental_backend::config::Config;
use rental_backend::telemetry;

#[rocket::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("invalid configuration")?;
    telemetry::init_tracing(config.log_format);
    tracing::info!(storage = ?config.storage, strict_transitions = config.strict_status_transitions, "starting rental marketplace");

    let rocket = rental_backend::build(&config)?;
    rocket
        .launch()
        .await
        .map_err(|e| anyhow::anyhow!("Rocket server failed to launch: {}", e))?;
    Ok(())
}
