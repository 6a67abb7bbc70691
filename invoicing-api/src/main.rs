use invoicing_api::{Application, config::Config};
use invoicing_core::observability::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    init_tracing(&config.service_name, "info");
    invoicing_api::services::metrics::init_metrics();

    let app = Application::build(config).await?;
    app.run_until_stopped().await?;

    Ok(())
}
