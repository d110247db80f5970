use anyhow::Result;
use crew_axum::{init_tracing, listen_addr, CrewAxumApp};
use crew_core::{load_env_config, CrewConfig};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let mut config = CrewConfig::new();
    load_env_config(&mut config, "CREW");
    let config = config.snapshot();

    let app = CrewAxumApp::from_config(&config)?;
    app.listen(listen_addr(&config)).await?;

    Ok(())
}
