use anyhow::Result;
use channel_insights::{build_rocket, config};

#[rocket::main]
async fn main() -> Result<()> {
    config::load_environment();
    config::init_logger();

    let state = config::create_app_state()?;
    let cors = config::create_cors()?;

    let _rocket = build_rocket(state, Some(cors))
        .launch()
        .await
        .map_err(|e| anyhow::anyhow!("Rocket failed to launch: {e}"))?;
    Ok(())
}
