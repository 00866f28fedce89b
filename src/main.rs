use anyhow::Context;
use atlas_kernel::settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load catalog settings")?;
    atlas_telemetry::init(&settings.telemetry)?;

    catalog_app::run(settings).await
}
