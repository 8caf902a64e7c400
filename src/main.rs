use color_eyre::{eyre::eyre, Result};
use emdr_pad::config::{AppConfig, GatewayBackend};
use emdr_pad::emdr::SessionHandle;
use emdr_pad::gamepad::{ControllerGateway, GilrsGateway, VirtualGateway};
use emdr_pad::ui::run_console;
use tokio::io::BufReader;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config_path = AppConfig::default_path()?;
    info!("Loading config from {}", config_path.display());
    let config = AppConfig::load_or_create(&config_path).await?;

    let gateway: Box<dyn ControllerGateway> = match config.gateway.backend {
        GatewayBackend::Gilrs => Box::new(
            GilrsGateway::create().map_err(|e| eyre!("Failed to open controllers: {}", e))?,
        ),
        GatewayBackend::Virtual => {
            info!(
                "Using {} virtual controllers",
                config.gateway.virtual_controllers
            );
            let (gateway, _pads) = VirtualGateway::new(config.gateway.virtual_controllers);
            Box::new(gateway)
        }
    };

    let (handle, notifications, session_task) =
        SessionHandle::spawn(gateway, config.session_settings());

    let stdin = BufReader::new(tokio::io::stdin());
    tokio::select! {
        result = run_console(handle.clone(), notifications, stdin, tokio::io::stdout()) => {
            result.map_err(|e| eyre!("Console failed: {}", e))?;
        }
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, stopping EMDR");
        }
    }

    handle.shutdown().await;
    session_task
        .await
        .map_err(|e| eyre!("Session task failed: {}", e))?;
    info!("Session closed");
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

// Logs go to stderr, stdout belongs to the console
fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .init();
}
