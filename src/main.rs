use dockhand::app::App;
use dockhand::config::Config;
use dockhand::io::handler::IoAsyncHandler;
use dockhand::io::IoEvent;
use dockhand::start_ui;
use eyre::{Result, WrapErr};
use std::sync::Arc;

use log::info;
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Config as LogConfig, Root};
use log4rs::encode::pattern::PatternEncoder;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn init_logging(config: &Config) -> Result<()> {
    let path = config.log_path();
    let logfile = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{d} {l} {t} - {m}{n}")))
        .build(&path)
        .wrap_err_with(|| format!("opening log file {}", path.display()))?;

    let log_config = LogConfig::builder()
        .appender(Appender::builder().build("logfile", Box::new(logfile)))
        .build(
            Root::builder()
                .appender("logfile")
                .build(config.log_level()),
        )?;

    log4rs::init_config(log_config)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = Config::default_path();
    let config = Config::load(config_path.as_deref())?;
    init_logging(&config)?;
    info!(
        "dockhand {} using engine `{}`",
        VERSION, config.engine_binary
    );

    let (sync_io_tx, mut sync_io_rx) = tokio::sync::mpsc::channel::<IoEvent>(100);
    let app = Arc::new(tokio::sync::Mutex::new(App::new(sync_io_tx.clone())));
    let app_ui = Arc::clone(&app);
    let tick_rate = config.tick_rate();

    tokio::spawn(async move {
        let mut handler = IoAsyncHandler::new(app, config);
        while let Some(io_event) = sync_io_rx.recv().await {
            handler.handle_io_event(io_event).await;
        }
    });

    start_ui(&app_ui, tick_rate).await?;
    info!("dockhand exited");
    Ok(())
}
