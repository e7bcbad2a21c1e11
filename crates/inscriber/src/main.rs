use anyhow::Result;
use clap::Parser;
use inscriber::{app::App, config};
use tracing::{error, info};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{
    fmt::{self},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

#[tokio::main]
async fn main() -> Result<()> {
    // TIPS: guard must have same long lifetime with main
    let _guard = logger_init();

    let cli = config::Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    let app = App::new(cfg)?;

    info!("Start inscriber {:?}", cli.command);
    match app.run(&cli).await {
        Ok(out) => {
            println!("{}", serde_json::to_string_pretty(&out)?);
            Ok(())
        }
        Err(e) => {
            if let Some(err) = e.downcast_ref::<datatypes::Error>() {
                error!("{:?} error: {}", err.kind(), err);
            } else {
                error!("{:#}", e);
            }
            Err(e)
        }
    }
}

fn logger_init() -> WorkerGuard {
    let formatting_layer = fmt::layer().pretty().with_writer(std::io::stderr);
    let file_appender = RollingFileAppender::new(Rotation::HOURLY, "logs/inscriber", "inscriber.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(non_blocking)
        .with_filter(tracing_subscriber::filter::LevelFilter::DEBUG)
        .boxed();

    Registry::default()
        .with(formatting_layer)
        .with(file_layer)
        .with(EnvFilter::from_default_env())
        .init();

    guard
}
