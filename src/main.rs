use tracing::{error, info};

use ratevis::config::Config;
use ratevis::server::Server;

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = Config::from_env()?;
    ratevis::logging::init(&config.logging);

    info!("Starting ratevis {}...", ratevis::VERSION);
    config.log_summary();

    // Single-threaded runtime: admissions are evaluated strictly in arrival order
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async_main(config))
}

async fn async_main(config: Config) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let server = Server::bind(config).await?;
    let shutdown = server.shutdown_handle();
    let mut runner = tokio::spawn(server.run());

    let result = tokio::select! {
        result = &mut runner => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down...");
            shutdown.trigger();
            runner.await
        }
    };

    match result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            error!("Server error: {}", e);
            Err(e)
        }
        Err(e) => {
            error!("Server task failed: {}", e);
            Err(e.into())
        }
    }
}
