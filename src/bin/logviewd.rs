use clap::Parser;
use logview::config::{Cli, Config};
use logview::tail::Tailer;
use logview::http;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    let config = match Config::from_env() {
        Ok(config) => config.apply_cli(&cli),
        Err(e) => {
            eprintln!("logviewd: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = std::fs::metadata(&config.log_file_path) {
        eprintln!(
            "logviewd: cannot read log file {}: {e}",
            config.log_file_path.display()
        );
        return ExitCode::FAILURE;
    }

    let tailer = Tailer::spawn(config.log_file_path.clone());
    let state = http::build_state(config.log_file_path.clone(), config.password.clone(), tailer);
    let router = http::router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("logviewd: failed to bind {addr}: {e}");
            return ExitCode::FAILURE;
        }
    };

    log::info!(
        "logviewd listening on {addr}, serving {}",
        config.log_file_path.display()
    );

    if let Err(e) = axum::serve(listener, router).await {
        eprintln!("logviewd: server error: {e}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
