use clap::Parser;
use log::info;
use server::network::Server;
use server::questions::{QuestionBank, QuestionProvider};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "12345")]
    port: u16,

    /// Maximum number of simultaneous connections
    #[arg(short = 'm', long, default_value = "32")]
    max_clients: usize,

    /// Question file (`level|prompt|a|b|c|d|correct` per line) replacing the
    /// bundled pool
    #[arg(short, long)]
    questions: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let bank = match &args.questions {
        Some(path) => QuestionBank::from_file(path)?,
        None => QuestionBank::builtin(),
    };
    info!("Loaded {} questions", bank.len());
    let provider: Arc<dyn QuestionProvider> = Arc::new(bank);

    let address = format!("{}:{}", args.host, args.port);
    let server = Server::bind(&address, args.max_clients, provider).await?;

    server
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Received Ctrl+C, shutting down gracefully...");
        })
        .await;

    Ok(())
}
