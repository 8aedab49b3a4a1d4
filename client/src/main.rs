use clap::Parser;
use client::bot::{Bot, Strategy};
use client::network::Client;
use client::rendering::format_money;
use log::{error, info};
use tokio::task::JoinSet;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:12345")]
    server: String,

    /// Player name (bots append `_<n>`)
    #[arg(short = 'n', long)]
    name: Option<String>,

    /// Play automatically with the given strategy instead of reading stdin
    #[arg(short = 'b', long, value_enum)]
    bot: Option<Strategy>,

    /// Number of bots to launch
    #[arg(long, default_value = "1", requires = "bot")]
    bots: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();

    match args.bot {
        Some(strategy) => {
            let name = args.name.unwrap_or_else(|| "bot".to_string());
            run_bots(&args.server, &name, strategy, args.bots).await;
        }
        None => {
            let name = args.name.unwrap_or_else(|| "player".to_string());
            info!("Connecting to {} as '{}'", args.server, name);
            let client = Client::new(&args.server, &name).await?;
            client.run().await?;
        }
    }

    Ok(())
}

async fn run_bots(server: &str, name: &str, strategy: Strategy, count: usize) {
    info!("Launching {} {:?} bots against {}", count, strategy, server);

    let mut bots = JoinSet::new();
    for i in 1..=count {
        let bot = Bot::new(&format!("{}_{}", name, i), strategy);
        let server = server.to_string();
        bots.spawn(async move { bot.run(&server).await });
    }

    while let Some(joined) = bots.join_next().await {
        match joined {
            Ok(Ok(report)) => println!(
                "{:<16} level {:>2}  {:>12}  {}{}",
                report.name,
                report.level,
                format_money(report.prize),
                report.status.label(),
                if report.won { "  WINNER" } else { "" }
            ),
            Ok(Err(e)) => error!("Bot failed: {}", e),
            Err(e) => error!("Bot task failed: {}", e),
        }
    }
}
