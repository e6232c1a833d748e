use std::process;

use clap::Parser;
use sql_ask::{app::run, cli::Cli};
use tokio::main;

#[main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
