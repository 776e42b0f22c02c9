use clap::Parser;

use allweather::api::{self, Cli};
use allweather::logging::init_logger;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    if let Err(e) = api::run(cli.command).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
