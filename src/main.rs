use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = sqlrouter::cli::Cli::parse();
    if let Err(e) = sqlrouter::cmd::dispatch(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
