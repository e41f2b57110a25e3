use clap::Parser;
use heatgrid_processor::cli::{run, Cli};
use heatgrid_processor::error::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    run(cli).await
}
