//! cwcollect CLI entry point.

use cloudwatch_collector::cli::{self, Cli};
use cloudwatch_collector::core::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    cli::execute(cli).await
}
