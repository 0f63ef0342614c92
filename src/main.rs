use anyhow::Result;
use naviable::cli;

#[tokio::main]
async fn main() -> Result<()> {
    cli::run().await
}
