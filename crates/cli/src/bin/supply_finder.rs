use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    supply_cli::main_entry().await
}
