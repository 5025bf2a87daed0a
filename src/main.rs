#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = enrolld::run().await {
        eprintln!("enrolld fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
