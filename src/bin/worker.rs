#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = enrolld::run_worker().await {
        eprintln!("enrolld-worker fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
