use anyhow::{bail, Result};
use dotenv::dotenv;
use quickprintz_storefront::Storefront;
use tracing_subscriber::EnvFilter;

/// Usage: upload_demo <image> [<image>...]
#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let paths: Vec<String> = std::env::args().skip(1).collect();
    if paths.is_empty() {
        bail!("usage: upload_demo <image> [<image>...]");
    }

    let storefront = Storefront::from_env()?;
    let uploader = storefront.uploader()?;

    uploader.select_paths(&paths).await?;
    println!("{} file(s) selected:", uploader.selection().len());
    for name in uploader.selected_names() {
        println!("  {}", name);
    }

    if let Some(summary) = uploader.upload().await {
        for outcome in summary.failed() {
            if let Err(err) = &outcome.result {
                println!("  failed: {} ({})", outcome.name, err);
            }
        }
    }
    println!("{}", uploader.status());

    Ok(())
}
