use anyhow::Result;
use dotenv::dotenv;
use quickprintz_storefront::gallery::{GalleryBody, Preview};
use quickprintz_storefront::Storefront;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let storefront = Storefront::from_env()?;
    let gallery = storefront.gallery();

    println!("Loading designs from bucket {:?}...", storefront.options().bucket);
    gallery.mount().await;

    let view = gallery.view().await;
    println!("{}", view.count_label);

    if let Some(banner) = &view.banner {
        println!("{}: {}", banner.title, banner.message);
        println!("{}", banner.hint);
    }

    match &view.body {
        GalleryBody::Tiles(tiles) => {
            for tile in tiles {
                let preview = match &tile.preview {
                    Preview::Image(image) => image.src.as_str(),
                    Preview::Unavailable(reason) => *reason,
                };
                println!("- {} ({}) {} -> {}", tile.title, tile.size_label, tile.price_label, preview);
            }

            let cart = storefront.cart();
            if let Some(first) = tiles.first() {
                gallery.add_to_cart(&first.key, &cart).await;
                gallery.add_to_cart(&first.key, &cart).await;
                println!(
                    "\nCart: {}",
                    serde_json::to_string_pretty(&cart.items())?
                );
            }
        }
        GalleryBody::Empty(message) => println!("{}", message),
        GalleryBody::Placeholders(count) => println!("{} placeholders", count),
    }

    Ok(())
}
