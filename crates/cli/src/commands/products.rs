//! Catalog browsing commands.

use zafaran_client::api::ApiClient;
use zafaran_client::catalog::{Catalog, Product};

/// List one page of the catalog, optionally filtered by category slug.
#[allow(clippy::print_stdout)]
pub async fn list(
    api: &ApiClient,
    category: Option<&str>,
    page: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = Catalog::fetch(api).await?;

    let page_products = catalog.page(category, page);
    let page_count = catalog.page_count(category);

    if page_products.is_empty() {
        println!("No products found.");
        return Ok(());
    }

    for product in &page_products {
        print_product(product);
    }
    println!("\nPage {page} of {page_count}");

    if !catalog.categories.is_empty() {
        let slugs: Vec<&str> = catalog
            .categories
            .iter()
            .map(|c| c.slug.as_str())
            .collect();
        println!("Categories: {}", slugs.join(", "));
    }

    Ok(())
}

/// Show the promoted offer, if any product is flagged.
#[allow(clippy::print_stdout)]
pub async fn promoted(api: &ApiClient) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = Catalog::fetch(api).await?;

    match catalog.promoted() {
        Some(product) => {
            println!("Current offer:");
            print_product(product);
            if let Some(description) = &product.description {
                println!("  {description}");
            }
        }
        None => println!("No promoted offer right now."),
    }

    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_product(product: &Product) {
    let category = product
        .category
        .as_ref()
        .map_or("-", zafaran_client::catalog::CategoryRef::slug);
    println!(
        "{}  {}  ${}  [{category}]",
        product.id, product.name, product.price
    );
}
