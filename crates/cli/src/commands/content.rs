//! Editorial content commands: inspiration gallery and careers.

use zafaran_client::api::ApiClient;
use zafaran_client::content::{self, CareerApplication};

/// Print the inspiration gallery.
#[allow(clippy::print_stdout)]
pub async fn inspiration(api: &ApiClient) -> Result<(), Box<dyn std::error::Error>> {
    let page = content::inspiration(api).await?;

    if let Some(title) = &page.page_title {
        println!("{title}");
    }
    if let Some(description) = &page.page_description {
        println!("{description}\n");
    }
    for item in &page.gallery {
        let caption = item.text.as_deref().unwrap_or("(untitled)");
        let image = item.image.as_deref().unwrap_or("-");
        println!("- {caption}  [{image}]");
    }
    Ok(())
}

/// Print the open position from the careers page.
#[allow(clippy::print_stdout)]
pub async fn career(api: &ApiClient) -> Result<(), Box<dyn std::error::Error>> {
    let position = content::career(api).await?;

    if let Some(title) = &position.title {
        println!("{title}\n");
    }
    if let Some(description) = &position.description {
        println!("{description}");
    }
    Ok(())
}

/// Submit a career application.
#[allow(clippy::print_stdout)]
pub async fn apply(
    api: &ApiClient,
    first_name: String,
    last_name: String,
    email: String,
    message: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let application = CareerApplication {
        first_name,
        last_name,
        email,
        message,
    };
    content::apply(api, &application).await?;
    println!("Application submitted. We will be in touch!");
    Ok(())
}
