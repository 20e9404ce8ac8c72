//! Catalog and editorial content against the mock backend.

#![allow(clippy::unwrap_used)]

use zafaran_client::catalog::Catalog;
use zafaran_client::content::{self, ApplicationError, CareerApplication};
use zafaran_integration_tests::TestContext;

#[tokio::test]
async fn test_catalog_fetch_with_categories_and_promoted() {
    let ctx = TestContext::start().await;
    ctx.seed_product("p1", "Super Negin", 10);
    ctx.seed_product("p2", "Saffron threads", 4);
    ctx.seed_promoted_product("p3", "Gift box", 35);

    let catalog = Catalog::fetch(&ctx.api).await.unwrap();

    assert_eq!(catalog.products.len(), 3);
    assert_eq!(catalog.categories.len(), 1);
    assert_eq!(catalog.categories[0].slug, "spices");
    assert_eq!(catalog.filter_by_category(Some("spices")).len(), 2);
    assert_eq!(catalog.promoted().unwrap().name, "Gift box");
}

#[tokio::test]
async fn test_home_content() {
    let ctx = TestContext::start().await;
    let home = content::home(&ctx.api).await.unwrap();

    assert_eq!(home.about_us.title.as_deref(), Some("The Saffron Project"));
    assert_eq!(home.features.len(), 1);
    assert_eq!(home.why_us.len(), 1);
}

#[tokio::test]
async fn test_inspiration_gallery() {
    let ctx = TestContext::start().await;
    let page = content::inspiration(&ctx.api).await.unwrap();

    assert_eq!(page.page_title.as_deref(), Some("Inspiration"));
    assert_eq!(page.gallery.len(), 2);
    assert_eq!(page.gallery[0].image.as_deref(), Some("risotto.jpg"));
}

#[tokio::test]
async fn test_career_page_and_application() {
    let ctx = TestContext::start().await;

    let position = content::career(&ctx.api).await.unwrap();
    assert_eq!(position.title.as_deref(), Some("Harvest coordinator"));

    let application = CareerApplication {
        first_name: "Rana".to_owned(),
        last_name: "Haddad".to_owned(),
        email: "rana@example.com".to_owned(),
        message: "I would love to join the harvest team.".to_owned(),
    };
    content::apply(&ctx.api, &application).await.unwrap();
}

#[tokio::test]
async fn test_invalid_application_never_reaches_backend() {
    let ctx = TestContext::start().await;

    let application = CareerApplication {
        first_name: "Rana".to_owned(),
        last_name: "Haddad".to_owned(),
        email: "not-an-email".to_owned(),
        message: "hello".to_owned(),
    };
    match content::apply(&ctx.api, &application).await {
        Err(ApplicationError::InvalidEmail(_)) => {}
        other => panic!("expected InvalidEmail, got {other:?}"),
    }
}
