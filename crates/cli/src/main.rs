//! Zafaran CLI - Command-line storefront client.
//!
//! # Usage
//!
//! ```bash
//! # Browse the catalog
//! zafaran products list
//! zafaran products list --category spices --page 2
//!
//! # Account
//! zafaran auth login -e you@example.com -p <password>
//! zafaran auth whoami
//! zafaran auth logout
//!
//! # Cart
//! zafaran cart show
//! zafaran cart add <product-id> --quantity 2
//! zafaran cart update <product-id> --quantity 3
//! zafaran cart remove <product-id>
//!
//! # Checkout
//! zafaran checkout --name "Rana Haddad" --phone "+961 3 123456" \
//!     --street "12 Cedar Road" --city Zahle --country Lebanon
//! zafaran resend-confirmation ZAF-00042
//! ```
//!
//! # Environment Variables
//!
//! - `ZAFARAN_API_URL` - Base URL of the backend (required)
//! - `ZAFARAN_DATA_DIR` - Session persistence directory (optional)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use zafaran_client::api::ApiClient;
use zafaran_client::cart::CartStore;
use zafaran_client::session::SessionStore;
use zafaran_client::ClientConfig;

mod commands;

#[derive(Parser)]
#[command(name = "zafaran")]
#[command(author, version, about = "Zafaran storefront client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse the product catalog
    Products {
        #[command(subcommand)]
        action: ProductsAction,
    },
    /// Manage the account session
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },
    /// Manage the shopping cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Place an order for the current cart
    Checkout {
        /// Recipient name
        #[arg(long)]
        name: String,

        /// Contact phone number
        #[arg(long)]
        phone: String,

        /// Street address
        #[arg(long)]
        street: String,

        /// City
        #[arg(long)]
        city: String,

        /// Country
        #[arg(long)]
        country: String,

        /// State or region
        #[arg(long, default_value = "")]
        state: String,

        /// Postal code
        #[arg(long, default_value = "")]
        postal_code: String,

        /// Delivery notes
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Resend the confirmation email for a placed order
    ResendConfirmation {
        /// Order number from checkout
        order_number: String,
    },
    /// Show the inspiration gallery
    Inspiration,
    /// Careers page and applications
    Career {
        #[command(subcommand)]
        action: CareerAction,
    },
}

#[derive(Subcommand)]
enum ProductsAction {
    /// List products, optionally filtered and paged
    List {
        /// Category slug to filter by
        #[arg(short, long)]
        category: Option<String>,

        /// Page number (1-based)
        #[arg(short, long, default_value_t = 1)]
        page: usize,
    },
    /// Show the promoted offer, if any
    Promoted,
}

#[derive(Subcommand)]
enum AuthAction {
    /// Log in with email and password
    Login {
        /// Account email
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long)]
        password: String,
    },
    /// Register a new account
    Register {
        /// Full name
        #[arg(short, long)]
        name: String,

        /// Email address
        #[arg(short, long)]
        email: String,

        /// Phone number
        #[arg(long)]
        phone: String,

        /// Password (minimum 8 characters)
        #[arg(short, long)]
        password: String,
    },
    /// Log out and clear the persisted session
    Logout,
    /// Show the current session
    Whoami,
    /// Verify the account email with a code
    Verify {
        /// Verification code received by email
        #[arg(short, long)]
        code: String,
    },
    /// Resend the verification email
    ResendVerification,
    /// Change the account password
    ChangePassword {
        /// Current password
        #[arg(long)]
        old_password: String,

        /// New password (minimum 8 characters)
        #[arg(long)]
        new_password: String,

        /// Repeat of the new password
        #[arg(long)]
        confirm_password: String,
    },
    /// Update the profile name and phone number
    UpdateProfile {
        /// New full name
        #[arg(short, long)]
        name: String,

        /// New phone number
        #[arg(long)]
        phone: String,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart contents
    Show,
    /// Add a product to the cart
    Add {
        /// Product id
        product_id: String,

        /// Quantity to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Change the quantity of a cart line
    Update {
        /// Product id
        product_id: String,

        /// New quantity (at least 1)
        #[arg(short, long)]
        quantity: u32,
    },
    /// Remove a product from the cart
    Remove {
        /// Product id
        product_id: String,
    },
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
enum CareerAction {
    /// Show the open position
    Show,
    /// Submit an application
    Apply {
        /// First name
        #[arg(long)]
        first_name: String,

        /// Last name
        #[arg(long)]
        last_name: String,

        /// Contact email
        #[arg(short, long)]
        email: String,

        /// Cover message
        #[arg(short, long)]
        message: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig::from_env()?;
    let api = ApiClient::new(&config);
    let session = SessionStore::with_data_dir(api.clone(), &config.data_dir);
    let cart = CartStore::new(api.clone());

    // Restore the persisted session so authenticated commands carry the
    // bearer token. A corrupt session degrades to logged-out.
    if let Err(e) = session.restore() {
        tracing::warn!("Could not restore session: {e}");
    }

    match cli.command {
        Commands::Products { action } => match action {
            ProductsAction::List { category, page } => {
                commands::products::list(&api, category.as_deref(), page).await?;
            }
            ProductsAction::Promoted => commands::products::promoted(&api).await?,
        },
        Commands::Auth { action } => match action {
            AuthAction::Login { email, password } => {
                commands::auth::login(&session, &email, &password).await?;
            }
            AuthAction::Register {
                name,
                email,
                phone,
                password,
            } => {
                commands::auth::register(&session, &name, &email, &phone, &password).await?;
            }
            AuthAction::Logout => commands::auth::logout(&session, &cart)?,
            AuthAction::Whoami => commands::auth::whoami(&session),
            AuthAction::Verify { code } => commands::auth::verify(&session, &code).await?,
            AuthAction::ResendVerification => {
                commands::auth::resend_verification(&session).await?;
            }
            AuthAction::ChangePassword {
                old_password,
                new_password,
                confirm_password,
            } => {
                commands::auth::change_password(
                    &session,
                    &old_password,
                    &new_password,
                    &confirm_password,
                )
                .await?;
            }
            AuthAction::UpdateProfile { name, phone } => {
                commands::auth::update_profile(&session, &name, &phone).await?;
            }
        },
        Commands::Cart { action } => {
            commands::cart::require_verified(&session)?;
            match action {
                CartAction::Show => commands::cart::show(&cart, &config).await?,
                CartAction::Add {
                    product_id,
                    quantity,
                } => commands::cart::add(&cart, &product_id, quantity).await?,
                CartAction::Update {
                    product_id,
                    quantity,
                } => commands::cart::update(&cart, &product_id, quantity).await?,
                CartAction::Remove { product_id } => {
                    commands::cart::remove(&cart, &product_id).await?;
                }
                CartAction::Clear => commands::cart::clear(&cart).await?,
            }
        }
        Commands::Checkout {
            name,
            phone,
            street,
            city,
            country,
            state,
            postal_code,
            notes,
        } => {
            commands::cart::require_verified(&session)?;
            let delivery = zafaran_client::orders::DeliveryInfo {
                contact_name: name,
                phone_number: phone,
                street,
                city,
                state,
                postal_code,
                country,
                special_instructions: notes,
                preferred_delivery_time: String::new(),
            };
            commands::checkout::place_order(&api, &cart, delivery).await?;
        }
        Commands::ResendConfirmation { order_number } => {
            commands::checkout::resend(&api, &order_number).await?;
        }
        Commands::Inspiration => commands::content::inspiration(&api).await?,
        Commands::Career { action } => match action {
            CareerAction::Show => commands::content::career(&api).await?,
            CareerAction::Apply {
                first_name,
                last_name,
                email,
                message,
            } => {
                commands::content::apply(&api, first_name, last_name, email, message).await?;
            }
        },
    }
    Ok(())
}
