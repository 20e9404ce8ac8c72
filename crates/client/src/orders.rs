//! Checkout and order confirmation.
//!
//! Checkout validates the delivery form locally before any network call,
//! mirroring the storefront form rules: contact name, phone number, street,
//! city, and country are required; state, postal code, special instructions,
//! and preferred delivery time are optional. The backend re-validates; the
//! local check exists to short-circuit obviously incomplete forms.

use serde::{Deserialize, Serialize};
use tracing::instrument;

use zafaran_core::OrderNumber;

use crate::api::{ApiClient, ApiError, Envelope};

/// Delivery details collected at checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryInfo {
    /// Recipient name.
    pub contact_name: String,
    /// Contact phone number.
    pub phone_number: String,
    /// Street address.
    pub street: String,
    /// City.
    pub city: String,
    /// State or region, optional.
    #[serde(default)]
    pub state: String,
    /// Postal code, optional.
    #[serde(default)]
    pub postal_code: String,
    /// Country.
    pub country: String,
    /// Free-form delivery notes, optional.
    #[serde(default)]
    pub special_instructions: String,
    /// Preferred delivery time window, optional.
    #[serde(default)]
    pub preferred_delivery_time: String,
}

/// Supported payment methods.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Pay on delivery; the only method currently offered.
    #[default]
    CashOnDelivery,
}

/// The checkout request body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    /// Delivery details.
    pub delivery_info: DeliveryInfo,
    /// Payment method.
    pub payment_method: PaymentMethod,
}

impl CheckoutRequest {
    /// Build a cash-on-delivery checkout for the given delivery details.
    #[must_use]
    pub fn cash_on_delivery(delivery_info: DeliveryInfo) -> Self {
        Self {
            delivery_info,
            payment_method: PaymentMethod::CashOnDelivery,
        }
    }
}

/// A placed order, as confirmed by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedOrder {
    /// Order number shown to the customer and used for confirmation email
    /// resends.
    pub order_number: OrderNumber,
}

/// Errors that can occur placing an order.
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    /// Backend call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A required delivery field was left empty.
    #[error("{0} is required")]
    MissingField(&'static str),
}

impl DeliveryInfo {
    fn validate(&self) -> Result<(), OrderError> {
        if self.contact_name.trim().is_empty() {
            return Err(OrderError::MissingField("Contact name"));
        }
        if self.phone_number.trim().is_empty() {
            return Err(OrderError::MissingField("Phone number"));
        }
        if self.street.trim().is_empty() {
            return Err(OrderError::MissingField("Street address"));
        }
        if self.city.trim().is_empty() {
            return Err(OrderError::MissingField("City"));
        }
        if self.country.trim().is_empty() {
            return Err(OrderError::MissingField("Country"));
        }
        Ok(())
    }
}

/// Place an order for the current cart.
///
/// The caller clears the local cart on success; the backend has already
/// consumed the server-side cart.
///
/// # Errors
///
/// Returns an error when a required delivery field is empty (before any
/// network call) or when the backend rejects the order.
#[instrument(skip(api, request))]
pub async fn checkout(
    api: &ApiClient,
    request: &CheckoutRequest,
) -> Result<PlacedOrder, OrderError> {
    request.delivery_info.validate()?;

    let envelope: Envelope<PlacedOrder> = api.post("/orders/checkout", request).await?;
    Ok(envelope.into_result()?)
}

/// Ask the backend to resend the confirmation email for an order.
///
/// # Errors
///
/// Returns an error on transport failure or when the backend rejects the
/// request.
#[instrument(skip(api), fields(order = %order_number))]
pub async fn resend_confirmation(
    api: &ApiClient,
    order_number: &OrderNumber,
) -> Result<(), ApiError> {
    let path = format!("/orders/resend-confirmation/{order_number}");
    let envelope: Envelope<serde_json::Value> = api.post_empty(&path).await?;
    let _ = envelope.into_optional()?;
    Ok(())
}
