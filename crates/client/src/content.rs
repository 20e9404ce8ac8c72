//! Editorial content: home sections, inspiration gallery, careers.
//!
//! Read-only one-off fetches plus the career application submission. The
//! content endpoints use snake_case field names, unlike the camelCase cart
//! and order wire shapes; the types here keep the wire names exact.
//!
//! The career endpoints answer `{status: "success", message}` rather than
//! the `{success, data}` envelope the rest of the backend speaks.

use serde::{Deserialize, Serialize};
use tracing::instrument;

use zafaran_core::Email;

use crate::api::{ApiClient, ApiError, Envelope, StatusEnvelope};

/// A titled block of rich text, as used by the home page sections.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContentBlock {
    /// Block heading.
    #[serde(default)]
    pub title: Option<String>,
    /// Body, may contain HTML markup.
    #[serde(default)]
    pub text: Option<String>,
}

/// The about-us lead section.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AboutSection {
    /// Section heading.
    #[serde(default)]
    pub title: Option<String>,
    /// Lead paragraph.
    #[serde(default)]
    pub description: Option<String>,
}

/// Home page content, grouped the way the backend groups it.
///
/// Sections are individually optional; a missing section renders as empty
/// rather than failing the whole page.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HomeContent {
    /// Lead about-us section.
    #[serde(default)]
    pub about_us: AboutSection,
    /// Feature blocks.
    #[serde(default)]
    pub features: Vec<ContentBlock>,
    /// Why-us blocks.
    #[serde(default)]
    pub why_us: Vec<ContentBlock>,
}

/// One inspiration gallery item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryItem {
    /// Image path, relative to the image base URL.
    #[serde(default)]
    pub image: Option<String>,
    /// Caption.
    #[serde(default)]
    pub text: Option<String>,
}

/// Inspiration page content.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InspirationContent {
    /// Page heading.
    #[serde(default)]
    pub page_title: Option<String>,
    /// Page lead text.
    #[serde(default)]
    pub page_description: Option<String>,
    /// Gallery items.
    #[serde(default)]
    pub gallery: Vec<GalleryItem>,
}

/// Open position description shown on the careers page.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CareerContent {
    /// Position title.
    #[serde(default)]
    pub title: Option<String>,
    /// Position description.
    #[serde(default)]
    pub description: Option<String>,
    /// Banner image path.
    #[serde(default)]
    pub image: Option<String>,
}

/// A career application submission.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CareerApplication {
    /// Applicant first name.
    pub first_name: String,
    /// Applicant last name.
    pub last_name: String,
    /// Contact email.
    pub email: String,
    /// Cover message.
    pub message: String,
}

/// Errors that can occur submitting a career application.
#[derive(Debug, thiserror::Error)]
pub enum ApplicationError {
    /// Backend call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A required field was left empty.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// The contact email does not parse.
    #[error("invalid email address: {0}")]
    InvalidEmail(#[from] zafaran_core::EmailError),

    /// Backend answered with a non-success status.
    #[error("{0}")]
    Rejected(String),
}

impl CareerApplication {
    fn validate(&self) -> Result<(), ApplicationError> {
        if self.first_name.trim().is_empty() {
            return Err(ApplicationError::MissingField("first name"));
        }
        if self.last_name.trim().is_empty() {
            return Err(ApplicationError::MissingField("last name"));
        }
        Email::parse(&self.email)?;
        if self.message.trim().is_empty() {
            return Err(ApplicationError::MissingField("message"));
        }
        Ok(())
    }
}

/// Fetch the home page content.
///
/// # Errors
///
/// Returns an error on transport failure or a rejected/unparseable response.
#[instrument(skip(api))]
pub async fn home(api: &ApiClient) -> Result<HomeContent, ApiError> {
    let envelope: Envelope<HomeContent> = api.get("/home").await?;
    Ok(envelope.into_optional()?.unwrap_or_default())
}

/// Fetch the inspiration gallery.
///
/// # Errors
///
/// Returns an error on transport failure or a rejected/unparseable response.
#[instrument(skip(api))]
pub async fn inspiration(api: &ApiClient) -> Result<InspirationContent, ApiError> {
    let envelope: Envelope<InspirationContent> = api.get("/inspiration").await?;
    envelope.into_result()
}

/// Fetch the open position shown on the careers page.
///
/// # Errors
///
/// Returns an error on transport failure or a rejected/unparseable response.
#[instrument(skip(api))]
pub async fn career(api: &ApiClient) -> Result<CareerContent, ApiError> {
    let envelope: Envelope<CareerContent> = api.get("/career").await?;
    envelope.into_result()
}

/// Submit a career application.
///
/// Validates locally first; an invalid form never reaches the network.
///
/// # Errors
///
/// Returns an error when a required field is empty, the email does not
/// parse, the backend call fails, or the backend reports a non-success
/// status.
#[instrument(skip(api, application))]
pub async fn apply(
    api: &ApiClient,
    application: &CareerApplication,
) -> Result<(), ApplicationError> {
    application.validate()?;

    let response: StatusEnvelope = api.post("/career/apply", application).await?;
    if response.is_success() {
        Ok(())
    } else {
        Err(ApplicationError::Rejected(
            response
                .message
                .unwrap_or_else(|| "Failed to submit application".to_owned()),
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn application() -> CareerApplication {
        CareerApplication {
            first_name: "Rana".to_owned(),
            last_name: "Haddad".to_owned(),
            email: "rana@example.com".to_owned(),
            message: "I would love to join the harvest team.".to_owned(),
        }
    }

    #[test]
    fn test_application_serializes_camel_case() {
        let json = serde_json::to_value(application()).unwrap();
        assert_eq!(json["firstName"], "Rana");
        assert_eq!(json["lastName"], "Haddad");
        assert!(json.get("first_name").is_none());
    }

    #[test]
    fn test_application_validation() {
        assert!(application().validate().is_ok());

        let mut missing = application();
        missing.first_name = "  ".to_owned();
        assert!(matches!(
            missing.validate(),
            Err(ApplicationError::MissingField("first name"))
        ));

        let mut bad_email = application();
        bad_email.email = "not-an-email".to_owned();
        assert!(matches!(
            bad_email.validate(),
            Err(ApplicationError::InvalidEmail(_))
        ));
    }

    #[test]
    fn test_home_content_tolerates_missing_sections() {
        let content: HomeContent = serde_json::from_str("{}").unwrap();
        assert!(content.about_us.title.is_none());
        assert!(content.features.is_empty());
    }

    #[test]
    fn test_inspiration_content_wire_names() {
        let raw = r#"{
            "page_title": "Inspiration",
            "page_description": "Cooking with saffron",
            "gallery": [{"image": "dish.jpg", "text": "Saffron risotto"}]
        }"#;
        let content: InspirationContent = serde_json::from_str(raw).unwrap();
        assert_eq!(content.page_title.as_deref(), Some("Inspiration"));
        assert_eq!(content.gallery.len(), 1);
        assert_eq!(content.gallery[0].image.as_deref(), Some("dish.jpg"));
    }
}
