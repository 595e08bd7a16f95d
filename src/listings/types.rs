//! Listing data types
//!
//! Defines the listing record as held by the store, its app-facing JSON
//! form, and the request shapes used to create and patch listings.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const TITLE_MAX_CHARS: usize = 200;
pub const DESCRIPTION_MAX_CHARS: usize = 2000;

/// Canonical form of a client-chosen listing id, `None` when blank
pub fn normalize_id(raw: &str) -> Option<String> {
    let id = raw.trim();
    (!id.is_empty()).then(|| id.to_string())
}

/// Field-level validation failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("All required fields must be filled in (missing `{0}`)")]
    MissingField(&'static str),

    #[error("`{field}` must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("Unknown category: {0}")]
    UnknownCategory(String),
}

/// Listing categories accepted by the app
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Veículos")]
    Vehicles,
    #[serde(rename = "Imóveis")]
    RealEstate,
    #[serde(rename = "Eletrônicos")]
    Electronics,
    #[serde(rename = "Móveis")]
    Furniture,
    #[serde(rename = "Roupas")]
    Clothing,
    #[serde(rename = "Serviços")]
    Services,
    #[serde(rename = "Outros")]
    Other,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Vehicles,
        Category::RealEstate,
        Category::Electronics,
        Category::Furniture,
        Category::Clothing,
        Category::Services,
        Category::Other,
    ];

    /// Label used on the wire and in storage
    pub fn label(self) -> &'static str {
        match self {
            Category::Vehicles => "Veículos",
            Category::RealEstate => "Imóveis",
            Category::Electronics => "Eletrônicos",
            Category::Furniture => "Móveis",
            Category::Clothing => "Roupas",
            Category::Services => "Serviços",
            Category::Other => "Outros",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.label() == s)
            .ok_or_else(|| ValidationError::UnknownCategory(s.to_string()))
    }
}

/// User-editable content of a listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingContent {
    pub title: String,
    pub description: String,
    /// Free text, never parsed as a number
    pub price: String,
    pub category: Category,
    pub contact: String,
    pub images: Vec<String>,
}

/// A listing as stored for one owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: String,
    #[serde(skip_serializing)]
    pub owner_id: String,
    #[serde(skip_serializing)]
    pub device_id: String,
    pub title: String,
    pub description: String,
    pub price: String,
    pub category: Category,
    pub contact: String,
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
    /// Last-modified timestamp, the last-write-wins key
    pub updated_at: DateTime<Utc>,
    pub is_deleted: bool,
}

impl Listing {
    pub fn new(
        id: String,
        owner_id: &str,
        device_id: &str,
        content: ListingContent,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            owner_id: owner_id.to_string(),
            device_id: device_id.to_string(),
            title: content.title,
            description: content.description,
            price: content.price,
            category: content.category,
            contact: content.contact,
            images: content.images,
            created_at,
            updated_at,
            is_deleted: false,
        }
    }

    pub fn content(&self) -> ListingContent {
        ListingContent {
            title: self.title.clone(),
            description: self.description.clone(),
            price: self.price.clone(),
            category: self.category,
            contact: self.contact.clone(),
            images: self.images.clone(),
        }
    }

    pub fn set_content(&mut self, content: ListingContent) {
        self.title = content.title;
        self.description = content.description;
        self.price = content.price;
        self.category = content.category;
        self.contact = content.contact;
        self.images = content.images;
    }
}

/// Listing fields as submitted by a client
///
/// Every field is optional so the same shape serves creation (where the
/// required ones are enforced) and partial updates.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingFields {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
    pub category: Option<String>,
    pub contact: Option<String>,
    pub images: Option<Vec<String>>,
}

impl ListingFields {
    /// Build complete content, failing on the first missing or invalid field
    pub fn into_content(self) -> Result<ListingContent, ValidationError> {
        let title = required("title", self.title)?;
        let description = required("description", self.description)?;
        let price = required("price", self.price)?;
        let category = required("category", self.category)?;
        let contact = required("contact", self.contact)?;

        Ok(ListingContent {
            title: checked_title(&title)?,
            description: checked_description(description)?,
            price: price.trim().to_string(),
            category: category.parse()?,
            contact: contact.trim().to_string(),
            images: self.images.unwrap_or_default(),
        })
    }

    /// Overlay the supplied fields onto existing content
    pub fn apply_to(self, mut content: ListingContent) -> Result<ListingContent, ValidationError> {
        if let Some(title) = self.title {
            content.title = checked_title(&title)?;
        }
        if let Some(description) = self.description {
            content.description = checked_description(description)?;
        }
        if let Some(price) = self.price {
            content.price = non_blank("price", price)?;
        }
        if let Some(category) = self.category {
            content.category = category.parse()?;
        }
        if let Some(contact) = self.contact {
            content.contact = non_blank("contact", contact)?;
        }
        if let Some(images) = self.images {
            content.images = images;
        }
        Ok(content)
    }
}

fn required(field: &'static str, value: Option<String>) -> Result<String, ValidationError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ValidationError::MissingField(field)),
    }
}

fn non_blank(field: &'static str, value: String) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(trimmed.to_string())
}

fn checked_title(title: &str) -> Result<String, ValidationError> {
    let title = non_blank("title", title.to_string())?;
    if title.chars().count() > TITLE_MAX_CHARS {
        return Err(ValidationError::TooLong {
            field: "title",
            max: TITLE_MAX_CHARS,
        });
    }
    Ok(title)
}

fn checked_description(description: String) -> Result<String, ValidationError> {
    if description.trim().is_empty() {
        return Err(ValidationError::MissingField("description"));
    }
    if description.chars().count() > DESCRIPTION_MAX_CHARS {
        return Err(ValidationError::TooLong {
            field: "description",
            max: DESCRIPTION_MAX_CHARS,
        });
    }
    Ok(description)
}

/// Per-category listing count
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: Category,
    pub count: i64,
}

/// Aggregate view of an owner's active listings
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingStats {
    pub total: i64,
    pub by_category: Vec<CategoryCount>,
    pub last_update: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_fields() -> ListingFields {
        ListingFields {
            title: Some("  Bicicleta aro 29  ".into()),
            description: Some("Pouco usada".into()),
            price: Some(" R$ 1.200,00 ".into()),
            category: Some("Veículos".into()),
            contact: Some(" 11 99999-0000 ".into()),
            images: None,
        }
    }

    #[test]
    fn test_into_content_trims_and_defaults_images() {
        let content = full_fields().into_content().unwrap();
        assert_eq!(content.title, "Bicicleta aro 29");
        assert_eq!(content.price, "R$ 1.200,00");
        assert_eq!(content.contact, "11 99999-0000");
        assert_eq!(content.category, Category::Vehicles);
        assert!(content.images.is_empty());
    }

    #[test]
    fn test_missing_required_field() {
        let fields = ListingFields {
            contact: None,
            ..full_fields()
        };
        assert_eq!(
            fields.into_content().unwrap_err(),
            ValidationError::MissingField("contact")
        );
    }

    #[test]
    fn test_unknown_category() {
        let fields = ListingFields {
            category: Some("Brinquedos".into()),
            ..full_fields()
        };
        assert!(matches!(
            fields.into_content(),
            Err(ValidationError::UnknownCategory(_))
        ));
    }

    #[test]
    fn test_title_length_limit() {
        let fields = ListingFields {
            title: Some("x".repeat(TITLE_MAX_CHARS + 1)),
            ..full_fields()
        };
        assert!(matches!(
            fields.into_content(),
            Err(ValidationError::TooLong { field: "title", .. })
        ));
    }

    #[test]
    fn test_apply_to_only_touches_supplied_fields() {
        let original = full_fields().into_content().unwrap();
        let patch = ListingFields {
            price: Some("R$ 900,00".into()),
            images: Some(vec!["https://cdn.example/1.jpg".into()]),
            ..Default::default()
        };

        let patched = patch.apply_to(original.clone()).unwrap();
        assert_eq!(patched.price, "R$ 900,00");
        assert_eq!(patched.images.len(), 1);
        assert_eq!(patched.title, original.title);
        assert_eq!(patched.category, original.category);
    }

    #[test]
    fn test_normalize_id() {
        assert_eq!(normalize_id(" ad-1 ").as_deref(), Some("ad-1"));
        assert_eq!(normalize_id("   "), None);
    }

    #[test]
    fn test_category_wire_labels() {
        let json = serde_json::to_string(&Category::Electronics).unwrap();
        assert_eq!(json, "\"Eletrônicos\"");
        assert_eq!("Serviços".parse::<Category>().unwrap(), Category::Services);
    }
}
