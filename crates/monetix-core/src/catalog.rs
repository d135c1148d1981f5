//! Catalog data model
//!
//! Gamepasses and developer products share one shape on our side
//! ([`CatalogItem`]) even though upstream names their id and collection
//! fields differently. [`ResourceKind`] owns the per-kind endpoint paths and
//! dashboard links; the serde aliases on the raw records absorb the rest.

use crate::error::{MonetixError, Result};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Feature flag upstream lists when regional pricing is turned on
pub const REGIONAL_PRICING_FEATURE: &str = "RegionalPricing";

/// The two monetization resources managed by Monetix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    GamePass,
    DeveloperProduct,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 2] = [ResourceKind::GamePass, ResourceKind::DeveloperProduct];

    /// Human readable label
    pub fn label(self) -> &'static str {
        match self {
            ResourceKind::GamePass => "gamepass",
            ResourceKind::DeveloperProduct => "developer product",
        }
    }

    /// Collection path for a universe (create target)
    pub fn collection_path(self, universe_id: &str) -> String {
        match self {
            ResourceKind::GamePass => {
                format!("/game-passes/v1/universes/{universe_id}/game-passes")
            }
            ResourceKind::DeveloperProduct => {
                format!("/developer-products/v2/universes/{universe_id}/developer-products")
            }
        }
    }

    /// Paginated creator listing path
    pub fn list_path(self, universe_id: &str) -> String {
        format!("{}/creator", self.collection_path(universe_id))
    }

    /// Single item path (update target)
    pub fn item_path(self, universe_id: &str, item_id: &str) -> String {
        format!("{}/{item_id}", self.collection_path(universe_id))
    }

    pub fn icon_path(self, item_id: &str) -> String {
        match self {
            ResourceKind::GamePass => {
                format!("/legacy-game-internationalization/v1/game-passes/{item_id}/icons")
            }
            ResourceKind::DeveloperProduct => {
                format!("/legacy-game-internationalization/v1/developer-products/{item_id}/icons")
            }
        }
    }

    /// Creator dashboard page listing this kind for a universe
    pub fn dashboard_url(self, universe_id: &str) -> String {
        let section = match self {
            ResourceKind::GamePass => "passes",
            ResourceKind::DeveloperProduct => "developer-products",
        };
        format!(
            "https://create.roblox.com/dashboard/creations/experiences/{universe_id}/monetization/{section}"
        )
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ResourceKind {
    type Err = MonetixError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gamepass" | "gamepasses" | "game-pass" | "game-passes" | "pass" | "passes" => {
                Ok(ResourceKind::GamePass)
            }
            "developer-product" | "developer-products" | "devproduct" | "dev-product"
            | "product" | "products" => Ok(ResourceKind::DeveloperProduct),
            other => Err(MonetixError::validation(format!(
                "Unknown resource kind: {other}"
            ))),
        }
    }
}

/// A gamepass or developer product as shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: u64,
    pub is_for_sale: bool,
    pub is_regional_pricing_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

/// Upstream ids arrive as numbers, but tolerate strings too
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Number(u64),
    Text(String),
}

impl fmt::Display for RawId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawId::Number(n) => write!(f, "{n}"),
            RawId::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceInformation {
    #[serde(default)]
    pub default_price_in_robux: Option<u64>,
    #[serde(default)]
    pub enabled_features: Option<Vec<String>>,
}

/// Item record as returned by the list and create endpoints
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCatalogItem {
    #[serde(alias = "gamePassId", alias = "developerProductId")]
    pub id: RawId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_for_sale: Option<bool>,
    #[serde(default)]
    pub price_information: Option<PriceInformation>,
}

pub fn has_regional_pricing(features: Option<&[String]>) -> bool {
    features
        .map(|f| f.iter().any(|feature| feature == REGIONAL_PRICING_FEATURE))
        .unwrap_or(false)
}

impl RawCatalogItem {
    fn default_price(&self) -> Option<u64> {
        self.price_information
            .as_ref()
            .and_then(|p| p.default_price_in_robux)
    }

    /// Normalize into a [`CatalogItem`]; the icon is attached later
    pub fn into_item(self) -> CatalogItem {
        let price = self.default_price().unwrap_or(0);
        let is_regional_pricing_enabled = has_regional_pricing(
            self.price_information
                .as_ref()
                .and_then(|p| p.enabled_features.as_deref()),
        );
        CatalogItem {
            id: self.id.to_string(),
            name: self.name.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            price,
            is_for_sale: self.is_for_sale.unwrap_or(false),
            is_regional_pricing_enabled,
            icon_url: None,
        }
    }
}

/// One page of a creator listing
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    #[serde(default, alias = "gamePasses", alias = "developerProducts")]
    pub items: Vec<RawCatalogItem>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IconEntry {
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub language_code: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IconResponse {
    #[serde(default)]
    pub data: Vec<IconEntry>,
}

impl IconResponse {
    pub fn first_image_url(self) -> Option<String> {
        self.data.into_iter().next().and_then(|entry| entry.image_url)
    }
}

/// Image attached to a create or update call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = content_type_for(&file_name).to_string();
        Self {
            file_name,
            content_type,
            bytes,
        }
    }

    /// Read an image from disk
    pub async fn load(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            MonetixError::IoError(format!("Failed to read image {}: {e}", path.display()))
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "image".to_string());
        Ok(Self::new(file_name, bytes))
    }

    fn to_part(&self) -> Result<Part> {
        Part::bytes(self.bytes.clone())
            .file_name(self.file_name.clone())
            .mime_str(&self.content_type)
            .map_err(|e| MonetixError::validation(format!("Invalid image content type: {e}")))
    }
}

fn content_type_for(file_name: &str) -> &'static str {
    let extension = Path::new(file_name)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Parse a user-entered price
pub fn parse_price(input: &str) -> Result<u64> {
    input
        .trim()
        .parse::<u64>()
        .map_err(|_| MonetixError::validation("Price must be a valid positive number."))
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(MonetixError::validation("Name is required."));
    }
    Ok(())
}

/// Fields for a new item (also one row of a bulk create)
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: u64,
    #[serde(default)]
    pub is_regional_pricing_enabled: bool,
    #[serde(skip)]
    pub image_file: Option<ImageFile>,
}

impl ItemDraft {
    pub fn new(name: impl Into<String>, price: u64) -> Self {
        Self {
            name: name.into(),
            price,
            ..Default::default()
        }
    }

    pub fn has_name(&self) -> bool {
        !self.name.trim().is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        validate_name(&self.name)
    }

    /// Text fields in the order they are sent; new items always go on sale
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("name", self.name.clone()),
            ("description", self.description.clone()),
            ("price", self.price.to_string()),
            ("isForSale", "true".to_string()),
            (
                "isRegionalPricingEnabled",
                self.is_regional_pricing_enabled.to_string(),
            ),
        ]
    }

    pub fn to_form(&self) -> Result<Form> {
        build_form(self.form_fields(), self.image_file.as_ref())
    }
}

/// Partial update; `None` fields are left untouched upstream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<u64>,
    pub is_for_sale: Option<bool>,
    pub is_regional_pricing_enabled: Option<bool>,
    pub image_file: Option<ImageFile>,
}

impl ItemPatch {
    pub fn is_empty(&self) -> bool {
        self.form_fields().is_empty() && self.image_file.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if self.is_empty() {
            return Err(MonetixError::validation("Nothing to update."));
        }
        Ok(())
    }

    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = Vec::new();
        if let Some(name) = &self.name {
            fields.push(("name", name.clone()));
        }
        if let Some(description) = &self.description {
            fields.push(("description", description.clone()));
        }
        if let Some(price) = self.price {
            fields.push(("price", price.to_string()));
        }
        if let Some(for_sale) = self.is_for_sale {
            fields.push(("isForSale", for_sale.to_string()));
        }
        if let Some(regional) = self.is_regional_pricing_enabled {
            fields.push(("isRegionalPricingEnabled", regional.to_string()));
        }
        fields
    }

    pub fn to_form(&self) -> Result<Form> {
        build_form(self.form_fields(), self.image_file.as_ref())
    }
}

fn build_form(fields: Vec<(&'static str, String)>, image: Option<&ImageFile>) -> Result<Form> {
    let mut form = Form::new();
    for (name, value) in fields {
        form = form.text(name, value);
    }
    if let Some(image) = image {
        form = form.part("imageFile", image.to_part()?);
    }
    Ok(form)
}

/// What upstream reports after a successful create
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedItem {
    pub id: String,
    pub name: String,
    pub price: u64,
}

impl CreatedItem {
    /// Prefer the stored values; fall back to what was requested
    pub fn from_raw(raw: RawCatalogItem, requested: &ItemDraft) -> Self {
        let price = raw.default_price().unwrap_or(requested.price);
        Self {
            id: raw.id.to_string(),
            name: raw.name.unwrap_or_else(|| requested.name.clone()),
            price,
        }
    }
}
