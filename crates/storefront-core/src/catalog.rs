//! Product catalog input types and validation, shared by the HTTP API and the
//! YAML catalog seeder.

use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{ConfigError, CoreError};

pub const DEFAULT_IMAGE: &str = "/uploads/example.jpeg";
pub const DEFAULT_COLOR: &str = "#222";
pub const DEFAULT_INVENTORY: i32 = 15;

const MAX_NAME_LEN: usize = 100;
const MAX_DESCRIPTION_LEN: usize = 1000;
/// Largest value a `NUMERIC(12,2)` price column holds.
pub(crate) const MAX_PRICE: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Office,
    Kitchen,
    Bedroom,
}

impl Category {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Office => "office",
            Category::Kitchen => "kitchen",
            Category::Bedroom => "bedroom",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "office" => Ok(Category::Office),
            "kitchen" => Ok(Category::Kitchen),
            "bedroom" => Ok(Category::Bedroom),
            other => Err(CoreError::InvalidCategory(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Company {
    Ikea,
    Liddy,
    Marcos,
}

impl Company {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Company::Ikea => "ikea",
            Company::Liddy => "liddy",
            Company::Marcos => "marcos",
        }
    }
}

impl std::fmt::Display for Company {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Company {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "ikea" => Ok(Company::Ikea),
            "liddy" => Ok(Company::Liddy),
            "marcos" => Ok(Company::Marcos),
            other => Err(CoreError::InvalidCompany(other.to_string())),
        }
    }
}

/// Unvalidated product input, as submitted by a client or read from YAML.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProductDraft {
    pub name: String,
    pub price: Decimal,
    pub description: String,
    #[serde(default)]
    pub image: Option<String>,
    pub category: String,
    pub company: String,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub free_shipping: bool,
    #[serde(default)]
    pub inventory: Option<i32>,
}

/// A validated product ready to be inserted. Defaults have been applied.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub price: Decimal,
    pub description: String,
    pub image: String,
    pub category: Category,
    pub company: Company,
    pub colors: Vec<String>,
    pub featured: bool,
    pub free_shipping: bool,
    pub inventory: i32,
}

impl ProductDraft {
    /// # Errors
    ///
    /// Returns the first [`CoreError`] found while checking each field.
    pub fn validate(self) -> Result<NewProduct, CoreError> {
        let colors = validate_colors(self.colors)?;
        Ok(NewProduct {
            name: validate_name(&self.name)?,
            price: validate_price(self.price)?,
            description: validate_description(&self.description)?,
            image: match self.image {
                Some(image) => validate_image(&image)?,
                None => DEFAULT_IMAGE.to_string(),
            },
            category: self.category.parse()?,
            company: self.company.parse()?,
            colors: if colors.is_empty() {
                vec![DEFAULT_COLOR.to_string()]
            } else {
                colors
            },
            featured: self.featured,
            free_shipping: self.free_shipping,
            inventory: validate_inventory(self.inventory.unwrap_or(DEFAULT_INVENTORY))?,
        })
    }
}

/// Sparse product update. Derived rating fields are deliberately absent, so
/// a body that tries to set them is rejected as an unknown field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub category: Option<String>,
    pub company: Option<String>,
    pub colors: Option<Vec<String>>,
    pub featured: Option<bool>,
    pub free_shipping: Option<bool>,
    pub inventory: Option<i32>,
}

/// A validated sparse update; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub category: Option<Category>,
    pub company: Option<Company>,
    pub colors: Option<Vec<String>>,
    pub featured: Option<bool>,
    pub free_shipping: Option<bool>,
    pub inventory: Option<i32>,
}

impl ProductPatch {
    /// # Errors
    ///
    /// Returns the first [`CoreError`] found among the supplied fields.
    pub fn validate(self) -> Result<ProductChanges, CoreError> {
        Ok(ProductChanges {
            name: self.name.as_deref().map(validate_name).transpose()?,
            price: self.price.map(validate_price).transpose()?,
            description: self
                .description
                .as_deref()
                .map(validate_description)
                .transpose()?,
            image: self.image.as_deref().map(validate_image).transpose()?,
            category: self.category.map(|c| c.parse()).transpose()?,
            company: self.company.map(|c| c.parse()).transpose()?,
            colors: self
                .colors
                .map(|colors| {
                    let colors = validate_colors(colors)?;
                    if colors.is_empty() {
                        Err(CoreError::InvalidField {
                            field: "colors",
                            reason: "must contain at least one color".to_string(),
                        })
                    } else {
                        Ok(colors)
                    }
                })
                .transpose()?,
            featured: self.featured,
            free_shipping: self.free_shipping,
            inventory: self.inventory.map(validate_inventory).transpose()?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CatalogFile {
    pub products: Vec<ProductDraft>,
}

/// Load and validate a product catalog from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or any product
/// fails validation.
pub fn load_catalog(path: &Path) -> Result<Vec<NewProduct>, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::CatalogFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_catalog(&content)
}

fn parse_catalog(content: &str) -> Result<Vec<NewProduct>, ConfigError> {
    let file: CatalogFile = serde_yaml::from_str(content)?;
    file.products
        .into_iter()
        .map(|draft| {
            let name = draft.name.clone();
            draft
                .validate()
                .map_err(|source| ConfigError::CatalogValidation { name, source })
        })
        .collect()
}

fn validate_name(name: &str) -> Result<String, CoreError> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.chars().count() > MAX_NAME_LEN {
        return Err(CoreError::InvalidField {
            field: "name",
            reason: format!("must be 1-{MAX_NAME_LEN} characters"),
        });
    }
    Ok(trimmed.to_owned())
}

fn validate_description(description: &str) -> Result<String, CoreError> {
    let trimmed = description.trim();
    if trimmed.is_empty() || trimmed.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(CoreError::InvalidField {
            field: "description",
            reason: format!("must be 1-{MAX_DESCRIPTION_LEN} characters"),
        });
    }
    Ok(trimmed.to_owned())
}

fn validate_price(price: Decimal) -> Result<Decimal, CoreError> {
    validate_money("price", price)
}

/// Non-negative, two decimal places, and small enough for a `NUMERIC(12,2)` column.
pub(crate) fn validate_money(field: &'static str, value: Decimal) -> Result<Decimal, CoreError> {
    if value.is_sign_negative() {
        return Err(CoreError::InvalidField {
            field,
            reason: format!("must not be negative, got {value}"),
        });
    }
    let rounded = value.round_dp(2);
    if rounded > MAX_PRICE {
        return Err(CoreError::InvalidField {
            field,
            reason: format!("must be at most {MAX_PRICE}, got {value}"),
        });
    }
    Ok(rounded)
}

fn validate_inventory(inventory: i32) -> Result<i32, CoreError> {
    if inventory < 0 {
        return Err(CoreError::InvalidField {
            field: "inventory",
            reason: format!("must not be negative, got {inventory}"),
        });
    }
    Ok(inventory)
}

fn validate_image(image: &str) -> Result<String, CoreError> {
    let trimmed = image.trim();
    if trimmed.is_empty() {
        return Err(CoreError::InvalidField {
            field: "image",
            reason: "must not be empty".to_string(),
        });
    }
    Ok(trimmed.to_owned())
}

fn validate_colors(colors: Vec<String>) -> Result<Vec<String>, CoreError> {
    colors
        .into_iter()
        .map(|c| {
            let trimmed = c.trim();
            if trimmed.is_empty() {
                Err(CoreError::InvalidField {
                    field: "colors",
                    reason: "must not contain empty values".to_string(),
                })
            } else {
                Ok(trimmed.to_owned())
            }
        })
        .collect()
}
