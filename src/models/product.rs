use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use tracing::warn;
use validator::{Validate, ValidationError};

use crate::utils::validation::{is_object_id, parse_tags};

/// Canonical product identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the id has the shape the catalog issues (24 hex digits).
    pub fn is_object_id(&self) -> bool {
        is_object_id(&self.0)
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProductId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ProductId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProductError {
    #[error("Product document has neither `id` nor `_id` (name: {name:?})")]
    MissingIdentity { name: Option<String> },

    #[error("Invalid product id: {0}")]
    InvalidId(String),
}

/// Product document exactly as the commerce API sends it.
///
/// Every field is optional and numbers are accepted as JSON numbers or numeric
/// strings; normalisation into [`Product`] happens in one place.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireProduct {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<String>,
    #[serde(rename = "_id", default, deserialize_with = "lenient_id")]
    pub object_id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub final_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub discount: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub rating: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub reviews_count: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub stock: Option<f64>,
    #[serde(rename = "imageURL")]
    pub image_url: Option<String>,
    pub image: Option<String>,
    pub images: Option<Vec<String>>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub tags: Vec<String>,
    pub specs: Option<Map<String, Value>>,
    pub specifications: Option<Map<String, Value>>,
    pub highlights: Option<Vec<String>>,
}

impl WireProduct {
    /// `id` wins over `_id`; blank values count as absent.
    pub fn identity(&self) -> Option<ProductId> {
        self.id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .or_else(|| self.object_id.as_deref().filter(|id| !id.trim().is_empty()))
            .map(|id| ProductId::new(id.trim()))
    }
}

/// Normalised catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub brand: String,
    pub category: String,
    pub image_url: String,
    pub list_price: f64,
    pub final_price: f64,
    pub discount: f64,
    pub rating: f64,
    pub reviews_count: u64,
    pub stock: i64,
    pub tags: Vec<String>,
}

impl Product {
    pub fn new(
        id: impl Into<ProductId>,
        name: impl Into<String>,
        category: impl Into<String>,
        list_price: f64,
        final_price: f64,
    ) -> Self {
        let id = id.into();
        let (list_price, final_price) = normalize_prices(&id, Some(list_price), Some(final_price));
        Self {
            id,
            name: name.into(),
            brand: String::new(),
            category: category.into(),
            image_url: String::new(),
            list_price,
            final_price,
            discount: 0.0,
            rating: 0.0,
            reviews_count: 0,
            stock: 0,
            tags: Vec::new(),
        }
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = brand.into();
        self
    }

    /// Whole-percent discount as shown next to the price.
    pub fn discount_percent(&self) -> u32 {
        if self.list_price <= 0.0 {
            return 0;
        }
        (((self.list_price - self.final_price) / self.list_price) * 100.0).round() as u32
    }
}

impl TryFrom<WireProduct> for Product {
    type Error = ProductError;

    fn try_from(wire: WireProduct) -> Result<Self, Self::Error> {
        let id = wire.identity().ok_or_else(|| ProductError::MissingIdentity {
            name: wire.name.clone(),
        })?;

        let (list_price, final_price) = normalize_prices(&id, wire.price, wire.final_price);

        let image_url = wire
            .image_url
            .filter(|url| !url.is_empty())
            .or(wire.image.filter(|url| !url.is_empty()))
            .or_else(|| wire.images.and_then(|images| images.into_iter().next()))
            .unwrap_or_default();

        Ok(Self {
            id,
            name: wire.name.unwrap_or_default(),
            brand: wire.brand.unwrap_or_default(),
            category: wire.category.unwrap_or_default(),
            image_url,
            list_price,
            final_price,
            discount: wire.discount.unwrap_or(0.0).max(0.0),
            rating: wire.rating.unwrap_or(0.0).max(0.0),
            reviews_count: wire.reviews_count.unwrap_or(0.0).max(0.0) as u64,
            stock: wire.stock.unwrap_or(0.0) as i64,
            tags: wire.tags,
        })
    }
}

/// Product page payload: the product plus its long-form content.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductDetail {
    pub product: Product,
    pub description: String,
    pub specs: Vec<(String, String)>,
    pub highlights: Vec<String>,
}

impl TryFrom<WireProduct> for ProductDetail {
    type Error = ProductError;

    fn try_from(mut wire: WireProduct) -> Result<Self, Self::Error> {
        let description = wire.description.take().unwrap_or_default();
        let highlights = wire.highlights.take().unwrap_or_default();
        let specs = wire
            .specs
            .take()
            .filter(|specs| !specs.is_empty())
            .or_else(|| wire.specifications.take())
            .map(|specs| {
                specs
                    .into_iter()
                    .map(|(label, value)| (label, spec_value_to_string(value)))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            product: Product::try_from(wire)?,
            description,
            specs,
            highlights,
        })
    }
}

/// New listing submitted by a seller.
#[derive(Debug, Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    #[validate(custom = "validate_not_blank")]
    pub name: String,

    pub brand: String,

    #[validate(range(min = 0.01, message = "Price must be greater than zero"))]
    pub price: f64,

    #[validate(range(min = 0.0, max = 100.0, message = "Discount must be 0-100 percent"))]
    pub discount: f64,

    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub stock: i64,

    pub category: String,

    pub sub_category: String,

    pub description: String,

    #[serde(rename = "imageURL")]
    pub image_url: String,

    pub tags: Vec<String>,

    pub highlights: Vec<String>,

    pub specs: Map<String, Value>,
}

impl ProductDraft {
    pub fn new(name: impl Into<String>, price: f64) -> Self {
        Self {
            name: name.into(),
            brand: "Generic".to_string(),
            price,
            discount: 0.0,
            stock: 0,
            category: "Other".to_string(),
            sub_category: String::new(),
            description: String::new(),
            image_url: String::new(),
            tags: Vec::new(),
            highlights: Vec::new(),
            specs: Map::new(),
        }
    }

    /// Editable copy of a live listing, used as the starting point of an edit.
    pub fn from_detail(detail: &ProductDetail) -> Self {
        let product = &detail.product;
        let discount = if product.discount > 0.0 {
            product.discount.min(100.0)
        } else {
            f64::from(product.discount_percent())
        };
        Self {
            name: product.name.clone(),
            brand: product.brand.clone(),
            price: product.list_price,
            discount,
            stock: product.stock.max(0),
            category: product.category.clone(),
            sub_category: String::new(),
            description: detail.description.clone(),
            image_url: product.image_url.clone(),
            tags: product.tags.clone(),
            highlights: detail.highlights.clone(),
            specs: detail
                .specs
                .iter()
                .map(|(label, value)| (label.clone(), Value::String(value.clone())))
                .collect(),
        }
    }

    pub fn with_tags(mut self, raw: &str) -> Self {
        self.tags = parse_tags(raw);
        self
    }

    /// Price after the percentage discount, the way the catalog stores it.
    pub fn final_price(&self) -> f64 {
        self.price - (self.price * (self.discount / 100.0))
    }
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct StockUpdate {
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub stock: i64,
}

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

fn normalize_prices(id: &ProductId, price: Option<f64>, final_price: Option<f64>) -> (f64, f64) {
    let list = match price {
        Some(price) if price >= 0.0 => price,
        Some(price) => {
            warn!("Product {}: negative price {} clamped to 0", id, price);
            0.0
        }
        None => {
            warn!("Product {}: missing price, treating as 0", id);
            0.0
        }
    };

    let final_price = match final_price {
        Some(value) if value < 0.0 => {
            warn!("Product {}: negative final price {} clamped to 0", id, value);
            0.0
        }
        Some(value) if value > list => {
            warn!(
                "Product {}: final price {} above list price {}, using list price",
                id, value, list
            );
            list
        }
        Some(value) => value,
        None => list,
    };

    (list, final_price)
}

fn spec_value_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Object(map)) => map.get("$oid").and_then(Value::as_str).map(str::to_string),
        _ => None,
    })
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite()))
}

fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => parse_tags(&s),
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}
