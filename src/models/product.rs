use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Catalog entity as held in memory. The persisted row shape lives in the
/// repository module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i32,
    pub name: String,
    pub price: f64,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

/// Values for a row about to be inserted; `id` is assigned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub price: f64,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

/// Raw multipart submission as extracted by the API layer. Validation happens
/// in the service, not here.
#[derive(Debug, Default)]
pub struct ProductSubmission {
    pub name: Option<String>,
    pub price: Option<String>,
    pub description: Option<String>,
    pub image: Option<UploadedImage>,
}

#[derive(Debug)]
pub struct UploadedImage {
    pub filename: String,
    pub content_type: Option<String>,
    pub content: Bytes,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

/// Wire shape for list/search responses. `image_url` is the empty string when
/// no image was stored, never null.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProductResponse {
    pub id: i32,
    pub name: String,
    pub price: f64,
    pub description: Option<String>,
    pub image_url: String,
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        Self {
            id: p.id,
            name: p.name,
            price: p.price,
            description: p.description,
            image_url: p.image_url.unwrap_or_default(),
        }
    }
}
