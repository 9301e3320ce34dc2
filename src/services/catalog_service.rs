use std::sync::Arc;

use crate::{
    error::{AppError, Result},
    models::{NewProduct, Product, ProductSubmission},
    repository::ProductRepository,
    storage::BlobStore,
    utils::sanitize_filename,
};

/// Business rules for the catalog: validation, blob-name derivation, and the
/// ordering of storage and database calls. Holds its collaborators as injected
/// trait objects; there is no other state.
pub struct CatalogService {
    repository: Arc<dyn ProductRepository>,
    blob_store: Arc<dyn BlobStore>,
}

impl CatalogService {
    pub fn new(repository: Arc<dyn ProductRepository>, blob_store: Arc<dyn BlobStore>) -> Self {
        Self {
            repository,
            blob_store,
        }
    }

    /// Creates a product from a raw multipart submission and returns the new
    /// id. The image (when present) is uploaded before the row is inserted, so
    /// a failed upload leaves no row behind. The reverse does not hold: an
    /// insert failure after a successful upload leaves the blob orphaned, and
    /// no compensating delete is attempted.
    pub async fn create(&self, submission: ProductSubmission) -> Result<i32> {
        let name = submission
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| AppError::Validation("Name and price are required".to_string()))?
            .to_string();

        let price: f64 = submission
            .price
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| AppError::Validation("Name and price are required".to_string()))?
            .parse()
            .map_err(|_| AppError::Validation("Price must be a number".to_string()))?;

        let image_url = match submission.image {
            Some(image) => {
                let blob_name = sanitize_filename(&image.filename);
                if blob_name.is_empty() {
                    return Err(AppError::Validation(format!(
                        "Invalid image filename: {:?}",
                        image.filename
                    )));
                }

                let url = self
                    .blob_store
                    .put(&blob_name, image.content, image.content_type)
                    .await?;

                Some(url)
            }
            None => None,
        };

        let id = self
            .repository
            .insert(NewProduct {
                name,
                price,
                description: submission.description,
                image_url,
            })
            .await?;

        tracing::info!("Product {} created", id);

        Ok(id)
    }

    pub async fn list(&self) -> Result<Vec<Product>> {
        self.repository.list_all().await
    }

    /// A blank query lists the whole catalog rather than matching nothing.
    pub async fn search(&self, query: Option<&str>) -> Result<Vec<Product>> {
        match query.map(str::trim).filter(|q| !q.is_empty()) {
            Some(q) => self.repository.find_by_name_contains(q).await,
            None => self.repository.list_all().await,
        }
    }

    /// Deletes one product and, when it references an image, the blob behind
    /// it. Blob first, row second: a storage failure leaves the row in place.
    pub async fn delete_one(&self, id: i32) -> Result<Product> {
        let product = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No product with id {}", id)))?;

        if let Some(url) = &product.image_url {
            let blob_name = url.rsplit('/').next().unwrap_or("");
            if !blob_name.is_empty() {
                self.blob_store.delete(blob_name).await?;
            }
        }

        self.repository.delete_by_id(id).await?;

        tracing::info!("Product {} deleted", id);

        Ok(product)
    }

    /// Deletes every row and returns the count. Blobs are left untouched;
    /// bulk deletion never talks to storage.
    pub async fn delete_all(&self) -> Result<u64> {
        let deleted = self.repository.delete_all().await?;

        tracing::info!("Deleted {} products", deleted);

        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::UploadedImage,
        repository::MockProductRepository,
        storage::MockBlobStore,
    };
    use bytes::Bytes;
    use mockall::predicate::eq;

    fn service(repo: MockProductRepository, blobs: MockBlobStore) -> CatalogService {
        CatalogService::new(Arc::new(repo), Arc::new(blobs))
    }

    fn submission(name: Option<&str>, price: Option<&str>) -> ProductSubmission {
        ProductSubmission {
            name: name.map(String::from),
            price: price.map(String::from),
            description: None,
            image: None,
        }
    }

    fn image(filename: &str) -> UploadedImage {
        UploadedImage {
            filename: filename.to_string(),
            content_type: Some("image/png".to_string()),
            content: Bytes::from_static(b"\x89PNG"),
        }
    }

    fn product(id: i32, name: &str, image_url: Option<&str>) -> Product {
        Product {
            id,
            name: name.to_string(),
            price: 9.99,
            description: None,
            image_url: image_url.map(String::from),
        }
    }

    #[tokio::test]
    async fn create_without_image_inserts_row_with_no_url() {
        let mut repo = MockProductRepository::new();
        repo.expect_insert()
            .withf(|p| p.name == "Widget" && p.price == 9.99 && p.image_url.is_none())
            .returning(|_| Ok(1));
        // No expectations on the blob store: any call panics the test.
        let blobs = MockBlobStore::new();

        let id = service(repo, blobs)
            .create(submission(Some("Widget"), Some("9.99")))
            .await
            .unwrap();

        assert_eq!(id, 1);
    }

    #[tokio::test]
    async fn create_with_image_uploads_before_insert() {
        let mut seq = mockall::Sequence::new();

        let mut blobs = MockBlobStore::new();
        blobs
            .expect_put()
            .withf(|name, _, _| name == "red_mug.png")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|name, _, _| {
                Ok(format!(
                    "https://product-images.s3.us-east-1.amazonaws.com/{}",
                    name
                ))
            });

        let mut repo = MockProductRepository::new();
        repo.expect_insert()
            .withf(|p| {
                p.image_url.as_deref()
                    == Some("https://product-images.s3.us-east-1.amazonaws.com/red_mug.png")
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(7));

        let mut sub = submission(Some("Red Mug"), Some("12.50"));
        sub.image = Some(image("red mug.png"));

        let id = service(repo, blobs).create(sub).await.unwrap();

        assert_eq!(id, 7);
    }

    #[tokio::test]
    async fn create_fails_without_insert_when_upload_fails() {
        let mut blobs = MockBlobStore::new();
        blobs
            .expect_put()
            .returning(|_, _, _| Err(AppError::Storage("connection reset".to_string())));

        // No insert expectation: reaching the repository fails the test.
        let repo = MockProductRepository::new();

        let mut sub = submission(Some("Red Mug"), Some("12.50"));
        sub.image = Some(image("red_mug.png"));

        let err = service(repo, blobs).create(sub).await.unwrap_err();

        assert!(matches!(err, AppError::Storage(_)));
    }

    #[tokio::test]
    async fn create_with_missing_name_touches_nothing() {
        let repo = MockProductRepository::new();
        let blobs = MockBlobStore::new();

        let err = service(repo, blobs)
            .create(submission(None, Some("9.99")))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn create_with_blank_name_touches_nothing() {
        let repo = MockProductRepository::new();
        let blobs = MockBlobStore::new();

        let err = service(repo, blobs)
            .create(submission(Some("   "), Some("9.99")))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn create_rejects_non_numeric_price() {
        let repo = MockProductRepository::new();
        let blobs = MockBlobStore::new();

        let err = service(repo, blobs)
            .create(submission(Some("Widget"), Some("cheap")))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn create_rejects_unsanitizable_filename_before_upload() {
        let repo = MockProductRepository::new();
        let blobs = MockBlobStore::new();

        let mut sub = submission(Some("Widget"), Some("1.00"));
        sub.image = Some(image("日本語"));

        let err = service(repo, blobs).create(sub).await.unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn blank_search_behaves_as_list() {
        let mut repo = MockProductRepository::new();
        repo.expect_list_all()
            .times(2)
            .returning(|| Ok(vec![product(1, "Red Mug", None)]));
        let blobs = MockBlobStore::new();

        let svc = service(repo, blobs);

        let from_none = svc.search(None).await.unwrap();
        let from_blank = svc.search(Some("   ")).await.unwrap();

        assert_eq!(from_none, from_blank);
        assert_eq!(from_none.len(), 1);
    }

    #[tokio::test]
    async fn search_delegates_trimmed_fragment() {
        let mut repo = MockProductRepository::new();
        repo.expect_find_by_name_contains()
            .with(eq("red"))
            .returning(|_| {
                Ok(vec![
                    product(1, "Red Mug", None),
                    product(2, "red hat", None),
                ])
            });
        let blobs = MockBlobStore::new();

        let found = service(repo, blobs).search(Some(" red ")).await.unwrap();

        assert_eq!(found.len(), 2);
    }

    #[tokio::test]
    async fn delete_one_removes_blob_then_row() {
        let mut seq = mockall::Sequence::new();

        let mut repo = MockProductRepository::new();
        repo.expect_find_by_id()
            .with(eq(7))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                Ok(Some(product(
                    7,
                    "Red Mug",
                    Some("https://product-images.s3.us-east-1.amazonaws.com/red_mug.png"),
                )))
            });

        let mut blobs = MockBlobStore::new();
        blobs
            .expect_delete()
            .with(eq("red_mug.png"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        repo.expect_delete_by_id()
            .with(eq(7))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(true));

        let deleted = service(repo, blobs).delete_one(7).await.unwrap();

        assert_eq!(deleted.id, 7);
    }

    #[tokio::test]
    async fn delete_one_without_image_skips_storage() {
        let mut repo = MockProductRepository::new();
        repo.expect_find_by_id()
            .with(eq(3))
            .returning(|_| Ok(Some(product(3, "Blue Cup", None))));
        repo.expect_delete_by_id().with(eq(3)).returning(|_| Ok(true));
        let blobs = MockBlobStore::new();

        service(repo, blobs).delete_one(3).await.unwrap();
    }

    #[tokio::test]
    async fn delete_one_missing_is_not_found() {
        let mut repo = MockProductRepository::new();
        repo.expect_find_by_id().with(eq(42)).returning(|_| Ok(None));
        let blobs = MockBlobStore::new();

        let err = service(repo, blobs).delete_one(42).await.unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_one_keeps_row_when_storage_fails() {
        let mut repo = MockProductRepository::new();
        repo.expect_find_by_id().with(eq(7)).returning(|_| {
            Ok(Some(product(
                7,
                "Red Mug",
                Some("https://product-images.s3.us-east-1.amazonaws.com/red_mug.png"),
            )))
        });
        // No delete_by_id expectation: the row must survive a storage error.

        let mut blobs = MockBlobStore::new();
        blobs
            .expect_delete()
            .returning(|_| Err(AppError::Storage("access denied".to_string())));

        let err = service(repo, blobs).delete_one(7).await.unwrap_err();

        assert!(matches!(err, AppError::Storage(_)));
    }

    #[tokio::test]
    async fn delete_all_never_touches_storage() {
        let mut repo = MockProductRepository::new();
        repo.expect_delete_all().returning(|| Ok(3));
        // Rows referencing images may exist; bulk delete must still issue
        // zero storage calls, so the mock carries no expectations at all.
        let blobs = MockBlobStore::new();

        let deleted = service(repo, blobs).delete_all().await.unwrap();

        assert_eq!(deleted, 3);
    }
}
