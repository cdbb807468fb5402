//! Product endpoints (`productos/`), keyed by product code.

use reqwest::Method;
use tienda_core::{Page, Product};

use crate::client::{ApiClient, ALL_PAGE_SIZE};
use crate::error::ApiError;

const COLLECTION: &str = "productos";

impl ApiClient {
    /// # Errors
    ///
    /// Any [`ApiError`] from the request or decoding.
    pub async fn list_products(&self, page: u32) -> Result<Page<Product>, ApiError> {
        let page = page.to_string();
        let url = self.resource_url_with_query(&[COLLECTION], &[("page", &page)]);
        self.execute_json(Method::GET, &url, None).await
    }

    /// Fetches the whole catalog in one oversized page.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`] from the request or decoding.
    pub async fn list_all_products(&self) -> Result<Vec<Product>, ApiError> {
        let url = self.resource_url_with_query(&[COLLECTION], &[("page_size", ALL_PAGE_SIZE)]);
        let page: Page<Product> = self.execute_json(Method::GET, &url, None).await?;
        Ok(page.results)
    }

    /// # Errors
    ///
    /// [`ApiError::NotFound`] for an unknown code, or any other
    /// [`ApiError`] from the request.
    pub async fn get_product(&self, code: &str) -> Result<Product, ApiError> {
        let url = self.resource_url(&[COLLECTION, code]);
        self.execute_json(Method::GET, &url, None).await
    }

    /// # Errors
    ///
    /// Any [`ApiError`] from the request or decoding.
    pub async fn create_product(&self, product: &Product) -> Result<Product, ApiError> {
        let url = self.resource_url(&[COLLECTION]);
        let body = Self::encode_body(COLLECTION, product)?;
        self.execute_json(Method::POST, &url, Some(&body)).await
    }

    /// # Errors
    ///
    /// Any [`ApiError`] from the request or decoding.
    pub async fn update_product(&self, code: &str, product: &Product) -> Result<Product, ApiError> {
        let url = self.resource_url(&[COLLECTION, code]);
        let body = Self::encode_body(COLLECTION, product)?;
        self.execute_json(Method::PUT, &url, Some(&body)).await
    }

    /// # Errors
    ///
    /// Any [`ApiError`] from the request or decoding.
    pub async fn patch_product(
        &self,
        code: &str,
        changes: &serde_json::Value,
    ) -> Result<Product, ApiError> {
        let url = self.resource_url(&[COLLECTION, code]);
        self.execute_json(Method::PATCH, &url, Some(changes)).await
    }

    /// # Errors
    ///
    /// Any [`ApiError`] from the request.
    pub async fn delete_product(&self, code: &str) -> Result<(), ApiError> {
        let url = self.resource_url(&[COLLECTION, code]);
        self.execute(Method::DELETE, &url, None).await?;
        Ok(())
    }
}
