//! Customer endpoints (`clientes/`), keyed by tax-id.

use reqwest::Method;
use tienda_core::{Customer, Page};

use crate::client::{ApiClient, ALL_PAGE_SIZE};
use crate::error::ApiError;

const COLLECTION: &str = "clientes";

impl ApiClient {
    /// Fetches one page of customers.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`] from the request or decoding.
    pub async fn list_customers(&self, page: u32) -> Result<Page<Customer>, ApiError> {
        let page = page.to_string();
        let url = self.resource_url_with_query(&[COLLECTION], &[("page", &page)]);
        self.execute_json(Method::GET, &url, None).await
    }

    /// Fetches every customer in one oversized page.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`] from the request or decoding.
    pub async fn list_all_customers(&self) -> Result<Vec<Customer>, ApiError> {
        let url = self.resource_url_with_query(&[COLLECTION], &[("page_size", ALL_PAGE_SIZE)]);
        let page: Page<Customer> = self.execute_json(Method::GET, &url, None).await?;
        Ok(page.results)
    }

    /// Looks a customer up by tax-id; a 404 is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`] other than not-found.
    pub async fn get_customer(&self, tax_id: &str) -> Result<Option<Customer>, ApiError> {
        let url = self.resource_url(&[COLLECTION, tax_id]);
        match self.execute_json(Method::GET, &url, None).await {
            Ok(customer) => Ok(Some(customer)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Finds a customer by email by scanning the full list; the backend has
    /// no lookup-by-email endpoint. Comparison ignores ASCII case and
    /// surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`] from listing customers.
    pub async fn find_customer_by_email(&self, email: &str) -> Result<Option<Customer>, ApiError> {
        let wanted = email.trim();
        let customers = self.list_all_customers().await?;
        Ok(customers.into_iter().find(|c| {
            c.email
                .as_deref()
                .is_some_and(|e| e.trim().eq_ignore_ascii_case(wanted))
        }))
    }

    /// # Errors
    ///
    /// [`ApiError::Conflict`] if the tax-id already exists, or any other
    /// [`ApiError`] from the request.
    pub async fn create_customer(&self, customer: &Customer) -> Result<Customer, ApiError> {
        let url = self.resource_url(&[COLLECTION]);
        let body = Self::encode_body(COLLECTION, customer)?;
        self.execute_json(Method::POST, &url, Some(&body)).await
    }

    /// Replaces the record stored under `tax_id`.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`] from the request or decoding.
    pub async fn update_customer(
        &self,
        tax_id: &str,
        customer: &Customer,
    ) -> Result<Customer, ApiError> {
        let url = self.resource_url(&[COLLECTION, tax_id]);
        let body = Self::encode_body(COLLECTION, customer)?;
        self.execute_json(Method::PUT, &url, Some(&body)).await
    }

    /// Partially updates the record stored under `tax_id`.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`] from the request or decoding.
    pub async fn patch_customer(
        &self,
        tax_id: &str,
        changes: &serde_json::Value,
    ) -> Result<Customer, ApiError> {
        let url = self.resource_url(&[COLLECTION, tax_id]);
        self.execute_json(Method::PATCH, &url, Some(changes)).await
    }

    /// # Errors
    ///
    /// Any [`ApiError`] from the request.
    pub async fn delete_customer(&self, tax_id: &str) -> Result<(), ApiError> {
        let url = self.resource_url(&[COLLECTION, tax_id]);
        self.execute(Method::DELETE, &url, None).await?;
        Ok(())
    }
}
