//! Sale endpoints (`venta/`) and their detail lines (`detalleVenta/`).

use reqwest::Method;
use serde::Serialize;
use tienda_core::{NewSale, NewSaleLine, Page, Sale, SaleDetail};

use crate::client::{ApiClient, ALL_PAGE_SIZE};
use crate::error::ApiError;

const SALES: &str = "venta";
const DETAILS: &str = "detalleVenta";

#[derive(Serialize)]
struct NewSaleDetail<'a> {
    venta: &'a str,
    #[serde(flatten)]
    line: &'a NewSaleLine,
}

impl ApiClient {
    /// # Errors
    ///
    /// Any [`ApiError`] from the request or decoding.
    pub async fn list_sales(&self, page: u32) -> Result<Page<Sale>, ApiError> {
        let page = page.to_string();
        let url = self.resource_url_with_query(&[SALES], &[("page", &page)]);
        self.execute_json(Method::GET, &url, None).await
    }

    /// # Errors
    ///
    /// Any [`ApiError`] from the request or decoding.
    pub async fn list_all_sales(&self) -> Result<Vec<Sale>, ApiError> {
        let url = self.resource_url_with_query(&[SALES], &[("page_size", ALL_PAGE_SIZE)]);
        let page: Page<Sale> = self.execute_json(Method::GET, &url, None).await?;
        Ok(page.results)
    }

    /// # Errors
    ///
    /// [`ApiError::NotFound`] for an unknown number, or any other
    /// [`ApiError`] from the request.
    pub async fn get_sale(&self, number: &str) -> Result<Sale, ApiError> {
        let url = self.resource_url(&[SALES, number]);
        self.execute_json(Method::GET, &url, None).await
    }

    /// Submits a sale. The returned record carries the server's recomputed
    /// total when line items were sent.
    ///
    /// # Errors
    ///
    /// [`ApiError::Rejected`] with the server's field messages, or any other
    /// [`ApiError`] from the request.
    pub async fn create_sale(&self, sale: &NewSale) -> Result<Sale, ApiError> {
        let url = self.resource_url(&[SALES]);
        let body = Self::encode_body(SALES, sale)?;
        self.execute_json(Method::POST, &url, Some(&body)).await
    }

    /// # Errors
    ///
    /// Any [`ApiError`] from the request.
    pub async fn delete_sale(&self, number: &str) -> Result<(), ApiError> {
        let url = self.resource_url(&[SALES, number]);
        self.execute(Method::DELETE, &url, None).await?;
        Ok(())
    }

    /// Lists the detail lines belonging to one sale.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`] from the request or decoding.
    pub async fn list_sale_details(&self, number: &str) -> Result<Vec<SaleDetail>, ApiError> {
        let url = self.resource_url_with_query(
            &[DETAILS],
            &[("venta", number), ("page_size", ALL_PAGE_SIZE)],
        );
        let page: Page<SaleDetail> = self.execute_json(Method::GET, &url, None).await?;
        Ok(page.results)
    }

    /// # Errors
    ///
    /// Any [`ApiError`] from the request or decoding.
    pub async fn create_sale_detail(
        &self,
        sale_number: &str,
        line: &NewSaleLine,
    ) -> Result<SaleDetail, ApiError> {
        let url = self.resource_url(&[DETAILS]);
        let body = Self::encode_body(
            DETAILS,
            &NewSaleDetail {
                venta: sale_number,
                line,
            },
        )?;
        self.execute_json(Method::POST, &url, Some(&body)).await
    }
}
