//! Sales and customer statistics behind the admin dashboard.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::{Days, Months, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use tienda_api::{ApiClient, ApiError};
use tienda_core::{Customer, CustomerFlavor, Sale};

/// Window for the sales-over-time figures, counted back from today.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Period {
    Day,
    #[default]
    Week,
    Month,
}

impl Period {
    /// First day included in the window.
    #[must_use]
    pub fn start(self, today: NaiveDate) -> NaiveDate {
        match self {
            Period::Day => today,
            Period::Week => today.checked_sub_days(Days::new(7)).unwrap_or(NaiveDate::MIN),
            Period::Month => today
                .checked_sub_months(Months::new(1))
                .unwrap_or(NaiveDate::MIN),
        }
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" | "dia" | "día" => Ok(Period::Day),
            "week" | "semana" => Ok(Period::Week),
            "month" | "mes" => Ok(Period::Month),
            other => Err(format!("unknown period '{other}' (expected day, week or month)")),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Day => write!(f, "day"),
            Period::Week => write!(f, "week"),
            Period::Month => write!(f, "month"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalesSummary {
    pub count: usize,
    pub total_revenue: Decimal,
    pub revenue_today: Decimal,
    /// Mean sale total rounded to whole units; zero without sales.
    pub average_sale: Decimal,
}

impl SalesSummary {
    #[must_use]
    pub fn compute(sales: &[Sale], today: NaiveDate) -> Self {
        let total_revenue: Decimal = sales.iter().map(|s| s.total).sum();
        let revenue_today = sales
            .iter()
            .filter(|s| s.day() == Some(today))
            .map(|s| s.total)
            .sum();
        let average_sale = if sales.is_empty() {
            Decimal::ZERO
        } else {
            (total_revenue / Decimal::from(sales.len()))
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        };
        Self {
            count: sales.len(),
            total_revenue,
            revenue_today,
            average_sale,
        }
    }
}

/// Units sold and revenue for one product name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSales {
    pub name: String,
    pub units: u64,
    pub revenue: Decimal,
}

/// Sales dated within `period`; undated sales are excluded.
#[must_use]
pub fn filter_by_period(sales: &[Sale], period: Period, today: NaiveDate) -> Vec<&Sale> {
    let start = period.start(today);
    sales
        .iter()
        .filter(|s| s.day().is_some_and(|d| d >= start && d <= today))
        .collect()
}

#[must_use]
pub fn revenue_by_date<'a>(sales: impl IntoIterator<Item = &'a Sale>) -> BTreeMap<NaiveDate, Decimal> {
    let mut by_date = BTreeMap::new();
    for sale in sales {
        if let Some(day) = sale.day() {
            *by_date.entry(day).or_insert(Decimal::ZERO) += sale.total;
        }
    }
    by_date
}

/// `(registered, temporary)` customer counts.
#[must_use]
pub fn customer_mix(customers: &[Customer]) -> (usize, usize) {
    let registered = customers
        .iter()
        .filter(|c| c.flavor() == CustomerFlavor::Registered)
        .count();
    (registered, customers.len() - registered)
}

/// Per-product totals from every sale's detail lines, best sellers first.
#[must_use]
pub fn products_sold(sales: &[Sale]) -> Vec<ProductSales> {
    let mut by_name: HashMap<&str, ProductSales> = HashMap::new();
    for line in sales.iter().flat_map(|s| &s.lines) {
        let name = line.product_name();
        let entry = by_name.entry(name).or_insert_with(|| ProductSales {
            name: name.to_string(),
            units: 0,
            revenue: Decimal::ZERO,
        });
        entry.units += u64::from(line.quantity);
        entry.revenue += line.unit_price * Decimal::from(line.quantity);
    }
    let mut products: Vec<ProductSales> = by_name.into_values().collect();
    products.sort_by(|a, b| b.units.cmp(&a.units).then_with(|| a.name.cmp(&b.name)));
    products
}

/// Sales and customers fetched together for the dashboard.
#[derive(Debug, Clone, Default)]
pub struct Dashboard {
    pub sales: Vec<Sale>,
    pub customers: Vec<Customer>,
}

impl Dashboard {
    /// Fetches sales and customers concurrently.
    ///
    /// # Errors
    ///
    /// The first [`ApiError`] from either listing.
    pub async fn load(api: &ApiClient) -> Result<Self, ApiError> {
        let (sales, customers) =
            futures::future::try_join(api.list_all_sales(), api.list_all_customers()).await?;
        tracing::debug!(
            sales = sales.len(),
            customers = customers.len(),
            "dashboard data loaded"
        );
        Ok(Self { sales, customers })
    }

    #[must_use]
    pub fn summary(&self, today: NaiveDate) -> SalesSummary {
        SalesSummary::compute(&self.sales, today)
    }

    #[must_use]
    pub fn revenue_over(&self, period: Period, today: NaiveDate) -> BTreeMap<NaiveDate, Decimal> {
        revenue_by_date(filter_by_period(&self.sales, period, today))
    }

    #[must_use]
    pub fn customer_mix(&self) -> (usize, usize) {
        customer_mix(&self.customers)
    }

    #[must_use]
    pub fn top_products(&self, limit: usize) -> Vec<ProductSales> {
        let mut products = products_sold(&self.sales);
        products.truncate(limit);
        products
    }
}

#[cfg(test)]
#[path = "dashboard_test.rs"]
mod tests;
