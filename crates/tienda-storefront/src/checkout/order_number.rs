use chrono::{Local, NaiveDate};

/// Client-generated order number: `YYYYMMDD-NNNN`, the local date plus a
/// random four-digit suffix.
///
/// Two checkouts on the same day collide with probability 1/9000; the
/// backend rejects the duplicate and the shopper resubmits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderNumber(String);

impl OrderNumber {
    #[must_use]
    pub fn generate() -> Self {
        Self::from_parts(Local::now().date_naive(), rand::random_range(1000..=9999))
    }

    #[must_use]
    pub fn from_parts(date: NaiveDate, suffix: u16) -> Self {
        Self(format!("{}-{suffix:04}", date.format("%Y%m%d")))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The date encoded in the prefix.
    #[must_use]
    pub fn date(&self) -> Option<NaiveDate> {
        let prefix = self.0.get(..8)?;
        NaiveDate::parse_from_str(prefix, "%Y%m%d").ok()
    }
}

impl std::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<OrderNumber> for String {
    fn from(number: OrderNumber) -> Self {
        number.0
    }
}
