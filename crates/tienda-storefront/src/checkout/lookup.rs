use tienda_core::{Customer, CustomerFlavor};

/// What the backend knows about the shopper entering checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomerLookup {
    /// Brand-new shopper; a temporary record is created at submission.
    NotFound,
    /// Bought before without registering; registration is offered.
    Temporary(Customer),
    /// Complete record; identity fields are auto-filled.
    Registered(Customer),
}

impl CustomerLookup {
    #[must_use]
    pub fn classify(found: Option<Customer>) -> Self {
        match found {
            None => CustomerLookup::NotFound,
            Some(c) => match c.flavor() {
                CustomerFlavor::Temporary => CustomerLookup::Temporary(c),
                CustomerFlavor::Registered => CustomerLookup::Registered(c),
            },
        }
    }

    #[must_use]
    pub fn customer(&self) -> Option<&Customer> {
        match self {
            CustomerLookup::NotFound => None,
            CustomerLookup::Temporary(c) | CustomerLookup::Registered(c) => Some(c),
        }
    }

    #[must_use]
    pub fn is_found(&self) -> bool {
        !matches!(self, CustomerLookup::NotFound)
    }
}

/// Identity fields copied from a registered record into the checkout form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Autofill {
    pub tax_id: String,
    pub first_name: String,
    pub last_name: String,
    pub locality: String,
}

impl From<&Customer> for Autofill {
    fn from(c: &Customer) -> Self {
        Self {
            tax_id: c.tax_id.clone(),
            first_name: c.first_name.clone(),
            last_name: c.last_name.clone(),
            locality: c.locality.clone(),
        }
    }
}
