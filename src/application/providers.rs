use crate::domain::payment::PaymentMethod;
use crate::domain::ports::PaymentProviderRef;
use crate::error::{BookingError, Result};
use std::collections::HashMap;

/// Payment providers keyed by the method a booking was created with.
///
/// Which concrete provider answers for a method is decided when the registry
/// is built from configuration; the booking flow only ever looks methods up.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<PaymentMethod, PaymentProviderRef>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, method: PaymentMethod, provider: PaymentProviderRef) -> Self {
        self.register(method, provider);
        self
    }

    pub fn register(&mut self, method: PaymentMethod, provider: PaymentProviderRef) {
        self.providers.insert(method, provider);
    }

    pub fn get(&self, method: PaymentMethod) -> Result<PaymentProviderRef> {
        self.providers.get(&method).cloned().ok_or_else(|| {
            BookingError::ValidationFailed(format!(
                "payment method '{}' is not available",
                method
            ))
        })
    }

    pub fn methods(&self) -> Vec<PaymentMethod> {
        PaymentMethod::ALL
            .into_iter()
            .filter(|m| self.providers.contains_key(m))
            .collect()
    }
}
