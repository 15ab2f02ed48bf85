//! Payment provider adapters.

pub mod mock;
pub mod paypal;
pub mod razorpay;
pub mod stripe;

use crate::application::providers::ProviderRegistry;
use crate::config::{PaymentConfig, PaymentMode};
use crate::domain::payment::PaymentMethod;
use crate::domain::ports::PaymentProviderRef;
use mock::MockProvider;
use paypal::PayPalLikeProvider;
use razorpay::RazorpayLikeProvider;
use std::sync::Arc;
use stripe::StripeLikeProvider;

/// Builds the method -> provider map for `config.mode`.
///
/// In mock mode each method gets a mock settling in that method's configured
/// currency.
pub fn build_registry(config: &PaymentConfig) -> ProviderRegistry {
    let (stripe, razorpay, paypal): (PaymentProviderRef, PaymentProviderRef, PaymentProviderRef) =
        match config.mode {
            PaymentMode::Mock => (
                Arc::new(MockProvider::new(config.stripe.currency.clone())),
                Arc::new(MockProvider::new(config.razorpay.currency.clone())),
                Arc::new(MockProvider::new(config.paypal.currency.clone())),
            ),
            PaymentMode::Live => (
                Arc::new(StripeLikeProvider::new(&config.stripe)),
                Arc::new(RazorpayLikeProvider::new(&config.razorpay)),
                Arc::new(PayPalLikeProvider::new(&config.paypal)),
            ),
        };

    ProviderRegistry::new()
        .with(PaymentMethod::Stripe, stripe)
        .with(PaymentMethod::Razorpay, razorpay)
        .with(PaymentMethod::PayPal, paypal)
}
