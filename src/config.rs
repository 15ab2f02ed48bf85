//! Runtime configuration.
//!
//! Every option can be given on the command line or through the environment.
//! Provider credentials are kept as [`SecretString`] and never printed.

use crate::application::service::BookingSettings;
use crate::domain::money::Currency;
use crate::domain::payment::PaymentMethod;
use clap::{Args, ValueEnum};
use secrecy::SecretString;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum PaymentMode {
    /// Deterministic in-process provider for every payment method.
    #[default]
    Mock,
    /// Per-method provider adapters, configured with credentials.
    Live,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum PayPalMode {
    #[default]
    Sandbox,
    Live,
}

#[derive(Debug, Clone)]
pub struct StripeSettings {
    pub secret_key: Option<SecretString>,
    pub currency: Currency,
}

#[derive(Debug, Clone)]
pub struct RazorpaySettings {
    pub key_id: Option<String>,
    pub key_secret: Option<SecretString>,
    pub currency: Currency,
}

#[derive(Debug, Clone)]
pub struct PayPalSettings {
    pub client_id: Option<String>,
    pub client_secret: Option<SecretString>,
    pub mode: PayPalMode,
    pub currency: Currency,
}

#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub mode: PaymentMode,
    pub stripe: StripeSettings,
    pub razorpay: RazorpaySettings,
    pub paypal: PayPalSettings,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            mode: PaymentMode::Mock,
            stripe: StripeSettings {
                secret_key: None,
                currency: Currency::usd(),
            },
            razorpay: RazorpaySettings {
                key_id: None,
                key_secret: None,
                currency: Currency::inr(),
            },
            paypal: PayPalSettings {
                client_id: None,
                client_secret: None,
                mode: PayPalMode::Sandbox,
                currency: Currency::usd(),
            },
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub payment: PaymentConfig,
    pub booking: BookingSettings,
    pub log_filter: String,
}

/// Command-line/environment form of [`Config`].
#[derive(Debug, Clone, Args)]
pub struct ConfigArgs {
    /// Which payment providers to use.
    #[arg(long, env = "WASHBAY_PAYMENT_MODE", value_enum, default_value_t = PaymentMode::Mock)]
    pub payment_mode: PaymentMode,

    /// Payment method used when a booking does not name one.
    #[arg(long, env = "WASHBAY_DEFAULT_PAYMENT_METHOD", default_value = "stripe")]
    pub default_payment_method: PaymentMethod,

    /// Upper bound on a single payment provider call, in milliseconds.
    #[arg(long, env = "WASHBAY_PROVIDER_TIMEOUT_MS", default_value_t = 10_000)]
    pub provider_timeout_ms: u64,

    #[arg(long, env = "STRIPE_SECRET_KEY", hide_env_values = true)]
    pub stripe_secret_key: Option<String>,

    #[arg(long, env = "STRIPE_CURRENCY", default_value = "USD")]
    pub stripe_currency: Currency,

    #[arg(long, env = "RAZORPAY_KEY_ID")]
    pub razorpay_key_id: Option<String>,

    #[arg(long, env = "RAZORPAY_KEY_SECRET", hide_env_values = true)]
    pub razorpay_key_secret: Option<String>,

    #[arg(long, env = "RAZORPAY_CURRENCY", default_value = "INR")]
    pub razorpay_currency: Currency,

    #[arg(long, env = "PAYPAL_CLIENT_ID")]
    pub paypal_client_id: Option<String>,

    #[arg(long, env = "PAYPAL_CLIENT_SECRET", hide_env_values = true)]
    pub paypal_client_secret: Option<String>,

    #[arg(long, env = "PAYPAL_MODE", value_enum, default_value_t = PayPalMode::Sandbox)]
    pub paypal_mode: PayPalMode,

    #[arg(long, env = "PAYPAL_CURRENCY", default_value = "USD")]
    pub paypal_currency: Currency,

    /// Log filter, in `tracing_subscriber::EnvFilter` syntax.
    #[arg(long, env = "WASHBAY_LOG", default_value = "warn")]
    pub log: String,
}

impl From<ConfigArgs> for Config {
    fn from(args: ConfigArgs) -> Self {
        Self {
            payment: PaymentConfig {
                mode: args.payment_mode,
                stripe: StripeSettings {
                    secret_key: args.stripe_secret_key.map(SecretString::new),
                    currency: args.stripe_currency,
                },
                razorpay: RazorpaySettings {
                    key_id: args.razorpay_key_id,
                    key_secret: args.razorpay_key_secret.map(SecretString::new),
                    currency: args.razorpay_currency,
                },
                paypal: PayPalSettings {
                    client_id: args.paypal_client_id,
                    client_secret: args.paypal_client_secret.map(SecretString::new),
                    mode: args.paypal_mode,
                    currency: args.paypal_currency,
                },
            },
            booking: BookingSettings {
                provider_timeout: Duration::from_millis(args.provider_timeout_ms),
                default_method: args.default_payment_method,
            },
            log_filter: args.log,
        }
    }
}
