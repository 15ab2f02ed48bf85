//! Application layer containing the booking use cases.
//!
//! `BookingService` is the entry point for the routing layer. It combines the
//! caller's identity, the `BookingLedger` (per-booking serialisation and the
//! state machine) and the payment providers resolved through a
//! `ProviderRegistry`. The `TokenRevocationRegistry` is consulted by whatever
//! authenticates requests before any use case runs.

pub mod ledger;
pub mod providers;
pub mod revocation;
pub mod service;
pub mod views;
