//! Domain layer: catalog and booking entities, the booking state machine and
//! the ports the application layer depends on.

pub mod booking;
pub mod catalog;
pub mod identity;
pub mod money;
pub mod payment;
pub mod ports;
