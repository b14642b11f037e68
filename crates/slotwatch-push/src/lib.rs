//! Push dispatch for slotwatch.
//!
//! One multicast request notifies every device watching a service in a
//! single provider call; the provider answers with one result per token, in
//! order, which this crate classifies into [`DeliveryOutcome`]s for the
//! reconciler.
//!
//! [`DeliveryOutcome`]: slotwatch_core::DeliveryOutcome

pub mod dispatcher;
pub mod error;
pub mod gateway;
pub mod message;

pub use dispatcher::NotificationDispatcher;
pub use error::PushError;
pub use gateway::{FcmGateway, PushGateway};
pub use message::{MulticastMessage, PushLinks};
