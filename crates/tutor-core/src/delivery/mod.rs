//! Client-side message delivery.
//!
//! [`DeliveryLedger`] is the local view of a conversation: every outbound
//! message moves through `sending -> sent | failed`, and a failed message can
//! be retried as a fresh attempt. [`DeliveryClient`] drives the ledger against
//! a [`ChatTransport`], which isolates all network effects.

pub mod client;
pub mod ledger;
pub mod transport;

pub use client::{DeliveryClient, SendOutcome};
pub use ledger::{CorrelationId, DeliveryError, DeliveryLedger, DeliveryState, Entry, EntryId};
pub use transport::{ChatTransport, SESSION_ENDED_CODE, TransportError, TurnRequest};
