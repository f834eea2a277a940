//! Ingestion sources of the lumen collector.
//!
//! - [`UdsReceiver`] (`uds`): newline-delimited JSON events over a Unix
//!   domain socket

pub mod uds;

pub use uds::{UDS_RECEIVER, UdsReceiver, UdsReceiverConfig};
