//! HTTP layer for the salon admin API.
//!
//! [`request::send`] is the single authenticated entry point; the other
//! modules hold endpoint paths, response helpers and wire logging.

pub(crate) mod common;
pub mod error_helpers;
pub(crate) mod loud_wire;
pub mod request;
