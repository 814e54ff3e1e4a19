//! Applies status intents to the cluster.
//!
//! Each resource is updated independently with a read-modify-write of its
//! status subresource; one failed update is logged and never blocks the
//! rest. The reporter checks the shutdown signal between resources, so a
//! cancelled pass still finishes the write it started.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod conditions;
mod reporter;

pub use self::reporter::Reporter;
