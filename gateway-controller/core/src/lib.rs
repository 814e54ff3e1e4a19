#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

//! Domain model shared by the graph/configuration builders, the status
//! reporter, and the data-plane emitter: the projected routing configuration,
//! the wire contract of the request dispatcher, status intents, and the
//! backend resolution seam.

pub mod configuration;
pub mod dispatch;
pub mod resolve;
pub mod status;

mod resource_id;

pub use self::resource_id::ResourceId;
