//! Renders the routing configuration into the artifact the NGINX sidecar
//! consumes and keeps referenced certificates materialized on disk.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod config;
mod emitter;

pub use self::{
    config::{generate, HttpConfig, Location, Server, Ssl},
    emitter::{CommandReload, Emitter, Reload, SecretFile},
};
