#![allow(dead_code)]

mod helpers;
mod host;
mod server;

pub use helpers::*;
pub use host::*;
pub use server::*;
