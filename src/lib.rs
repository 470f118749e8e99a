#![doc = include_str!("../README.md")]

mod cause;
pub use cause::*;

mod collector;
pub use collector::*;

mod accumulated;
pub use accumulated::*;

mod traced;
pub use traced::*;

mod signal;
pub use signal::*;

mod error;
pub use error::*;

mod config;
pub use config::*;

mod gatherer;
pub use gatherer::*;
