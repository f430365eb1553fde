//! Static lookup tables between OS codes and stable tokens.

pub mod port;
pub mod reason;

pub use port::{Port, ResolvedPort, UNKNOWN_TOKEN, translate};
pub use reason::{InterruptionType, RouteChangeReason};
