pub mod controller;
pub mod router;
pub mod session;

pub use controller::{OverrideController, OverrideOutcome, OverrideRequest};
pub use router::AudioSessionRouter;
pub use session::{CategoryOptions, OverrideType, PortOverride, SessionCategory};
