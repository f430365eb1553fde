pub mod audio;
pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod priority;
pub mod scenario;
pub mod system;

pub use audio::AudioSessionRouter;
pub use config::Config;
pub use error::SessionError;
