pub mod engine;
pub mod manager;

pub use engine::{ConfigureOptions, EvaluationHandle, EvaluationOutcome, RoutingEngine, RoutingPhase};
pub use manager::{PriorityOrder, RoutingPolicy};
