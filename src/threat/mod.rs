//! Threat detection: event logging, per-IP scoring, IP blocking, and
//! request payload scanning.

pub mod events;
pub mod input_validation;
pub mod middleware;
pub mod scorer;

pub use events::{SecurityEvent, SecurityEventType, SecuritySignal};
pub use input_validation::InputValidator;
pub use middleware::ip_block_middleware;
pub use scorer::ThreatScorer;
