//! ReskFlow API Gateway Security Core
//!
//! The resilience and security layer in front of the ReskFlow delivery
//! platform's backend services.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────┐
//!                    │                 API GATEWAY                   │
//!                    │                                               │
//!   Client Request   │  ┌──────────┐  ┌──────┐  ┌────────────┐      │
//!   ─────────────────┼─▶│ ip_block │─▶│ auth │─▶│ rate_limit │──┐   │
//!                    │  └──────────┘  └──────┘  └────────────┘  │   │
//!                    │                                          ▼   │
//!                    │                  ┌─────────┐   ┌───────────┐ │
//!                    │                  │ circuit │◀──│ balancer  │ │
//!                    │                  │ breaker │   │(round-rob)│ │
//!                    │                  └────┬────┘   └───────────┘ │
//!                    │                       ▼                      │
//!   Client Response  │                 ┌───────────┐                │
//!   ◀────────────────┼─────────────────│   proxy   │◀───────────────┼── Backend
//!                    │                 └───────────┘                │   Services
//!                    │                                               │
//!                    │  ┌────────────────────────────────────────┐  │
//!                    │  │          Cross-Cutting Concerns         │  │
//!                    │  │  config · store (Redis) · threat scorer │  │
//!                    │  │  crypto envelope · observability        │  │
//!                    │  └────────────────────────────────────────┘  │
//!                    └──────────────────────────────────────────────┘
//! ```

// Core subsystems
pub mod config;
pub mod crypto;
pub mod error;
pub mod server;
pub mod store;

// Traffic management
pub mod ratelimit;
pub mod upstream;

// Cross-cutting concerns
pub mod auth;
pub mod observability;
pub mod threat;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use server::{GatewayServer, GatewayState};
