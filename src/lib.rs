//! # ChatOps Core — priority-scheduled Kubernetes operator control plane
//!
//! Turns chat-driven, free-form commands into at-most-one-at-a-time cluster
//! mutations against a single fixed deployment, with verifiable
//! before/after state and bounded waiting across priority classes.
//!
//! ## Architecture
//!
//! The gate (`api`) handles many requests concurrently; only EXECUTE
//! commands ever touch the mutation pipeline, which is strictly serialized:
//! ```text
//!                  ┌───────────────────────────────────────┐
//!  POST /chat  →   │            API boundary (gate)         │
//!                  │  resolveIdentity → parse → classify    │
//!                  └───────────────┬─────────────────────────┘
//!                                  │ EXECUTE only
//!                                  ▼
//!                  ┌───────────────────────────┐     ┌─────────────┐
//!                  │      PriorityQueue        │ →   │   Worker    │
//!                  │ (priority asc, ts asc)    │     │  (single)   │
//!                  └───────────────────────────┘     └──────┬──────┘
//!                                                             │ mutex
//!                                                             ▼
//!                                                    ┌──────────────────┐
//!                                                    │ KubernetesAdapter │
//!                                                    │ scale/restart/    │
//!                                                    │ status (verified) │
//!                                                    └──────────────────┘
//! ```

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]

pub mod api;
pub mod bootstrap;
pub mod command;
pub mod k8s;
pub mod parser;
pub mod policy;
pub mod state;
pub mod sync;
pub mod types;
pub mod validation;
pub mod worker;

// Internal utilities
pub mod observability;

pub use types::{Config, Error, Result};
