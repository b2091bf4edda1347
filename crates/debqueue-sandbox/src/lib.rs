//! Sandbox lifecycle for package inspection.
//!
//! A run prepares one snapshot image and one idle container derived from
//! it; every inspection command is exec'd into that container. The
//! [`Sandbox`](sandbox::Sandbox) value owns both and releases them on drop.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod backend;
pub mod exec;
pub mod plan;
pub mod sandbox;

pub use backend::{ContainerSpec, SandboxBackend};
pub use exec::ExecOutput;
pub use plan::SandboxPlan;
pub use sandbox::Sandbox;
