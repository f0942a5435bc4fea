//! Mock host collaborators for testing and development.
//!
//! This module provides simulated implementations of every trait in
//! [`traits`](crate::traits) that can be controlled programmatically without
//! a real host environment.

pub mod host;
pub mod source;
pub mod tag;

// Re-export commonly used types
pub use host::{
    MockControllers, MockControllersHandle, MockEmulation, MockEmulationHandle, MockForward,
    MockForwardHandle, MockRegistry,
};
pub use source::{MockTagSource, MockTagSourceHandle};
pub use tag::MockVirtualTag;
