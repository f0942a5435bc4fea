//! Host collaborator layer for the virtual tag reader emulator.
//!
//! The emulated reader never touches real hardware. Everything it observes
//! comes from collaborators in the host environment, which this crate
//! describes as traits:
//!
//! - [`StatusSource`]: presence status of the virtual tag and the tag itself
//! - [`VirtualTag`]: payload data of one tag
//! - [`ApplicationRegistry`]: process-wide set of intercepted applications
//! - [`ControllerProbe`]: which controllers are attached
//! - [`ForwardConnection`]: the connection to the original service
//! - [`EmulationProbe`]: whether new sessions are emulated at all
//!
//! # Example
//!
//! ```
//! use vtag_hardware::mock::{MockTagSource, MockVirtualTag};
//! use vtag_hardware::traits::StatusSource;
//!
//! let (source, handle) = MockTagSource::new();
//! handle.present(MockVirtualTag::new("Mario", vec![0x04, 0x01, 0x02, 0x03]));
//!
//! let tag = source.active_tag().unwrap().unwrap();
//! assert!(tag.is_valid());
//! ```
//!
//! # Error Handling
//!
//! Fallible operations return [`Result<T>`][error::Result] with a
//! [`HardwareError`]. The emulator never propagates these to clients: a
//! failed sample is skipped and a failed payload becomes "device not found".
//!
//! # Mock Implementations
//!
//! The [`mock`] module provides controllable implementations of every trait.
//! Most come as a `(collaborator, handle)` pair, where the handle drives the
//! collaborator from a test or a demo.
//!
//! [`StatusSource`]: traits::StatusSource
//! [`VirtualTag`]: traits::VirtualTag
//! [`ApplicationRegistry`]: traits::ApplicationRegistry
//! [`ControllerProbe`]: traits::ControllerProbe
//! [`ForwardConnection`]: traits::ForwardConnection
//! [`EmulationProbe`]: traits::EmulationProbe

pub mod error;
pub mod mock;
pub mod traits;

// Re-export commonly used types for convenience
pub use error::{HardwareError, Result};
pub use traits::{
    ApplicationRegistry, ControllerProbe, EmulationProbe, ForwardConnection, StatusSource,
    VirtualTag,
};
