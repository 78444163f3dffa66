//! Location acquisition flow and its observable state.

pub mod acquisition;
pub mod state;

pub use acquisition::LocationAcquisitionFlow;
pub use state::{compose_display, AcquisitionError, AcquisitionState, ErrorKind, Phase};
