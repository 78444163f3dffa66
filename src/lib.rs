//! autolocate: detect the device location and render it as "City, Region".
//!
//! The [`flow::LocationAcquisitionFlow`] asks for permission, fetches the
//! current position, reverse-geocodes it, and publishes an observable
//! [`flow::AcquisitionState`]. Providers for each step live in [`location`].

pub mod flow;
pub mod location;
pub mod server;
