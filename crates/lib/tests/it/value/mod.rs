//! Value model integration tests
//!
//! Persistent containers as an application uses them: building state,
//! deriving new versions and converting to and from JSON.

mod containers;
