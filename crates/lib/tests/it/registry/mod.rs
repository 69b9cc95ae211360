//! Registry integration tests
//!
//! Application-defined resolvers plugged into a full sync round.

mod custom_resolvers;
