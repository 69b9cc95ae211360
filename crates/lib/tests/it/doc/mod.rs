//! Document integration tests
//!
//! Covers replication of transactions between replicas, convergence of
//! concurrent edits, the change events remote updates produce, and update
//! encoding.

mod replication;
