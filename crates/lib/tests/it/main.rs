/*! Integration tests for Treebind.
 *
 * This test suite is organized as a single integration test binary
 * following the pattern described by matklad in
 * https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html
 *
 * The module structure mirrors the main library structure:
 * - value: Tests for the persistent containers and instance identity
 * - doc: Tests for the document tree, transactions and replication updates
 * - registry: Tests for resolver lookup and custom resolvers
 * - sync: End-to-end tests of two peers bound to replicated documents
 */

use tracing_subscriber::EnvFilter;

#[ctor::ctor]
fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("treebind=info".parse().unwrap()),
        )
        .with_test_writer()
        .try_init();
}

mod doc;
mod helpers;
mod registry;
mod value;
