//! Test utilities shared across crate-level unit tests.

pub mod doubles;
pub mod fixtures;
#[cfg(not(target_arch = "wasm32"))]
pub mod http;

pub use doubles::{
    FakeContainer, FakePermissions, RecordingClients, RecordingNotifications, RecordingRegistry,
    StubClick, StubTransport,
};
pub use fixtures::{complete_config, PageFixture};
#[cfg(not(target_arch = "wasm32"))]
pub use http::start_mock_server;
