use httpmock::MockServer;

/// Start a fresh `httpmock::MockServer` for a backend test.
pub fn start_mock_server() -> MockServer {
    MockServer::start()
}
