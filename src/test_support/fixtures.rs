use std::sync::Arc;

use super::doubles::{FakeContainer, FakePermissions, RecordingNotifications, StubTransport};
use crate::messaging::config::PushConfiguration;
use crate::messaging::foreground::{ForegroundMessagingClient, PageServices};
use crate::messaging::types::PermissionState;

/// Configuration with every identity field and a VAPID key set.
pub fn complete_config() -> PushConfiguration {
    PushConfiguration {
        api_key: Some("k".into()),
        auth_domain: Some("site.example".into()),
        project_id: Some("p".into()),
        messaging_sender_id: Some("s".into()),
        app_id: Some("a".into()),
        vapid_key: Some("vapid".into()),
    }
}

/// In-memory page environment. Fields stay reachable so tests can steer the
/// doubles after the client was built.
pub struct PageFixture {
    pub transport: Arc<StubTransport>,
    pub container: Arc<FakeContainer>,
    pub permissions: Arc<FakePermissions>,
    pub notifications: Arc<RecordingNotifications>,
}

impl PageFixture {
    pub fn new(permission: PermissionState) -> Self {
        Self {
            transport: Arc::new(StubTransport::default()),
            container: Arc::new(FakeContainer::default()),
            permissions: Arc::new(FakePermissions::new(permission)),
            notifications: Arc::new(RecordingNotifications::default()),
        }
    }

    pub fn services(&self) -> PageServices {
        PageServices {
            transport: self.transport.clone(),
            container: self.container.clone(),
            permissions: self.permissions.clone(),
            notifications: self.notifications.clone(),
        }
    }

    pub fn client(&self, config: PushConfiguration) -> ForegroundMessagingClient {
        ForegroundMessagingClient::new(config, self.services())
    }
}
