use infrastructure::HubHandle;

#[derive(Clone)]
pub struct AppState {
    pub hub: HubHandle,
}

impl AppState {
    pub fn new(hub: HubHandle) -> Self {
        Self { hub }
    }
}
