use service::RosterStore;

#[derive(Clone)]
pub struct AppState {
    pub roster: RosterStore,
}

impl AppState {
    pub fn new(roster: RosterStore) -> Self {
        Self { roster }
    }
}
