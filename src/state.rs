use std::sync::Arc;

use crate::{
    attendance::engine::AttendanceEngine,
    clock::Clock,
    config::Config,
    store::{AttendanceStore, UserStore},
    utils::username_index::UsernameIndex,
};

/// Everything handlers share, registered once as `web::Data<AppState>`.
pub struct AppState {
    pub config: Config,
    pub users: Arc<dyn UserStore>,
    pub attendance: AttendanceEngine,
    pub usernames: UsernameIndex,
}

impl AppState {
    pub fn new(
        config: Config,
        users: Arc<dyn UserStore>,
        entries: Arc<dyn AttendanceStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let attendance = AttendanceEngine::new(entries, users.clone(), clock, config.attendance);

        Self {
            config,
            users,
            attendance,
            usernames: UsernameIndex::new(),
        }
    }
}
