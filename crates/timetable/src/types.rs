use crate::positions::WeekPositions;
use crate::service::ScheduleService;
use crate::users::UserStore;

/// Shared state handed to every HTTP handler.
pub struct TimetableState {
    pub service: ScheduleService,
    /// Registered users, their saved groups and request log
    pub users: UserStore,
    /// Week each user is currently viewing
    pub positions: WeekPositions,
}

impl TimetableState {
    pub fn new(service: ScheduleService, users: UserStore) -> Self {
        Self {
            service,
            users,
            positions: WeekPositions::new(),
        }
    }
}
