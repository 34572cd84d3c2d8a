// Application state for HTTP handlers
use crate::application::dashboard_service::DashboardService;
use crate::application::drag_controller::DragController;
use crate::application::explore_service::ExploreService;

#[derive(Clone)]
pub struct AppState {
    pub dashboards: DashboardService,
    pub drag: DragController,
    pub explore: ExploreService,
}
