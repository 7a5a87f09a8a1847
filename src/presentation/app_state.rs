// Application state for HTTP handlers
use crate::application::chart_data_service::ChartDataService;

pub struct AppState {
    pub chart_service: ChartDataService,
}
