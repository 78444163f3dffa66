use crate::flow::LocationAcquisitionFlow;
use std::sync::Arc;

pub struct AppState {
    pub flow: Arc<LocationAcquisitionFlow>,
}
