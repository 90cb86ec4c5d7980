use std::sync::{Arc, Mutex};

use crate::database::NodeStore;
use crate::settings::Settings;
use crate::simulator::DroneSimulator;

// Application state shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: NodeStore,
    pub drone: Arc<Mutex<DroneSimulator>>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(store: NodeStore, drone: DroneSimulator, settings: Settings) -> Self {
        Self {
            store,
            drone: Arc::new(Mutex::new(drone)),
            settings: Arc::new(settings),
        }
    }
}
