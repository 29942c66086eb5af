use std::sync::Arc;

use crate::config::Config;
use crate::events::SiteEvents;
use crate::provisioner::Provisioner;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub config: Config,
    pub provisioner: Arc<Provisioner>,
    pub events: SiteEvents,
}
