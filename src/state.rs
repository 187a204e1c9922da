use std::sync::Arc;
use dispatch_gateway::{LoginRedirect, Scheduler, SessionStore};
// app's shared state

#[derive(Clone)]
pub struct AppState {
    pub scheduler: Scheduler,
    pub session: Arc<SessionStore>,
    pub redirect: Arc<LoginRedirect>,
    pub login_route: String, // where the dashboard goes when a session ends
}
