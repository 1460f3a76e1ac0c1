//! Shared application state for the HTTP layer

use std::sync::Arc;

use drivewatch_sync::bootstrap::Bootstrap;
use drivewatch_sync::queue::NotificationQueue;
use drivewatch_sync::subscription::SubscriptionManager;

/// State handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub bootstrap: Arc<Bootstrap>,
    pub subscriptions: Arc<SubscriptionManager>,
    pub queue: NotificationQueue,
}

impl AppState {
    pub fn new(
        bootstrap: Arc<Bootstrap>,
        subscriptions: Arc<SubscriptionManager>,
        queue: NotificationQueue,
    ) -> Self {
        Self {
            bootstrap,
            subscriptions,
            queue,
        }
    }
}
