use crate::config::schema::NotificationConfig;
use notify_rust::{Notification, Timeout, Urgency};

const APP_NAME: &str = "Scrawl";

/// Desktop notification manager
pub struct NotificationManager {
    config: NotificationConfig,
}

impl NotificationManager {
    #[must_use]
    pub const fn new(config: NotificationConfig) -> Self {
        Self { config }
    }

    /// Persistent notification: stays up until dismissed
    pub fn provisioning_failed(&self, error: &str) {
        if !self.config.enable_errors {
            return;
        }

        let result = Notification::new()
            .appname(APP_NAME)
            .summary("Model download failed")
            .body(error)
            .urgency(Urgency::Critical)
            .timeout(Timeout::Never)
            .show();

        if let Err(e) = result {
            tracing::warn!("Failed to show notification: {e}");
        }
    }

    pub fn model_ready(&self, model_name: &str) {
        if !self.config.enable_status {
            return;
        }

        let result = Notification::new()
            .appname(APP_NAME)
            .summary("Ready to recognize digits")
            .body(&format!("Model '{model_name}' loaded"))
            .timeout(Timeout::Milliseconds(3000))
            .show();

        if let Err(e) = result {
            tracing::warn!("Failed to show notification: {e}");
        }
    }
}
