use crate::{api::ApiClient, models::notification::Notification, utils::errors::AppError};

impl ApiClient {
    pub async fn list_notifications(&self) -> Result<Vec<Notification>, AppError> {
        self.get_list("notifications/").await
    }

    pub async fn mark_notification_read(&self, id: i64) -> Result<(), AppError> {
        self.post_action(&format!("notifications/{}/read/", id), &serde_json::json!({}))
            .await
    }
}
