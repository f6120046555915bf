use std::sync::Arc;

use crate::{
    api::ApiClient,
    handlers::report_error,
    models::notification::Notification,
    services::notification::Notifier,
    utils::errors::AppError,
};

/// In-app notification list of the signed-in user.
pub struct NotificationCenter {
    client: ApiClient,
    notifier: Arc<dyn Notifier>,
    pub notifications: Vec<Notification>,
}

impl NotificationCenter {
    pub fn new(client: ApiClient, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            client,
            notifier,
            notifications: Vec::new(),
        }
    }

    pub async fn refresh(&mut self) -> Result<(), AppError> {
        match self.client.list_notifications().await {
            Ok(mut notifications) => {
                notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                self.notifications = notifications;
                Ok(())
            }
            Err(err) => {
                report_error(self.notifier.as_ref(), "load_notifications", &err);
                Err(err)
            }
        }
    }

    pub fn unread_count(&self) -> usize {
        self.notifications.iter().filter(|n| !n.is_read).count()
    }

    pub fn unread(&self) -> impl Iterator<Item = &Notification> {
        self.notifications.iter().filter(|n| !n.is_read)
    }

    /// Marks one notification read on the server, then locally.
    pub async fn mark_read(&mut self, id: i64) -> Result<(), AppError> {
        if let Err(err) = self.client.mark_notification_read(id).await {
            report_error(self.notifier.as_ref(), "mark_notification_read", &err);
            return Err(err);
        }

        if let Some(notification) = self.notifications.iter_mut().find(|n| n.id == id) {
            notification.is_read = true;
        }
        Ok(())
    }

    pub async fn mark_all_read(&mut self) -> Result<usize, AppError> {
        let ids: Vec<i64> = self.unread().map(|n| n.id).collect();
        for id in &ids {
            self.mark_read(*id).await?;
        }
        Ok(ids.len())
    }
}
