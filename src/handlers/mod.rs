pub mod applications;
pub mod interviews;
pub mod notifications;

use serde_json::Value;
use std::collections::HashMap;

use crate::{
    services::notification::{Notifier, Toast},
    utils::{errors::AppError, logger::LOGGER},
};

/// Logs a failed user action and shows it as a destructive toast.
pub(crate) fn report_error(notifier: &dyn Notifier, action: &str, err: &AppError) {
    let mut context = HashMap::new();
    context.insert("action".to_string(), Value::from(action));
    context.insert("category".to_string(), Value::from(format!("{:?}", err.category())));
    LOGGER.log_error(&err.to_string(), context);

    notifier.notify(Toast::error("Erreur", err.user_message()));
}
