use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastVariant {
    Default,
    Destructive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub title: String,
    pub description: String,
    pub variant: ToastVariant,
}

impl Toast {
    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: ToastVariant::Default,
        }
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: ToastVariant::Destructive,
        }
    }

    pub fn is_destructive(&self) -> bool {
        self.variant == ToastVariant::Destructive
    }
}

/// Where user-facing feedback goes.
pub trait Notifier: Send + Sync {
    fn notify(&self, toast: Toast);
}

/// Forwards toasts to the log.
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, toast: Toast) {
        match toast.variant {
            ToastVariant::Default => tracing::info!("{}: {}", toast.title, toast.description),
            ToastVariant::Destructive => tracing::warn!("{}: {}", toast.title, toast.description),
        }
    }
}

/// Keeps every toast in memory, newest last.
#[derive(Debug, Default)]
pub struct ToastLog {
    toasts: Mutex<Vec<Toast>>,
}

impl ToastLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toasts(&self) -> Vec<Toast> {
        self.toasts
            .lock()
            .map(|toasts| toasts.clone())
            .unwrap_or_default()
    }

    pub fn last(&self) -> Option<Toast> {
        self.toasts
            .lock()
            .ok()
            .and_then(|toasts| toasts.last().cloned())
    }

    pub fn drain(&self) -> Vec<Toast> {
        self.toasts
            .lock()
            .map(|mut toasts| std::mem::take(&mut *toasts))
            .unwrap_or_default()
    }
}

impl Notifier for ToastLog {
    fn notify(&self, toast: Toast) {
        tracing::debug!(title = %toast.title, destructive = toast.is_destructive(), "toast");
        if let Ok(mut toasts) = self.toasts.lock() {
            toasts.push(toast);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toast_log_keeps_order_and_drains() {
        let log = ToastLog::new();
        log.notify(Toast::success("Envoyé", "Candidature envoyée"));
        log.notify(Toast::error("Erreur", "Erreur réseau"));

        assert!(log.last().unwrap().is_destructive());
        assert_eq!(log.toasts().len(), 2);
        assert_eq!(log.drain().len(), 2);
        assert!(log.toasts().is_empty());
    }
}
