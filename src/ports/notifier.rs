use crate::types::NotificationIntent;

pub trait Notifier: Send + Sync + 'static {
    /// Displays a notification, replacing any shown with the same tag.
    fn show(&self, intent: NotificationIntent) -> impl Future<Output = ()> + Send;

    fn close(&self, tag: &str) -> impl Future<Output = Option<NotificationIntent>> + Send;

    fn displayed(&self) -> impl Future<Output = Vec<NotificationIntent>> + Send;
}
