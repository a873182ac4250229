pub mod browser_view_model;
pub mod property;

pub use browser_view_model::{BrowseScope, BrowserViewModel};
pub use property::{Property, PropertySubscriber};

#[async_trait::async_trait]
pub trait ViewModel: Send + Sync {
    async fn initialize(&self);

    fn subscribe_to_property(&self, property_name: &str) -> Option<PropertySubscriber>;

    async fn refresh(&self);

    fn dispose(&self);
}
