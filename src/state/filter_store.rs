use crate::core::viewmodels::{Property, PropertySubscriber};
use std::collections::BTreeSet;
use tokio::sync::watch;
use tracing::debug;

/// The user's current tag selection and search text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterSelection {
    pub tags: BTreeSet<String>,
    pub search: Option<String>,
}

impl FilterSelection {
    /// Search text with the empty string folded into `None`.
    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().filter(|s| !s.is_empty())
    }
}

/// Shared filter state. Cloning yields another handle to the same store, so
/// it can be handed to every view that reads or edits the selection.
///
/// Subscribers are notified only when the selection actually changes;
/// selecting an already selected tag is silent.
#[derive(Debug, Clone)]
pub struct FilterStore {
    selection: Property<FilterSelection>,
}

impl Default for FilterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterStore {
    pub fn new() -> Self {
        Self {
            selection: Property::new(FilterSelection::default(), "filter_selection"),
        }
    }

    pub fn snapshot(&self) -> FilterSelection {
        self.selection.get()
    }

    pub fn selected_tags(&self) -> BTreeSet<String> {
        self.selection.with(|s| s.tags.clone())
    }

    pub fn is_selected(&self, tag: &str) -> bool {
        self.selection.with(|s| s.tags.contains(tag))
    }

    pub fn search(&self) -> Option<String> {
        self.selection.with(|s| s.search.clone())
    }

    pub fn select_tag(&self, tag: impl Into<String>) -> bool {
        let tag = tag.into();
        debug!("Selecting tag {:?}", tag);
        self.selection.update_if(|s| s.tags.insert(tag))
    }

    pub fn unselect_tag(&self, tag: &str) -> bool {
        debug!("Unselecting tag {:?}", tag);
        self.selection.update_if(|s| s.tags.remove(tag))
    }

    /// Switch-style toggle as offered by the tag selector.
    pub fn set_tag_selected(&self, tag: &str, selected: bool) -> bool {
        if selected {
            self.select_tag(tag)
        } else {
            self.unselect_tag(tag)
        }
    }

    pub fn clear_tags(&self) -> bool {
        self.selection.update_if(|s| {
            if s.tags.is_empty() {
                return false;
            }
            s.tags.clear();
            true
        })
    }

    pub fn set_search(&self, text: impl Into<String>) -> bool {
        let text = text.into();
        self.selection.update_if(|s| {
            if s.search.as_deref() == Some(text.as_str()) {
                return false;
            }
            s.search = Some(text);
            true
        })
    }

    pub fn clear_search(&self) -> bool {
        self.selection.update_if(|s| s.search.take().is_some())
    }

    pub fn subscribe(&self) -> PropertySubscriber {
        self.selection.subscribe()
    }

    pub fn watch(&self) -> watch::Receiver<FilterSelection> {
        self.selection.watch()
    }
}
