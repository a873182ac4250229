//! Mapping from the three filter inputs to the request sent to the server.

use crate::models::MediaCategory;
use std::collections::BTreeSet;

/// The tag-conditional query body. Tags are kept sorted so two conditions
/// built from the same selection compare equal regardless of selection
/// order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Condition {
    /// Empty string means no type restriction.
    pub file_type: String,
    pub tags: BTreeSet<String>,
}

/// Canonical shape of a remote listing request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RemoteRequest {
    /// `GET /files`
    ListAll,
    /// `GET /files/{type}`
    ListByType { file_type: String },
    /// `POST /query`
    Conditional(Condition),
}

impl RemoteRequest {
    pub fn describe(&self) -> String {
        match self {
            RemoteRequest::ListAll => "GET /files".to_string(),
            RemoteRequest::ListByType { file_type } => format!("GET /files/{}", file_type),
            RemoteRequest::Conditional(condition) => format!(
                "POST /query ty={:?} tags={:?}",
                condition.file_type, condition.tags
            ),
        }
    }
}

/// Snapshot of every filter input at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Query {
    pub file_type: Option<String>,
    pub tags: BTreeSet<String>,
    pub search_term: Option<String>,
}

impl Query {
    pub fn new(
        file_type: Option<&str>,
        tags: &BTreeSet<String>,
        search_term: Option<&str>,
    ) -> Self {
        Self {
            file_type: normalize(file_type).map(str::to_string),
            tags: tags.clone(),
            search_term: normalize(search_term).map(str::to_string),
        }
    }

    /// One snapshot per server-side type filter of `category`, in request
    /// order. Categories the server cannot filter on get a single
    /// unrestricted snapshot.
    pub fn for_category(
        category: MediaCategory,
        tags: &BTreeSet<String>,
        search_term: Option<&str>,
    ) -> Vec<Self> {
        match category.type_filters() {
            Some(types) => types
                .iter()
                .map(|ty| Self::new(Some(ty), tags, search_term))
                .collect(),
            None => vec![Self::new(None, tags, search_term)],
        }
    }

    pub fn request(&self) -> RemoteRequest {
        compose(
            self.file_type.as_deref(),
            &self.tags,
            self.search_term.as_deref(),
        )
    }
}

fn normalize(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Builds the request for one type filter.
///
/// With no tags selected this is a plain listing, optionally restricted to
/// `type_filter`. With at least one tag it is always the conditional query,
/// carrying an empty type string when no type filter is set. The search term
/// never reaches the server; it is accepted so callers can pass the full
/// filter tuple and is applied afterwards by [`apply_search`].
///
/// [`apply_search`]: crate::core::search::apply_search
pub fn compose(
    type_filter: Option<&str>,
    tags: &BTreeSet<String>,
    _search_term: Option<&str>,
) -> RemoteRequest {
    let type_filter = normalize(type_filter);

    if tags.is_empty() {
        match type_filter {
            Some(ty) => RemoteRequest::ListByType {
                file_type: ty.to_string(),
            },
            None => RemoteRequest::ListAll,
        }
    } else {
        RemoteRequest::Conditional(Condition {
            file_type: type_filter.unwrap_or_default().to_string(),
            tags: tags.clone(),
        })
    }
}

/// Requests needed to list one category, in the order their results are
/// concatenated.
pub fn compose_category(
    category: MediaCategory,
    tags: &BTreeSet<String>,
    search_term: Option<&str>,
) -> Vec<RemoteRequest> {
    Query::for_category(category, tags, search_term)
        .iter()
        .map(Query::request)
        .collect()
}
