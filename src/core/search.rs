//! Local narrowing of an already fetched listing by free text.

use crate::backends::file_server::ApiError;
use crate::models::FileMetadata;

/// Outcome of one fetch cycle as seen by a view.
#[derive(Debug, Clone, Default)]
pub enum FetchState<T = Vec<FileMetadata>> {
    #[default]
    Loading,
    Failed(ApiError),
    Loaded(T),
}

impl<T> FetchState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, FetchState::Loading)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, FetchState::Failed(_))
    }

    pub fn loaded(&self) -> Option<&T> {
        match self {
            FetchState::Loaded(value) => Some(value),
            _ => None,
        }
    }
}

impl<T> From<Result<T, ApiError>> for FetchState<T> {
    fn from(result: Result<T, ApiError>) -> Self {
        match result {
            Ok(value) => FetchState::Loaded(value),
            Err(err) => FetchState::Failed(err),
        }
    }
}

/// Case-insensitive substring match on the display name.
pub fn matches_search(file: &FileMetadata, needle_lower: &str) -> bool {
    file.name.to_lowercase().contains(needle_lower)
}

/// Keeps the files whose name contains `search_term`, preserving order.
/// `Loading` and `Failed` pass through; an empty or absent term is the
/// identity.
pub fn apply_search(result: FetchState, search_term: Option<&str>) -> FetchState {
    match (result, search_term) {
        (FetchState::Loaded(files), Some(term)) if !term.is_empty() => {
            FetchState::Loaded(filter_files(files, term))
        }
        (other, _) => other,
    }
}

pub fn filter_files(files: Vec<FileMetadata>, search_term: &str) -> Vec<FileMetadata> {
    if search_term.is_empty() {
        return files;
    }
    let needle = search_term.to_lowercase();
    files
        .into_iter()
        .filter(|file| matches_search(file, &needle))
        .collect()
}
