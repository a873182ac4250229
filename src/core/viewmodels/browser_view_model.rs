use super::{Property, PropertySubscriber, ViewModel};
use crate::backends::FileServer;
use crate::core::query::{Query, RemoteRequest};
use crate::core::search::{FetchState, apply_search};
use crate::models::{FileMetadata, MediaCategory, MediaItem};
use crate::state::FilterStore;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

/// Which slice of the server's files a browser shows. Combined with the
/// shared tag selection this decides the remote requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowseScope {
    Category(MediaCategory),
    /// One raw server type string, e.g. `mp4`
    Type(String),
}

impl Default for BrowseScope {
    fn default() -> Self {
        BrowseScope::Category(MediaCategory::All)
    }
}

impl BrowseScope {
    pub fn requests(
        &self,
        tags: &std::collections::BTreeSet<String>,
        search_term: Option<&str>,
    ) -> Vec<RemoteRequest> {
        let queries = match self {
            BrowseScope::Category(category) => Query::for_category(*category, tags, search_term),
            BrowseScope::Type(ty) => vec![Query::new(Some(ty), tags, search_term)],
        };
        queries.iter().map(Query::request).collect()
    }

    /// Drops files the server returned that do not belong here. Only
    /// matters for categories the server cannot filter on.
    fn retain(&self, files: &mut Vec<FileMetadata>) {
        if let BrowseScope::Category(category) = self {
            files.retain(|f| category.contains(f));
        }
    }
}

#[derive(Debug, Default)]
struct FetchCycle {
    /// Requests the cached result answers
    requests: Option<Vec<RemoteRequest>>,
    generation: u64,
    /// Server result before the search text is applied
    server_result: Option<FetchState>,
}

/// Keeps a file listing in sync with the shared filter selection.
///
/// A tag or scope change that alters the composed requests starts a new
/// fetch and supersedes any fetch still in flight. A change that leaves the
/// requests identical, such as editing the search text, only re-applies the
/// local search to the cached result.
#[derive(Debug, Clone)]
pub struct BrowserViewModel {
    server: Arc<dyn FileServer>,
    filters: FilterStore,
    scope: Property<BrowseScope>,
    files: Property<FetchState>,
    tags: Property<FetchState<Vec<String>>>,
    cycle: Arc<Mutex<FetchCycle>>,
    liveness: CancellationToken,
    watcher: Arc<std::sync::Mutex<Option<JoinHandle<()>>>>,
}

impl BrowserViewModel {
    pub fn new(server: Arc<dyn FileServer>, filters: FilterStore, scope: BrowseScope) -> Self {
        Self {
            server,
            filters,
            scope: Property::new(scope, "scope"),
            files: Property::new(FetchState::Loading, "files"),
            tags: Property::new(FetchState::Loading, "tags"),
            cycle: Arc::new(Mutex::new(FetchCycle::default())),
            liveness: CancellationToken::new(),
            watcher: Arc::new(std::sync::Mutex::new(None)),
        }
    }

    pub fn filters(&self) -> &FilterStore {
        &self.filters
    }

    /// Filtered listing as the view should render it.
    pub fn files(&self) -> FetchState {
        self.files.get()
    }

    pub fn tags(&self) -> FetchState<Vec<String>> {
        self.tags.get()
    }

    pub fn scope(&self) -> BrowseScope {
        self.scope.get()
    }

    pub fn set_scope(&self, scope: BrowseScope) {
        self.scope.update_if(|current| {
            if *current == scope {
                return false;
            }
            *current = scope;
            true
        });
    }

    pub fn files_watch(&self) -> tokio::sync::watch::Receiver<FetchState> {
        self.files.watch()
    }

    /// Loaded files paired with the URL their content is served from.
    pub fn media_items(&self) -> Vec<MediaItem> {
        self.files.with(|state| match state.loaded() {
            Some(files) => files
                .iter()
                .map(|f| MediaItem::new(f.clone(), self.server.content_url(f)))
                .collect(),
            None => Vec::new(),
        })
    }

    pub fn is_disposed(&self) -> bool {
        self.liveness.is_cancelled()
    }

    /// Resolves once [`dispose`](ViewModel::dispose) has been called.
    pub async fn disposed(&self) {
        self.liveness.cancelled().await
    }

    /// Bring the listing up to date with the current filters. Fetches only
    /// if the composed requests differ from the ones last fetched.
    pub async fn sync(&self) {
        self.run_cycle(false).await;
    }

    pub async fn load_tags(&self) {
        self.tags.set(FetchState::Loading);
        let result = self.server.tags().await;
        if self.is_disposed() {
            return;
        }
        match &result {
            Ok(tags) => debug!("Loaded {} tags", tags.len()),
            Err(e) => error!("Failed to load tags: {}", e),
        }
        self.tags.set(FetchState::from(result));
    }

    async fn run_cycle(&self, force: bool) {
        if self.is_disposed() {
            return;
        }

        let (generation, requests) = {
            let mut cycle = self.cycle.lock().await;
            let selection = self.filters.snapshot();
            let scope = self.scope.get();
            let requests = scope.requests(&selection.tags, selection.search_term());

            if !force && cycle.requests.as_ref() == Some(&requests) {
                // Same server question; only the local search may differ
                if let Some(result) = cycle.server_result.clone() {
                    trace!("Requests unchanged, re-applying local filters");
                    self.publish(result, &scope, selection.search_term());
                }
                return;
            }

            cycle.generation += 1;
            cycle.requests = Some(requests.clone());
            cycle.server_result = None;
            self.files.set(FetchState::Loading);
            (cycle.generation, requests)
        };

        info!(
            "Fetching {} (generation {})",
            requests
                .iter()
                .map(RemoteRequest::describe)
                .collect::<Vec<_>>()
                .join(", "),
            generation
        );

        let result = self.server.execute_all(&requests).await;

        let mut cycle = self.cycle.lock().await;
        if self.is_disposed() || cycle.generation != generation {
            debug!("Discarding superseded fetch (generation {})", generation);
            return;
        }

        match &result {
            Ok(files) => debug!("Fetched {} files", files.len()),
            Err(e) => error!("Fetch failed: {}", e),
        }
        let result = FetchState::from(result);
        cycle.server_result = Some(result.clone());

        // Scope or tags may have moved on while the request was out. The
        // result is still cached for these requests, but it is only shown
        // if the current filters ask the same question.
        let selection = self.filters.snapshot();
        let scope = self.scope.get();
        if scope.requests(&selection.tags, selection.search_term()) != requests {
            debug!("Filters changed during fetch (generation {}), not publishing", generation);
            return;
        }
        self.publish(result, &scope, selection.search_term());
    }

    fn publish(&self, mut result: FetchState, scope: &BrowseScope, search_term: Option<&str>) {
        if let FetchState::Loaded(files) = &mut result {
            scope.retain(files);
        }
        self.files.set(apply_search(result, search_term));
    }

    fn spawn_watcher(&self) -> JoinHandle<()> {
        let vm = self.clone();
        let mut selection = self.filters.watch();
        let mut scope = self.scope.watch();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = vm.liveness.cancelled() => break,
                    changed = selection.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    changed = scope.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
                // Run concurrently so a newer change can supersede this fetch
                let vm = vm.clone();
                tokio::spawn(async move { vm.sync().await });
            }
            trace!("Browser filter watcher stopped");
        })
    }
}

#[async_trait::async_trait]
impl ViewModel for BrowserViewModel {
    async fn initialize(&self) {
        let handle = self.spawn_watcher();
        if let Ok(mut watcher) = self.watcher.lock()
            && let Some(previous) = watcher.replace(handle)
        {
            previous.abort();
        }
        tokio::join!(self.load_tags(), self.sync());
    }

    fn subscribe_to_property(&self, property_name: &str) -> Option<PropertySubscriber> {
        match property_name {
            "files" => Some(self.files.subscribe()),
            "tags" => Some(self.tags.subscribe()),
            "scope" => Some(self.scope.subscribe()),
            _ => None,
        }
    }

    async fn refresh(&self) {
        tokio::join!(self.load_tags(), self.run_cycle(true));
    }

    fn dispose(&self) {
        self.liveness.cancel();
        if let Ok(mut watcher) = self.watcher.lock()
            && let Some(handle) = watcher.take()
        {
            handle.abort();
        }
    }
}
