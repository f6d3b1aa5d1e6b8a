use super::{ImageHit, PageRequest, SearchOutcome};

pub const DEFAULT_PAGE_SIZE: u32 = 24;
/// Pixels from the end of the scroll area at which the next page is requested.
pub const SCROLL_FETCH_MARGIN: f32 = 600.0;

/// Pagination controller for the gallery.
///
/// Owns the current query, the continuation cursor and the two guard flags.
/// It never touches the network itself: `search`/`load_next_page` hand out a
/// `PageRequest` for the caller to execute, and `apply` folds the resulting
/// `SearchOutcome` back into the state. Outcomes carry the epoch of the fetch
/// that produced them; an outcome from a fetch that was in flight when a new
/// search reset the pager no longer matches and is dropped on arrival.
#[derive(Debug)]
pub struct SearchPager {
    query: String,
    cursor: u64,
    is_loading: bool,
    has_more: bool,
    epoch: u64,
    page_size: u32,
    pub hits: Vec<ImageHit>,
    /// True once a first page came back with no result set at all.
    pub no_results: bool,
}

impl Default for SearchPager {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchPager {
    pub fn new() -> Self {
        Self {
            query: String::new(),
            cursor: 0,
            is_loading: false,
            has_more: false,
            epoch: 0,
            page_size: DEFAULT_PAGE_SIZE,
            hits: Vec::new(),
            no_results: false,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn set_page_size(&mut self, page_size: u32) {
        self.page_size = page_size.max(1);
    }

    /// What the scroll collaborator polls before asking for another page.
    pub fn can_load_more(&self) -> bool {
        self.has_more && !self.is_loading && !self.query.is_empty()
    }

    /// Start a new search. Empty and repeated submissions are ignored.
    pub fn search(&mut self, query: &str) -> Option<PageRequest> {
        let query = query.trim();
        if query.is_empty() || query == self.query {
            return None;
        }
        self.query = query.to_string();
        self.cursor = 0;
        self.is_loading = false;
        self.has_more = true;
        self.no_results = false;
        self.hits.clear();
        self.epoch += 1;
        self.load_next_page()
    }

    /// Request the next page, unless a fetch is in flight, pagination is
    /// exhausted, or no query is set.
    pub fn load_next_page(&mut self) -> Option<PageRequest> {
        if self.is_loading || !self.has_more || self.query.is_empty() {
            return None;
        }
        self.is_loading = true;
        Some(PageRequest {
            query: self.query.clone(),
            offset: self.cursor,
            limit: self.page_size,
            epoch: self.epoch,
        })
    }

    /// Fold a completed fetch back into the pager.
    pub fn apply(&mut self, outcome: SearchOutcome) {
        let epoch = match &outcome {
            SearchOutcome::Page { epoch, .. } | SearchOutcome::Failed { epoch, .. } => *epoch,
        };
        if epoch != self.epoch {
            // Fetch issued before the last reset; its loading flag belongs to
            // a pager state that no longer exists.
            log::debug!("dropping stale search outcome (epoch {epoch} != {})", self.epoch);
            return;
        }
        match outcome {
            SearchOutcome::Page { hits, next_offset, .. } => {
                if hits.is_empty() && self.hits.is_empty() {
                    self.no_results = true;
                }
                self.hits.extend(hits);
                match next_offset {
                    Some(next) => self.cursor = next,
                    None => self.has_more = false,
                }
            }
            SearchOutcome::Failed { error, .. } => {
                // Fail closed: no retry until a new search.
                log::error!("search \"{}\" failed, stopping pagination: {error}", self.query);
                self.has_more = false;
            }
        }
        self.is_loading = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(n: u64) -> ImageHit {
        ImageHit {
            page_id: n,
            title: format!("Hit {n}.jpg"),
            url: format!("https://upload.example/{n}.jpg"),
            thumb_url: format!("https://upload.example/thumb/{n}.jpg"),
            ..Default::default()
        }
    }

    fn page(epoch: u64, count: u64, next_offset: Option<u64>) -> SearchOutcome {
        SearchOutcome::Page {
            epoch,
            hits: (0..count).map(hit).collect(),
            next_offset,
        }
    }

    #[test]
    fn repeated_search_performs_exactly_one_fetch() {
        let mut pager = SearchPager::new();
        let first = pager.search("cats");
        assert!(first.is_some());
        assert!(pager.search("cats").is_none());
        // Still only one request outstanding.
        assert!(pager.is_loading());
    }

    #[test]
    fn empty_query_is_ignored() {
        let mut pager = SearchPager::new();
        assert!(pager.search("").is_none());
        assert!(pager.search("   ").is_none());
        assert!(!pager.is_loading());
    }

    #[test]
    fn continuation_offset_becomes_the_next_request() {
        let mut pager = SearchPager::new();
        let req = pager.search("cats").unwrap();
        assert_eq!(req.offset, 0);
        assert_eq!(req.limit, DEFAULT_PAGE_SIZE);

        pager.apply(page(req.epoch, 24, Some(24)));
        assert_eq!(pager.hits.len(), 24);
        assert_eq!(pager.cursor(), 24);
        assert!(pager.has_more());
        assert!(!pager.is_loading());

        let next = pager.load_next_page().unwrap();
        assert_eq!(next.offset, 24);
        // No second request while that one is in flight.
        assert!(pager.load_next_page().is_none());
    }

    #[test]
    fn load_next_page_without_query_is_noop() {
        let mut pager = SearchPager::new();
        assert!(pager.load_next_page().is_none());
    }

    #[test]
    fn exhaustion_stops_fetching_until_new_search() {
        let mut pager = SearchPager::new();
        let req = pager.search("cats").unwrap();
        pager.apply(page(req.epoch, 7, None));
        assert!(!pager.has_more());
        assert!(pager.load_next_page().is_none());
        assert!(!pager.no_results);

        // A fresh query starts over.
        let req = pager.search("dogs").unwrap();
        assert_eq!(req.offset, 0);
        assert!(pager.hits.is_empty());
    }

    #[test]
    fn empty_first_page_signals_no_results() {
        let mut pager = SearchPager::new();
        let req = pager.search("zzz-no-such-thing").unwrap();
        pager.apply(page(req.epoch, 0, None));
        assert!(pager.no_results);
        assert!(pager.hits.is_empty());
        assert!(!pager.has_more());
    }

    #[test]
    fn empty_later_page_is_exhaustion_not_no_results() {
        let mut pager = SearchPager::new();
        let req = pager.search("cats").unwrap();
        pager.apply(page(req.epoch, 24, Some(24)));
        let req = pager.load_next_page().unwrap();
        pager.apply(page(req.epoch, 0, None));
        assert!(!pager.no_results);
        assert_eq!(pager.hits.len(), 24);
        assert!(!pager.has_more());
    }

    #[test]
    fn failure_halts_pagination_and_clears_loading() {
        let mut pager = SearchPager::new();
        let req = pager.search("cats").unwrap();
        pager.apply(SearchOutcome::Failed {
            epoch: req.epoch,
            error: "connection reset".into(),
        });
        assert!(!pager.is_loading());
        assert!(!pager.has_more());
        assert!(pager.load_next_page().is_none());
    }

    #[test]
    fn stale_outcome_from_previous_query_is_dropped() {
        let mut pager = SearchPager::new();
        let old = pager.search("cats").unwrap();
        // New search resets the pager while the first fetch is in flight.
        let current = pager.search("dogs").unwrap();

        pager.apply(page(old.epoch, 24, Some(24)));
        // Nothing from the stale fetch landed, and the in-flight flag still
        // belongs to the "dogs" request.
        assert!(pager.hits.is_empty());
        assert!(pager.is_loading());

        pager.apply(page(current.epoch, 3, None));
        assert_eq!(pager.hits.len(), 3);
    }

    #[test]
    fn collaborator_poll_reflects_guards() {
        let mut pager = SearchPager::new();
        assert!(!pager.can_load_more());
        let req = pager.search("cats").unwrap();
        assert!(!pager.can_load_more()); // loading
        pager.apply(page(req.epoch, 24, Some(24)));
        assert!(pager.can_load_more());
        let _ = pager.load_next_page();
        assert!(!pager.can_load_more()); // loading again
    }
}
