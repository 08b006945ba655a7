//! Per-session cache of solved instances.
//!
//! The cache is append-only: navigation only moves the cursor, and every
//! instance seen stays available for backward navigation. Growth is lazy;
//! moving past the last known instance asks the caller to fetch the next
//! batch from the solver, once, and the answer either extends the cache or
//! proves it terminal.

use crate::models::Instance;

/// Observable state of an [`InstanceCache`].
///
/// - `Empty`: nothing cached yet
/// - `Loaded`: at least one instance cached, cursor free to move
/// - `ExhaustedPending`: cursor on the last known instance, a fetch was
///   requested and has not been answered
/// - `Terminal`: the solver confirmed there are no further instances
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Empty,
    Loaded,
    ExhaustedPending,
    Terminal,
}

/// Result of [`InstanceCache::advance`].
#[derive(Debug, PartialEq)]
pub enum Advance<'a> {
    /// Cache hit, the cursor moved.
    Moved(&'a Instance),
    /// The caller must fetch and [`append`](InstanceCache::append) before
    /// advancing again.
    NeedsFetch,
    /// A fetch was already requested and is still outstanding.
    FetchPending,
    /// No more instances exist; the cursor did not move.
    Exhausted,
    /// No command has produced instances yet.
    Empty,
}

/// Result of [`InstanceCache::retreat`].
#[derive(Debug, PartialEq)]
pub enum Retreat<'a> {
    Moved(&'a Instance),
    AtStart,
}

#[derive(Debug, Clone, Default)]
pub struct InstanceCache {
    instances: Vec<Instance>,
    cursor: usize,
    terminal: bool,
    fetch_pending: bool,
}

impl InstanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> CacheState {
        if self.terminal {
            CacheState::Terminal
        } else if self.fetch_pending {
            CacheState::ExhaustedPending
        } else if self.instances.is_empty() {
            CacheState::Empty
        } else {
            CacheState::Loaded
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of satisfiable instances known so far.
    pub fn max_known(&self) -> usize {
        self.instances.len()
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    pub fn current(&self) -> Option<&Instance> {
        self.instances.get(self.cursor)
    }

    /// Extend the cache with a solver batch and return how many satisfiable
    /// instances were added.
    ///
    /// An unsatisfiable outcome marks the cache terminal and is not stored,
    /// so the cursor can never land on it. Model-error outcomes are not
    /// instances and are skipped. Anything arriving after terminal is ignored.
    pub fn append(&mut self, batch: Vec<Instance>) -> usize {
        self.fetch_pending = false;
        let mut added = 0;

        for outcome in batch {
            if self.terminal {
                tracing::debug!("Ignoring outcome received after terminal");
                break;
            }
            if outcome.alloy_error.is_some() {
                continue;
            }
            if outcome.unsat {
                self.terminal = true;
            } else {
                self.instances.push(outcome);
                added += 1;
            }
        }

        tracing::debug!(
            added,
            max_known = self.instances.len(),
            terminal = self.terminal,
            "Appended solver batch"
        );
        added
    }

    /// Move forward one instance, or report why it cannot.
    pub fn advance(&mut self) -> Advance<'_> {
        if self.cursor + 1 < self.instances.len() {
            self.cursor += 1;
            return Advance::Moved(&self.instances[self.cursor]);
        }
        if self.terminal {
            return Advance::Exhausted;
        }
        if self.instances.is_empty() {
            return Advance::Empty;
        }
        if self.fetch_pending {
            return Advance::FetchPending;
        }
        self.fetch_pending = true;
        Advance::NeedsFetch
    }

    /// Move back one instance. Never requires a fetch.
    pub fn retreat(&mut self) -> Retreat<'_> {
        if self.cursor == 0 {
            return Retreat::AtStart;
        }
        self.cursor -= 1;
        Retreat::Moved(&self.instances[self.cursor])
    }

    /// Forget an outstanding fetch request that failed, so the next
    /// [`advance`](Self::advance) asks again.
    pub fn abort_fetch(&mut self) {
        self.fetch_pending = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sat(n: i64) -> Instance {
        Instance::satisfiable(vec![json!(n)])
    }

    fn graph_of(advance: Advance<'_>) -> Option<serde_json::Value> {
        match advance {
            Advance::Moved(i) => i.graph().cloned(),
            _ => None,
        }
    }

    #[test]
    fn starts_empty() {
        let mut cache = InstanceCache::new();
        assert_eq!(cache.state(), CacheState::Empty);
        assert_eq!(cache.advance(), Advance::Empty);
        assert_eq!(cache.retreat(), Retreat::AtStart);
        assert!(cache.current().is_none());
    }

    #[test]
    fn first_batch_loads_with_cursor_on_first_instance() {
        let mut cache = InstanceCache::new();
        assert_eq!(cache.append(vec![sat(0)]), 1);
        assert_eq!(cache.state(), CacheState::Loaded);
        assert_eq!(cache.cursor(), 0);
        assert_eq!(cache.max_known(), 1);
    }

    #[test]
    fn advance_hits_cache_before_asking_for_fetch() {
        let mut cache = InstanceCache::new();
        cache.append(vec![sat(0), sat(1)]);

        assert_eq!(graph_of(cache.advance()), Some(json!(1)));
        assert_eq!(cache.cursor(), 1);
        assert_eq!(cache.advance(), Advance::NeedsFetch);
        assert_eq!(cache.state(), CacheState::ExhaustedPending);
    }

    #[test]
    fn repeated_advance_at_boundary_requests_one_fetch() {
        let mut cache = InstanceCache::new();
        cache.append(vec![sat(0)]);

        assert_eq!(cache.advance(), Advance::NeedsFetch);
        for _ in 0..5 {
            assert_eq!(cache.advance(), Advance::FetchPending);
        }
        assert_eq!(cache.cursor(), 0);

        cache.append(vec![sat(1)]);
        assert_eq!(graph_of(cache.advance()), Some(json!(1)));
    }

    #[test]
    fn unsat_tail_is_terminal_and_never_current() {
        let mut cache = InstanceCache::new();
        cache.append(vec![sat(0)]);
        assert_eq!(cache.advance(), Advance::NeedsFetch);

        assert_eq!(cache.append(vec![Instance::unsatisfiable()]), 0);
        assert_eq!(cache.state(), CacheState::Terminal);
        assert_eq!(cache.max_known(), 1);

        for _ in 0..3 {
            assert_eq!(cache.advance(), Advance::Exhausted);
            assert_eq!(cache.cursor(), 0);
        }
        assert!(cache.current().unwrap().is_satisfiable());
    }

    #[test]
    fn unsat_first_result_is_terminal_without_instances() {
        let mut cache = InstanceCache::new();
        cache.append(vec![Instance::unsatisfiable().with_check(true)]);
        assert_eq!(cache.state(), CacheState::Terminal);
        assert_eq!(cache.advance(), Advance::Exhausted);
        assert!(cache.current().is_none());
    }

    #[test]
    fn outcomes_after_terminal_are_ignored() {
        let mut cache = InstanceCache::new();
        cache.append(vec![sat(0), Instance::unsatisfiable(), sat(2)]);
        assert_eq!(cache.max_known(), 1);
        assert_eq!(cache.append(vec![sat(3)]), 0);
        assert_eq!(cache.max_known(), 1);
    }

    #[test]
    fn model_errors_are_not_cached() {
        let mut cache = InstanceCache::new();
        let error = Instance::model_error(crate::models::SolverDiagnostic {
            msg: "Syntax error".to_string(),
            ..Default::default()
        });
        assert_eq!(cache.append(vec![error]), 0);
        assert_eq!(cache.state(), CacheState::Empty);
    }

    #[test]
    fn retreat_walks_back_to_start_then_stops() {
        let mut cache = InstanceCache::new();
        cache.append(vec![sat(0), sat(1), sat(2)]);
        cache.advance();
        cache.advance();

        assert!(matches!(cache.retreat(), Retreat::Moved(_)));
        assert!(matches!(cache.retreat(), Retreat::Moved(_)));
        assert_eq!(cache.cursor(), 0);
        for _ in 0..3 {
            assert_eq!(cache.retreat(), Retreat::AtStart);
        }
        assert_eq!(cache.cursor(), 0);
    }

    #[test]
    fn aborted_fetch_can_be_requested_again() {
        let mut cache = InstanceCache::new();
        cache.append(vec![sat(0)]);
        assert_eq!(cache.advance(), Advance::NeedsFetch);
        cache.abort_fetch();
        assert_eq!(cache.state(), CacheState::Loaded);
        assert_eq!(cache.advance(), Advance::NeedsFetch);
    }

    #[test]
    fn cursor_stays_within_known_range_for_any_walk() {
        let total = 7;
        let mut cache = InstanceCache::new();
        cache.append(vec![sat(0)]);
        let mut fetches = 0;
        let mut produced = 1;

        for _ in 0..(total * 3) {
            match cache.advance() {
                Advance::NeedsFetch => {
                    fetches += 1;
                    if produced < total {
                        cache.append(vec![sat(produced)]);
                        produced += 1;
                    } else {
                        cache.append(vec![Instance::unsatisfiable()]);
                    }
                }
                Advance::Moved(_) | Advance::Exhausted => {}
                other => panic!("unexpected {:?}", other),
            }
            assert!(cache.cursor() < cache.max_known());
        }

        // One fetch per unseen position plus the one proving termination.
        assert_eq!(fetches, total);
        assert_eq!(cache.cursor(), (total - 1) as usize);
        assert!(cache.is_terminal());
    }
}
