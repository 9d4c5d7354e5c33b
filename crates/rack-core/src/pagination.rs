use serde::Serialize;

pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Prefix window over a fully computed result list.
///
/// The window only grows ("load more") or resets when the query changes;
/// growing never re-filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    limit: usize,
    step: usize,
}

impl Default for PageWindow {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl PageWindow {
    /// Window showing `step` results and growing by `step`. A zero step is
    /// bumped to 1.
    #[must_use]
    pub fn new(step: usize) -> Self {
        let step = step.max(1);
        Self { limit: step, step }
    }

    /// Window at an explicit `limit`, as echoed back by a client.
    #[must_use]
    pub fn at(limit: usize, step: usize) -> Self {
        let step = step.max(1);
        Self {
            limit: limit.max(1),
            step,
        }
    }

    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    #[must_use]
    pub fn step(&self) -> usize {
        self.step
    }

    #[must_use]
    pub fn slice<'a, T>(&self, results: &'a [T]) -> &'a [T] {
        &results[..results.len().min(self.limit)]
    }

    #[must_use]
    pub fn has_more(&self, total: usize) -> bool {
        total > self.limit
    }

    pub fn grow(&mut self) {
        self.limit = self.limit.saturating_add(self.step);
    }

    pub fn reset(&mut self) {
        self.limit = self.step;
    }

    /// Owned page of `results` under this window.
    #[must_use]
    pub fn page<T: Clone>(&self, results: &[T]) -> Page<T> {
        let total = results.len();
        let has_more = self.has_more(total);
        Page {
            items: self.slice(results).to_vec(),
            total,
            limit: self.limit,
            has_more,
            next_limit: has_more.then(|| self.limit.saturating_add(self.step)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub limit: usize,
    pub has_more: bool,
    /// Limit to request for the next "load more", when there is more.
    pub next_limit: Option<usize>,
}

impl<T> Page<T> {
    /// Converts the items while keeping the window bookkeeping.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            limit: self.limit,
            has_more: self.has_more,
            next_limit: self.next_limit,
        }
    }
}
