use super::AnalysisSnapshot;

/// Snapshot exposed to the readouts and views for the current tick
#[derive(Debug, Clone, Copy)]
pub enum Selection<'a> {
    /// Nothing has ever been acceptable (engine warm-up or no watch)
    NoData,
    /// The most precise window that currently passes the precision test
    Fresh(&'a AnalysisSnapshot),
    /// Copy of the last acceptable window; nothing passes right now
    Stale(&'a AnalysisSnapshot),
}

impl<'a> Selection<'a> {
    pub fn snapshot(&self) -> Option<&'a AnalysisSnapshot> {
        match *self {
            Self::NoData => None,
            Self::Fresh(s) | Self::Stale(s) => Some(s),
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale(_))
    }

    pub fn is_fresh(&self) -> bool {
        matches!(self, Self::Fresh(_))
    }
}

/// Chooses between the analysis windows and keeps the stale fallback.
///
/// The fallback slot is either empty or holds exactly one owned copy of the
/// last accepted window. Accepting a new window overwrites the copy in
/// place.
#[derive(Debug, Default)]
pub struct SnapshotSelector {
    current: Option<usize>,
    stale: Option<AnalysisSnapshot>,
}

/// Index of the longest ready window whose period passes the precision test.
pub fn most_precise(windows: &[AnalysisSnapshot]) -> Option<usize> {
    windows
        .iter()
        .enumerate()
        .rev()
        .filter(|(_, w)| w.ready)
        .find(|(_, w)| w.is_precise())
        .map(|(i, _)| i)
}

impl SnapshotSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-run the selection against freshly analyzed windows.
    pub fn select<'a>(&'a mut self, windows: &'a [AnalysisSnapshot]) -> Selection<'a> {
        let chosen = most_precise(windows);

        match (self.current, chosen) {
            (Some(_), None) => log::debug!("No precise window, falling back to stale data"),
            (prev, Some(i)) if prev != Some(i) => {
                log::debug!(
                    "Selected window {} (period {:.2}, sigma {:.4})",
                    i,
                    windows[i].period,
                    windows[i].sigma
                );
            }
            _ => {}
        }

        if let Some(i) = chosen {
            match self.stale.as_mut() {
                Some(copy) => copy.clone_from(&windows[i]),
                None => self.stale = Some(windows[i].clone()),
            }
        }
        self.current = chosen;

        self.view(windows)
    }

    /// The selection made by the last `select`, without re-evaluating.
    pub fn view<'a>(&'a self, windows: &'a [AnalysisSnapshot]) -> Selection<'a> {
        match self.current.and_then(|i| windows.get(i)) {
            Some(snapshot) => Selection::Fresh(snapshot),
            None => match &self.stale {
                Some(snapshot) => Selection::Stale(snapshot),
                None => Selection::NoData,
            },
        }
    }

    /// Index of the fresh window, if any.
    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn has_fallback(&self) -> bool {
        self.stale.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(ready: bool, period: f64, sigma: f64) -> AnalysisSnapshot {
        AnalysisSnapshot {
            ready,
            period,
            sigma,
            ..AnalysisSnapshot::default()
        }
    }

    #[test]
    fn test_no_data_during_warmup() {
        let windows = vec![window(false, -1.0, 0.0); 4];
        let mut selector = SnapshotSelector::new();
        assert!(matches!(selector.select(&windows), Selection::NoData));
        assert!(!selector.has_fallback());
    }

    #[test]
    fn test_prefers_longest_precise_window() {
        let windows = vec![
            window(true, 10000.0, 0.5),
            window(true, 10000.0, 0.9),
            window(true, 10000.0, 1.5),
            window(false, -1.0, 0.0),
        ];
        let mut selector = SnapshotSelector::new();
        let selection = selector.select(&windows);
        assert!(selection.is_fresh());
        assert_eq!(selection.snapshot().unwrap().sigma, 0.9);
        assert_eq!(selector.current_index(), Some(1));
    }

    #[test]
    fn test_threshold_boundary_is_accepted() {
        let windows = vec![window(true, 10000.0, 1.0)];
        assert_eq!(most_precise(&windows), Some(0));
        let windows = vec![window(true, 10000.0, 1.0001)];
        assert_eq!(most_precise(&windows), None);
    }

    #[test]
    fn test_falls_back_to_stale_copy() {
        let mut windows = vec![window(true, 10000.0, 0.5), window(true, 10000.0, 0.8)];
        let mut selector = SnapshotSelector::new();
        selector.select(&windows);

        windows[0].sigma = 5.0;
        windows[1].sigma = 5.0;
        windows[1].period = 12345.0;

        let selection = selector.select(&windows);
        assert!(selection.is_stale());
        let stale = selection.snapshot().unwrap();
        assert_eq!(stale.sigma, 0.8);
        assert_eq!(stale.period, 10000.0);
    }

    #[test]
    fn test_stale_copy_replaced_on_new_acceptance() {
        let mut windows = vec![window(true, 10000.0, 0.5)];
        let mut selector = SnapshotSelector::new();
        selector.select(&windows);

        windows[0].period = 9000.0;
        windows[0].sigma = 0.2;
        selector.select(&windows);

        windows[0].sigma = 100.0;
        let selection = selector.select(&windows);
        assert!(selection.is_stale());
        assert_eq!(selection.snapshot().unwrap().period, 9000.0);
    }

    #[test]
    fn test_view_matches_last_select() {
        let windows = vec![window(true, 10000.0, 0.5)];
        let mut selector = SnapshotSelector::new();
        selector.select(&windows);
        assert!(selector.view(&windows).is_fresh());
    }
}
