use std::fmt;
use std::sync::Arc;

use tracing::debug;

/// Stages of one load request, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LoadStage {
    Idle,
    ResolvingFormat,
    Parsing,
    ResolvingSchema,
    ExtractingMetadata,
    BuildingScene,
    Done,
    UsingDefault,
}

impl LoadStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoadStage::Done | LoadStage::UsingDefault)
    }
}

impl fmt::Display for LoadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoadStage::Idle => "idle",
            LoadStage::ResolvingFormat => "resolving_format",
            LoadStage::Parsing => "parsing",
            LoadStage::ResolvingSchema => "resolving_schema",
            LoadStage::ExtractingMetadata => "extracting_metadata",
            LoadStage::BuildingScene => "building_scene",
            LoadStage::Done => "done",
            LoadStage::UsingDefault => "using_default",
        };
        f.write_str(name)
    }
}

/// Receives every stage a load request enters.
pub type StageObserver = Arc<dyn Fn(LoadStage) + Send + Sync>;

/// Tracks the current stage of one load request. Stages only move forward.
pub(crate) struct StageTracker {
    current: LoadStage,
    observer: Option<StageObserver>,
}

impl StageTracker {
    pub(crate) fn new(observer: Option<StageObserver>) -> Self {
        Self {
            current: LoadStage::Idle,
            observer,
        }
    }

    pub(crate) fn current(&self) -> LoadStage {
        self.current
    }

    pub(crate) fn advance(&mut self, next: LoadStage) {
        debug_assert!(
            next > self.current && !self.current.is_terminal(),
            "stage moved from {} to {}",
            self.current,
            next
        );
        self.current = next;
        debug!(stage = %next, "entering stage");
        if let Some(observer) = &self.observer {
            observer(next);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn reports_every_transition() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let observer: StageObserver = Arc::new(move |stage| sink.lock().unwrap().push(stage));

        let mut tracker = StageTracker::new(Some(observer));
        assert_eq!(tracker.current(), LoadStage::Idle);
        tracker.advance(LoadStage::ResolvingFormat);
        tracker.advance(LoadStage::Parsing);
        tracker.advance(LoadStage::BuildingScene);
        tracker.advance(LoadStage::Done);

        assert_eq!(
            *seen.lock().unwrap(),
            [LoadStage::ResolvingFormat, LoadStage::Parsing, LoadStage::BuildingScene, LoadStage::Done]
        );
        assert!(tracker.current().is_terminal());
    }

    #[test]
    #[should_panic]
    #[cfg(debug_assertions)]
    fn backwards_transition_panics_in_debug() {
        let mut tracker = StageTracker::new(None);
        tracker.advance(LoadStage::Parsing);
        tracker.advance(LoadStage::ResolvingFormat);
    }
}
