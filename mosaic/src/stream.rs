//! Per-dataset window streams.
//!
//! A [`DatasetStream`] chains source, normalizer and windower for one dataset
//! and never ends: when the source is exhausted it is rewound and the next
//! pull continues from the first episode.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::normalize::Normalizer;
use crate::source::EpisodeSource;
use crate::window::{Window, Windower, Windows};

/// What to do with episodes that are empty or shorter than the dataset's
/// minimum length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyEpisodePolicy {
    #[default]
    Fail,
    SkipWithWarning,
}

/// An endless supply of windows from one dataset.
pub trait WindowSource: Send {
    fn dataset_id(&self) -> &Arc<str>;

    fn next_window(&mut self) -> Result<Window>;
}

impl<W: WindowSource + ?Sized> WindowSource for Box<W> {
    fn dataset_id(&self) -> &Arc<str> {
        (**self).dataset_id()
    }

    fn next_window(&mut self) -> Result<Window> {
        (**self).next_window()
    }
}

pub struct DatasetStream<S> {
    source: S,
    normalizer: Normalizer,
    windower: Windower,
    policy: EmptyEpisodePolicy,
    current: Option<Windows>,
    windows_this_pass: usize,
    passes: u64,
    skipped: u64,
}

impl<S: EpisodeSource> DatasetStream<S> {
    pub fn new(source: S, normalizer: Normalizer, windower: Windower) -> Self {
        Self {
            source,
            normalizer,
            windower,
            policy: EmptyEpisodePolicy::default(),
            current: None,
            windows_this_pass: 0,
            passes: 0,
            skipped: 0,
        }
    }

    pub fn with_policy(mut self, policy: EmptyEpisodePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Completed passes over the source.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Episodes dropped under [`EmptyEpisodePolicy::SkipWithWarning`].
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    fn restart(&mut self) -> Result<()> {
        if self.windows_this_pass == 0 {
            return Err(Error::NoWindows {
                dataset: self.normalizer.dataset_id().to_string(),
            });
        }
        self.passes += 1;
        debug!(
            dataset = %self.normalizer.dataset_id(),
            passes = self.passes,
            windows = self.windows_this_pass,
            "dataset exhausted, restarting"
        );
        self.source.rewind()?;
        self.windows_this_pass = 0;
        Ok(())
    }
}

impl<S: EpisodeSource> WindowSource for DatasetStream<S> {
    fn dataset_id(&self) -> &Arc<str> {
        self.normalizer.dataset_id()
    }

    fn next_window(&mut self) -> Result<Window> {
        loop {
            if let Some(window) = self.current.as_mut().and_then(Iterator::next) {
                self.windows_this_pass += 1;
                return Ok(window);
            }
            self.current = None;

            let Some(raw) = self.source.next_episode()? else {
                self.restart()?;
                continue;
            };
            match self.normalizer.normalize_episode(&raw) {
                Ok(episode) => {
                    self.current = Some(self.windower.window(Arc::new(episode))?);
                }
                Err(e) if e.is_skippable() && self.policy == EmptyEpisodePolicy::SkipWithWarning => {
                    self.skipped += 1;
                    warn!(
                        dataset = %self.normalizer.dataset_id(),
                        episode = %raw.episode_id,
                        error = %e,
                        "skipping episode"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::normalize::NormalizeError;
    use crate::schema::{ActionRemap, CanonicalSchema, DatasetSpec, EpisodeBounds};
    use crate::source::MemorySource;
    use crate::testing::raw_episode;
    use crate::trajectory::RawEpisode;

    fn normalizer(min: Option<usize>) -> Normalizer {
        let spec = DatasetSpec {
            id: "ds".into(),
            source: "mem://ds".into(),
            control_frequency: 10.0,
            observations: vec![],
            action: ActionRemap::prefix("action", 2),
            episode_length: EpisodeBounds { min, max: None },
        };
        Normalizer::new(Arc::new(CanonicalSchema::new(10.0, 2)), Arc::new(spec)).unwrap()
    }

    fn stream(episodes: Vec<RawEpisode>, min: Option<usize>) -> DatasetStream<MemorySource> {
        DatasetStream::new(
            MemorySource::new(episodes),
            normalizer(min),
            Windower::new(4, 4).unwrap(),
        )
    }

    fn tag(window: &Window) -> (String, usize) {
        (window.episode_id().to_string(), window.start())
    }

    #[test]
    fn restarts_transparently_on_exhaustion() {
        // ep0 yields 2 windows, ep1 yields 1.
        let mut s = stream(vec![raw_episode(0, 8), raw_episode(1, 3)], None);
        let first_pass: Vec<_> = (0..3).map(|_| tag(&s.next_window().unwrap())).collect();
        let second_pass: Vec<_> = (0..3).map(|_| tag(&s.next_window().unwrap())).collect();
        assert_eq!(first_pass, second_pass);
        assert_eq!(s.passes(), 1);
        assert_eq!(s.dataset_id().as_ref(), "ds");
    }

    #[test]
    fn empty_episode_fails_by_default() {
        let mut s = stream(vec![RawEpisode::new("void", vec![]), raw_episode(1, 4)], None);
        match s.next_window() {
            Err(Error::Normalize(NormalizeError::EmptyEpisode { episode_id, .. })) => {
                assert_eq!(episode_id, "void")
            }
            other => panic!("expected empty episode error, got {other:?}"),
        }
    }

    #[test]
    fn empty_and_short_episodes_can_be_skipped() {
        let mut s = stream(
            vec![RawEpisode::new("void", vec![]), raw_episode(1, 1), raw_episode(2, 4)],
            Some(2),
        )
        .with_policy(EmptyEpisodePolicy::SkipWithWarning);
        let w = s.next_window().unwrap();
        assert_eq!(w.episode_id(), "ep2");
        assert_eq!(s.skipped(), 2);
    }

    #[test]
    fn dataset_without_windows_is_an_error_not_a_spin() {
        let mut s = stream(vec![RawEpisode::new("void", vec![])], None)
            .with_policy(EmptyEpisodePolicy::SkipWithWarning);
        assert!(matches!(s.next_window(), Err(Error::NoWindows { .. })));

        let mut s = stream(vec![], None);
        assert!(matches!(s.next_window(), Err(Error::NoWindows { .. })));
    }

    #[test]
    fn schema_mismatch_propagates() {
        let mut broken = raw_episode(0, 2);
        broken.steps[1].action.clear();
        let mut s = stream(vec![broken], None);
        assert!(s.next_window().unwrap_err().is_schema_mismatch());
    }
}
