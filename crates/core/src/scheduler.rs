use crate::model::{AnsweredMap, QuestionRecord, VideoDuration};

/// Videos shorter than this use fine-grained checkpoints.
pub const LONG_VIDEO_SECS: f64 = 180.0;

//
// ─── CHECKPOINT BUCKETS ────────────────────────────────────────────────────────
//

/// Granularity of activation checkpoints.
///
/// Short videos get a checkpoint every 5 seconds, long videos one per minute
/// so the viewer is not interrupted too often.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Short,
    Long,
}

impl Bucket {
    #[must_use]
    pub fn for_duration(duration: VideoDuration) -> Self {
        if duration.secs() < LONG_VIDEO_SECS {
            Bucket::Short
        } else {
            Bucket::Long
        }
    }

    #[must_use]
    pub fn secs(self) -> f64 {
        match self {
            Bucket::Short => 5.0,
            Bucket::Long => 60.0,
        }
    }
}

//
// ─── SCHEDULER ─────────────────────────────────────────────────────────────────
//

/// Maps playback time onto question activations.
///
/// Questions are activated strictly in list order: the only candidate is the
/// one right after the last answered question. A candidate becomes active once
/// playback reaches its rounded threshold.
///
/// # Examples
///
/// ```
/// # use retain_core::scheduler::Scheduler;
/// # use retain_core::model::VideoDuration;
/// let scheduler = Scheduler::new(VideoDuration::from_secs(100.0));
/// assert_eq!(scheduler.threshold(Some(20.0)), 25.0);
/// assert_eq!(scheduler.threshold(Some(21.0)), 25.0);
/// assert_eq!(scheduler.threshold(Some(120.0)), 99.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scheduler {
    duration: VideoDuration,
}

impl Scheduler {
    #[must_use]
    pub fn new(duration: VideoDuration) -> Self {
        Self { duration }
    }

    /// Last checkpoint that still fires before playback ends.
    #[must_use]
    pub fn latest_checkpoint(&self) -> f64 {
        (self.duration.secs() - 1.0).max(0.0)
    }

    /// Rounded activation time for a raw question timestamp.
    ///
    /// The timestamp is rounded up to the next bucket boundary; a timestamp that
    /// already sits on a boundary moves one full bucket further. The result never
    /// exceeds one second before the end. A question without a timestamp is
    /// asked at that last checkpoint.
    #[must_use]
    pub fn threshold(&self, timestamp: Option<f64>) -> f64 {
        let limit = self.latest_checkpoint();
        let Some(timestamp) = timestamp.filter(|t| t.is_finite()) else {
            return limit;
        };

        let bucket = Bucket::for_duration(self.duration).secs();
        let rounded = (timestamp / bucket).ceil() * bucket;
        let rounded = if timestamp % bucket == 0.0 {
            rounded + bucket
        } else {
            rounded
        };
        rounded.min(limit)
    }

    /// Index of the only question allowed to activate next.
    #[must_use]
    pub fn next_candidate(last_answered: Option<usize>) -> usize {
        last_answered.map_or(0, |index| index + 1)
    }

    /// Returns the index to activate, if playback has reached the candidate's
    /// threshold. Never decides anything while the duration is unknown.
    #[must_use]
    pub fn should_activate(
        &self,
        current_time: f64,
        questions: &[QuestionRecord],
        last_answered: Option<usize>,
    ) -> Option<usize> {
        if !self.duration.is_known() {
            return None;
        }
        let candidate = Self::next_candidate(last_answered);
        let question = questions.get(candidate)?;
        (current_time >= self.threshold(question.timestamp())).then_some(candidate)
    }

    /// Whether the viewer may move past the active question.
    ///
    /// Requires the active question to be answered and the following question's
    /// threshold to be reached.
    #[must_use]
    pub fn can_advance(
        &self,
        current_time: f64,
        questions: &[QuestionRecord],
        active: usize,
        answered: &AnsweredMap,
    ) -> bool {
        if !self.duration.is_known() {
            return false;
        }
        let Some(current) = questions.get(active) else {
            return false;
        };
        if !answered.contains(current.id()) {
            return false;
        }
        questions
            .get(active + 1)
            .is_some_and(|next| current_time >= self.threshold(next.timestamp()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuestionId;

    fn question(index: usize, timestamp: f64) -> QuestionRecord {
        QuestionRecord::new(
            QuestionId::positional(index),
            format!("Q{index}"),
            vec!["a".into(), "b".into()],
            "a",
            Some(timestamp),
        )
    }

    fn scheduler(duration: f64) -> Scheduler {
        Scheduler::new(VideoDuration::from_secs(duration))
    }

    #[test]
    fn short_videos_round_to_five_seconds() {
        let s = scheduler(100.0);
        assert_eq!(s.threshold(Some(0.5)), 5.0);
        assert_eq!(s.threshold(Some(21.3)), 25.0);
        assert_eq!(s.threshold(Some(24.9)), 25.0);
    }

    #[test]
    fn exact_multiples_wait_one_more_bucket() {
        for duration in [30.0, 100.0, 179.0] {
            let s = scheduler(duration);
            let limit = (duration - 1.0_f64).max(0.0);
            for t in (0..40_u32).map(|k| f64::from(k) * 5.0) {
                assert_eq!(s.threshold(Some(t)), (t + 5.0).min(limit), "d={duration} t={t}");
            }
        }
        for duration in [180.0, 300.0, 3600.0] {
            let s = scheduler(duration);
            let limit = duration - 1.0;
            for t in (0..70_u32).map(|k| f64::from(k) * 60.0) {
                assert_eq!(s.threshold(Some(t)), (t + 60.0).min(limit), "d={duration} t={t}");
            }
        }
    }

    #[test]
    fn long_videos_round_to_minutes() {
        let s = scheduler(600.0);
        assert_eq!(s.threshold(Some(61.0)), 120.0);
        assert_eq!(s.threshold(Some(119.5)), 120.0);
        assert_eq!(s.threshold(Some(60.0)), 120.0);
    }

    #[test]
    fn thresholds_clamp_before_the_end() {
        let s = scheduler(200.0);
        assert_eq!(s.threshold(Some(190.0)), 199.0);
        assert_eq!(s.threshold(Some(500.0)), 199.0);
        assert_eq!(s.threshold(None), 199.0);

        let tiny = scheduler(0.5);
        assert_eq!(tiny.threshold(Some(3.0)), 0.0);
    }

    #[test]
    fn activates_at_threshold_only() {
        let s = scheduler(100.0);
        let questions = vec![question(0, 20.0)];
        assert_eq!(s.should_activate(24.0, &questions, None), None);
        assert_eq!(s.should_activate(25.0, &questions, None), Some(0));
    }

    #[test]
    fn long_video_activation_boundary() {
        let s = scheduler(300.0);
        let questions = vec![question(0, 60.0)];
        assert_eq!(s.should_activate(119.0, &questions, None), None);
        assert_eq!(s.should_activate(120.0, &questions, None), Some(0));
    }

    #[test]
    fn activation_is_strictly_sequential() {
        let s = scheduler(100.0);
        // The second question's threshold is earlier, but it must wait its turn.
        let questions = vec![question(0, 60.0), question(1, 10.0)];
        assert_eq!(s.should_activate(30.0, &questions, None), None);
        assert_eq!(s.should_activate(30.0, &questions, Some(0)), Some(1));
        assert_eq!(s.should_activate(99.0, &questions, Some(1)), None);
    }

    #[test]
    fn unknown_duration_blocks_every_decision() {
        let s = Scheduler::new(VideoDuration::UNKNOWN);
        let questions = vec![question(0, 1.0), question(1, 2.0)];
        assert_eq!(s.should_activate(10_000.0, &questions, None), None);

        let mut answered = AnsweredMap::new();
        answered.insert(QuestionId::positional(0), "a").unwrap();
        assert!(!s.can_advance(10_000.0, &questions, 0, &answered));
    }

    #[test]
    fn advancing_requires_answer_and_next_threshold() {
        let s = scheduler(100.0);
        let questions = vec![question(0, 10.0), question(1, 31.0)];
        let mut answered = AnsweredMap::new();

        assert!(!s.can_advance(40.0, &questions, 0, &answered));
        answered.insert(QuestionId::positional(0), "b").unwrap();
        assert!(!s.can_advance(34.0, &questions, 0, &answered));
        assert!(s.can_advance(35.0, &questions, 0, &answered));
        assert!(!s.can_advance(99.0, &questions, 1, &answered));
    }
}
