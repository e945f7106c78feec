//! A headless stand-in for the host page and the person watching.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use retain_core::model::QuizMode;
use services::sessions::{ReviewView, TimedQuestionView};
use services::{EmbedEndpoint, HostPage, QuizCommand, QuizLoopService, QuizView, VideoSnapshot};
use tokio::sync::{mpsc, watch};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

const PLAYBACK_TICK: Duration = Duration::from_millis(250);

/// Shared state of the simulated video player.
#[derive(Debug)]
pub struct Playback {
    url: String,
    video: VideoSnapshot,
}

impl Playback {
    pub fn new(url: &str, duration: f64) -> Self {
        Self {
            url: url.to_owned(),
            video: VideoSnapshot {
                current_time: 0.0,
                duration,
                paused: false,
                ended: false,
            },
        }
    }
}

fn lock(playback: &Mutex<Playback>) -> MutexGuard<'_, Playback> {
    playback.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Host page backed by `Playback`; mounting the embed starts the quiz loop.
pub struct SimulatedPage {
    playback: Arc<Mutex<Playback>>,
    quiz: QuizLoopService,
    commands: Option<mpsc::UnboundedReceiver<QuizCommand>>,
    views: Option<watch::Sender<QuizView>>,
}

impl SimulatedPage {
    pub fn new(
        playback: Arc<Mutex<Playback>>,
        quiz: QuizLoopService,
        commands: mpsc::UnboundedReceiver<QuizCommand>,
        views: watch::Sender<QuizView>,
    ) -> Self {
        Self {
            playback,
            quiz,
            commands: Some(commands),
            views: Some(views),
        }
    }
}

impl HostPage for SimulatedPage {
    fn url(&self) -> String {
        lock(&self.playback).url.clone()
    }

    fn is_ad_playing(&self) -> bool {
        false
    }

    fn video(&self) -> Option<VideoSnapshot> {
        Some(lock(&self.playback).video)
    }

    fn play(&mut self) {
        info!("video resumed");
        lock(&self.playback).video.paused = false;
    }

    fn pause(&mut self) {
        info!("video paused");
        lock(&self.playback).video.paused = true;
    }

    fn mount_embed(&mut self, origin: &str, endpoint: EmbedEndpoint) {
        // The simulated viewer only has one command stream, so one session per run.
        let (Some(commands), Some(views)) = (self.commands.take(), self.views.take()) else {
            warn!("embed already used once; ignoring remount");
            return;
        };
        info!(%origin, "embed mounted");
        let quiz = self.quiz.clone();
        tokio::spawn(async move {
            let controller = quiz.run(endpoint, commands, views).await;
            info!(discarded = controller.is_discarded(), "quiz session ended");
        });
    }

    fn set_embed_visible(&mut self, visible: bool) {
        info!(visible, "embed visibility changed");
    }

    fn unmount_embed(&mut self) {
        info!("embed unmounted");
    }
}

/// Advance the playhead while the video is playing. Returns once it ends.
pub async fn run_playback(playback: Arc<Mutex<Playback>>, rate: f64) {
    let mut ticker = interval(PLAYBACK_TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let step = PLAYBACK_TICK.as_secs_f64() * rate;

    loop {
        ticker.tick().await;
        let mut state = lock(&playback);
        let video = &mut state.video;
        if video.paused || video.ended {
            continue;
        }
        video.current_time = (video.current_time + step).min(video.duration);
        if video.current_time >= video.duration {
            video.ended = true;
            video.paused = true;
            info!(duration = video.duration, "video ended");
            return;
        }
    }
}

/// Watch the rendered quiz and answer it the way an attentive viewer would.
pub async fn run_viewer(
    commands: mpsc::UnboundedSender<QuizCommand>,
    mut views: watch::Receiver<QuizView>,
    mode: QuizMode,
) {
    if commands.send(QuizCommand::ChooseMode(mode)).is_err() {
        return;
    }

    while views.changed().await.is_ok() {
        let view = views.borrow_and_update().clone();
        let Some(command) = respond(&view) else {
            debug!(?view, "nothing to do");
            continue;
        };
        if commands.send(command).is_err() {
            return;
        }
    }
}

fn respond(view: &QuizView) -> Option<QuizCommand> {
    match view {
        QuizView::TimedQuestion(timed) => respond_timed(timed),
        QuizView::Review(review) => respond_review(review),
        QuizView::Unavailable => {
            warn!("no quiz for this video");
            None
        }
        QuizView::ChoosingMode | QuizView::Hidden => None,
    }
}

fn respond_timed(view: &TimedQuestionView) -> Option<QuizCommand> {
    if view.selected.is_none() {
        info!(
            question = view.question.text(),
            answered = view.progress.answered,
            total = view.progress.total,
            "answering timed question"
        );
        return Some(QuizCommand::Submit {
            question_id: view.question.id().clone(),
            option: view.question.correct_answer().to_owned(),
        });
    }
    if view.can_advance {
        return Some(QuizCommand::Next);
    }
    view.can_close.then_some(QuizCommand::Close)
}

fn respond_review(view: &ReviewView) -> Option<QuizCommand> {
    if view.selected.is_none() {
        info!(
            question = view.question.text(),
            index = view.index,
            total = view.total,
            "answering review question"
        );
        return Some(QuizCommand::ReviewSubmit {
            option: view.question.correct_answer().to_owned(),
        });
    }
    if !view.completed {
        return Some(QuizCommand::ReviewNext);
    }
    info!(score = view.score, total = view.total, "review finished");
    Some(QuizCommand::ReviewDismiss)
}
