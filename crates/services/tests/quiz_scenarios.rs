use retain_core::model::{QuestionId, QuestionRecord, QuizMode};
use retain_core::protocol::{HostMessage, VisibilityDirective};
use services::{QuizCommand, QuizController, QuizPhase, QuizView, Stage};

const URL: &str = "https://www.youtube.com/watch?v=scenario";

fn question(index: usize, timestamp: f64) -> QuestionRecord {
    QuestionRecord::new(
        QuestionId::positional(index),
        format!("Question {index}"),
        vec!["right".into(), "wrong".into()],
        "right",
        Some(timestamp),
    )
}

/// Controller with mode chosen, telemetry primed and questions loaded.
fn start(mode: QuizMode, duration: f64, questions: Vec<QuestionRecord>) -> QuizController {
    let mut controller = QuizController::new();
    controller
        .handle_command(QuizCommand::ChooseMode(mode))
        .unwrap();
    controller.apply(HostMessage::VideoUrl {
        video_url: URL.into(),
    });
    controller.apply(HostMessage::VideoDuration {
        video_duration: duration,
    });
    let request = controller.take_fetch_request().expect("request issued");
    assert_eq!(request.timestamped, mode.requires_timestamps());
    controller.questions_loaded(Ok(questions));
    controller
}

fn tick(controller: &mut QuizController, current_time: f64) -> Option<VisibilityDirective> {
    controller.apply(HostMessage::CurrentTime { current_time });
    controller.take_directive()
}

fn submit(controller: &mut QuizController, index: usize) {
    controller
        .handle_command(QuizCommand::Submit {
            question_id: QuestionId::positional(index),
            option: "right".into(),
        })
        .unwrap();
}

fn timed_phase(controller: &QuizController) -> QuizPhase {
    match controller.stage() {
        Stage::Timed(session) => session.phase(),
        other => panic!("expected timed stage, got {other:?}"),
    }
}

#[test]
fn short_video_activates_on_rounded_checkpoint() {
    let mut controller = start(QuizMode::Throughout, 100.0, vec![question(0, 20.0)]);
    assert_eq!(controller.take_directive(), Some(VisibilityDirective::Inactive));

    assert_eq!(tick(&mut controller, 24.0), None);
    assert_eq!(timed_phase(&controller), QuizPhase::Idle);

    assert_eq!(tick(&mut controller, 25.0), Some(VisibilityDirective::Active));
    assert_eq!(timed_phase(&controller), QuizPhase::AwaitingAnswer { index: 0 });
    assert!(matches!(controller.view(), QuizView::TimedQuestion(_)));
}

#[test]
fn long_video_uses_minute_buckets() {
    let mut controller = start(QuizMode::Throughout, 300.0, vec![question(0, 60.0)]);
    controller.take_directive();

    // An exact multiple waits for the following bucket.
    assert_eq!(tick(&mut controller, 119.0), None);
    assert_eq!(tick(&mut controller, 120.0), Some(VisibilityDirective::Active));
}

#[test]
fn both_mode_hands_off_to_end_quiz_once() {
    let mut controller = start(
        QuizMode::Both,
        100.0,
        vec![question(0, 10.0), question(1, 30.0)],
    );
    controller.take_directive();

    assert_eq!(tick(&mut controller, 15.0), Some(VisibilityDirective::Active));
    submit(&mut controller, 0);
    tick(&mut controller, 35.0);
    controller.handle_command(QuizCommand::Next).unwrap();
    submit(&mut controller, 1);
    controller.handle_command(QuizCommand::Close).unwrap();

    let Stage::EndOfVideo(quiz) = controller.stage() else {
        panic!("expected the end-of-video quiz after closing the last question");
    };
    assert_eq!(quiz.total(), 2);
    assert!(!quiz.is_revealed());
    assert_eq!(controller.take_directive(), Some(VisibilityDirective::Inactive));

    // Playing on to the end never brings the timed panel back.
    for t in [50.0, 80.0, 99.0] {
        assert_eq!(tick(&mut controller, t), None);
        assert_eq!(controller.view(), QuizView::Hidden);
    }

    controller.apply(HostMessage::VideoEnded { video_ended: true });
    assert_eq!(controller.take_directive(), Some(VisibilityDirective::Active));
    controller
        .handle_command(QuizCommand::ReviewSubmit {
            option: "wrong".into(),
        })
        .unwrap();
    controller.handle_command(QuizCommand::ReviewNext).unwrap();

    // Repeated end signals keep the same review going.
    for _ in 0..3 {
        controller.apply(HostMessage::VideoEnded { video_ended: true });
        tick(&mut controller, 100.0);
    }
    let QuizView::Review(review) = controller.view() else {
        panic!("expected review view");
    };
    assert_eq!(review.index, 1);
    assert_eq!(review.total, 2);
    assert_eq!(review.score, 0);
    assert_eq!(controller.take_directive(), None);

    controller
        .handle_command(QuizCommand::ReviewSubmit {
            option: "right".into(),
        })
        .unwrap();
    controller.handle_command(QuizCommand::ReviewDismiss).unwrap();
    assert_eq!(controller.take_directive(), Some(VisibilityDirective::Inactive));
    assert_eq!(controller.view(), QuizView::Hidden);
}

#[test]
fn throughout_mode_never_hands_off() {
    let mut controller = start(QuizMode::Throughout, 100.0, vec![question(0, 10.0)]);
    tick(&mut controller, 15.0);
    submit(&mut controller, 0);
    controller.handle_command(QuizCommand::Close).unwrap();
    controller.apply(HostMessage::VideoEnded { video_ended: true });

    assert!(matches!(controller.stage(), Stage::Timed(_)));
    assert_eq!(controller.view(), QuizView::Hidden);
}

#[test]
fn empty_question_list_never_shows_the_quiz() {
    let mut controller = start(QuizMode::Both, 100.0, Vec::new());
    assert!(matches!(controller.stage(), Stage::Unavailable));
    assert_eq!(controller.view(), QuizView::Unavailable);

    let mut directives = vec![controller.take_directive()];
    for t in 0..=100_u32 {
        directives.push(tick(&mut controller, f64::from(t)));
    }
    controller.apply(HostMessage::VideoEnded { video_ended: true });
    directives.push(controller.take_directive());

    assert!(!directives.contains(&Some(VisibilityDirective::Active)));
    assert_eq!(controller.take_fetch_request(), None);
}

#[test]
fn closing_early_keeps_the_place_in_the_sequence() {
    let mut controller = start(
        QuizMode::Throughout,
        100.0,
        vec![question(0, 10.0), question(1, 50.0)],
    );
    controller.take_directive();

    assert_eq!(tick(&mut controller, 15.0), Some(VisibilityDirective::Active));
    submit(&mut controller, 0);
    assert_eq!(tick(&mut controller, 20.0), None);
    controller.handle_command(QuizCommand::Close).unwrap();

    assert_eq!(timed_phase(&controller), QuizPhase::Idle);
    assert_eq!(controller.take_directive(), Some(VisibilityDirective::Inactive));
    let Stage::Timed(session) = controller.stage() else {
        unreachable!();
    };
    assert!(session.is_hidden());
    assert_eq!(session.last_answered(), Some(0));

    assert_eq!(tick(&mut controller, 54.0), None);
    assert_eq!(tick(&mut controller, 55.0), Some(VisibilityDirective::Active));
    assert_eq!(timed_phase(&controller), QuizPhase::AwaitingAnswer { index: 1 });
}

#[test]
fn late_duration_defers_the_first_question() {
    let mut controller = QuizController::new();
    controller.choose_mode(QuizMode::Throughout).unwrap();
    controller.apply(HostMessage::VideoUrl {
        video_url: URL.into(),
    });
    controller.take_fetch_request().unwrap();
    controller.questions_loaded(Ok(vec![question(0, 10.0)]));
    controller.take_directive();

    assert_eq!(tick(&mut controller, 40.0), None);
    controller.apply(HostMessage::VideoDuration {
        video_duration: 100.0,
    });
    assert_eq!(controller.take_directive(), Some(VisibilityDirective::Active));
}
