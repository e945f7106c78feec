use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use retain_core::model::QuestionRecord;
use retain_core::protocol::QuizMessage;

use super::controller::{QuizCommand, QuizController};
use super::view::QuizView;
use crate::channel::EmbedEndpoint;
use crate::error::{ChannelError, QuestionSourceError};
use crate::question_source::QuestionSource;

type FetchHandle = JoinHandle<Result<Vec<QuestionRecord>, QuestionSourceError>>;

/// Drives a `QuizController` inside the embedded context.
///
/// Telemetry, viewer commands and the question fetch are all serialized
/// through one task, so the controller never sees concurrent mutation.
#[derive(Clone)]
pub struct QuizLoopService {
    source: Arc<dyn QuestionSource>,
}

impl QuizLoopService {
    #[must_use]
    pub fn new(source: Arc<dyn QuestionSource>) -> Self {
        Self { source }
    }

    /// Run until the host side of the channel goes away or the host navigates.
    ///
    /// Every state change is published on `views`; visibility directives go
    /// back to the host on `endpoint`. Returns the final controller.
    pub async fn run(
        &self,
        mut endpoint: EmbedEndpoint,
        mut commands: UnboundedReceiver<QuizCommand>,
        views: watch::Sender<QuizView>,
    ) -> QuizController {
        let mut controller = QuizController::new();
        let mut fetch: Option<FetchHandle> = None;
        let mut commands_open = true;

        if publish(&mut controller, &endpoint, &views).is_err() {
            return controller;
        }

        loop {
            tokio::select! {
                message = endpoint.recv() => match message {
                    Some(message) => controller.apply(message),
                    None => {
                        info!("host channel closed; stopping quiz loop");
                        break;
                    }
                },
                command = commands.recv(), if commands_open => match command {
                    Some(command) => {
                        if let Err(err) = controller.handle_command(command) {
                            debug!(%err, "viewer command rejected");
                        }
                    }
                    None => commands_open = false,
                },
                outcome = join_fetch(&mut fetch) => controller.questions_loaded(outcome),
            }

            if let Some(request) = controller.take_fetch_request() {
                let source = Arc::clone(&self.source);
                fetch = Some(tokio::spawn(async move {
                    source.fetch_questions(&request).await
                }));
            }

            if let Err(err) = publish(&mut controller, &endpoint, &views) {
                warn!(%err, "cannot reach host; stopping quiz loop");
                break;
            }

            if controller.is_discarded() {
                break;
            }
        }

        if let Some(handle) = fetch {
            handle.abort();
        }
        controller
    }
}

/// Wait for the pending fetch, or forever when there is none.
async fn join_fetch(
    fetch: &mut Option<FetchHandle>,
) -> Result<Vec<QuestionRecord>, QuestionSourceError> {
    let Some(handle) = fetch.as_mut() else {
        return std::future::pending().await;
    };
    let outcome = handle.await;
    *fetch = None;
    outcome.map_err(|err| QuestionSourceError::Task(err.to_string()))?
}

fn publish(
    controller: &mut QuizController,
    endpoint: &EmbedEndpoint,
    views: &watch::Sender<QuizView>,
) -> Result<(), ChannelError> {
    if let Some(directive) = controller.take_directive() {
        debug!(?directive, "sending visibility directive");
        endpoint.post(&QuizMessage::from(directive))?;
    }

    let next = controller.view();
    views.send_if_modified(|current| {
        if *current == next {
            return false;
        }
        *current = next;
        true
    });
    Ok(())
}
