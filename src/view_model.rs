use crate::models::{GeneratedString, GenerationState};
use crate::repository::RandomStringRepository;
use crate::storage::Snapshot;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub const INVALID_LENGTH_MESSAGE: &str = "Length must be greater than 0";
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error occurred";

/// Text of a confirmation asked before a destructive action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmPrompt {
    pub title: &'static str,
    pub message: &'static str,
}

pub const DELETE_ONE_PROMPT: ConfirmPrompt = ConfirmPrompt {
    title: "Delete String",
    message: "Are you sure you want to delete this string?",
};

pub const DELETE_ALL_PROMPT: ConfirmPrompt = ConfirmPrompt {
    title: "Delete All Strings",
    message: "Are you sure you want to delete all strings? This action cannot be undone.",
};

/// Presentation state for the generator screen: the tracked generation request
/// and the list of stored strings.
pub struct GeneratorViewModel {
    repository: Arc<RandomStringRepository>,
    generation_state: Arc<watch::Sender<GenerationState>>,
    strings: watch::Receiver<Snapshot>,
}

impl GeneratorViewModel {
    /// Must be called from within a tokio runtime: spawns the task that mirrors
    /// storage snapshots into `strings`.
    pub fn new(repository: Arc<RandomStringRepository>) -> Self {
        let (generation_state, _) = watch::channel(GenerationState::Idle);
        // Empty until the first storage snapshot arrives
        let (strings_tx, strings) = watch::channel(Snapshot::default());

        let mut list = repository.list();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    // Every receiver (and the view model) is gone
                    _ = strings_tx.closed() => break,
                    next = list.next() => match next {
                        Some(snapshot) => {
                            strings_tx.send_replace(snapshot);
                        }
                        None => break,
                    },
                }
            }
            log::debug!("String list forwarding stopped");
        });

        Self {
            repository,
            generation_state: Arc::new(generation_state),
            strings,
        }
    }

    pub fn state(&self) -> GenerationState {
        self.generation_state.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<GenerationState> {
        self.generation_state.subscribe()
    }

    pub fn strings(&self) -> Snapshot {
        self.strings.borrow().clone()
    }

    pub fn subscribe_strings(&self) -> watch::Receiver<Snapshot> {
        self.strings.clone()
    }

    /// Starts a generation request. A non-positive length fails immediately without
    /// touching the provider and returns `None`; otherwise the state moves to
    /// `Loading` and the returned task settles it to `Success` or `Error`.
    ///
    /// A request issued while another is loading simply takes over the state.
    pub fn generate(&self, length: i32) -> Option<JoinHandle<()>> {
        if length <= 0 {
            log::warn!("Rejected generation request with length {}", length);
            self.generation_state
                .send_replace(GenerationState::Error(INVALID_LENGTH_MESSAGE.to_string()));
            return None;
        }

        self.generation_state.send_replace(GenerationState::Loading);

        let repository = self.repository.clone();
        let generation_state = self.generation_state.clone();
        let limit = length.unsigned_abs();

        Some(tokio::spawn(async move {
            let next = match repository.generate(limit).await {
                Ok(record) => GenerationState::Success(record),
                Err(e) => {
                    let message = e.to_string();
                    if message.trim().is_empty() {
                        GenerationState::Error(UNKNOWN_ERROR_MESSAGE.to_string())
                    } else {
                        GenerationState::Error(message)
                    }
                }
            };
            generation_state.send_replace(next);
        }))
    }

    /// Clears a finished request (success or error) back to `Idle`.
    pub fn reset_generation_state(&self) {
        let previous = self.generation_state.send_replace(GenerationState::Idle);
        if !previous.is_terminal() {
            log::debug!("Generation state reset from non-terminal state {:?}", previous);
        }
    }

    pub async fn delete_string(&self, record: &GeneratedString) -> Result<u64, anyhow::Error> {
        self.repository.delete_one(record).await
    }

    pub async fn delete_all_strings(&self) -> Result<u64, anyhow::Error> {
        self.repository.delete_all().await
    }
}
