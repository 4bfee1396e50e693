use std::{
    sync::{
        mpsc,
        Arc,
    },
    thread,
    time::Duration,
};

use tokio::runtime::Runtime;
use tracing::debug;

use super::TaskResult;
use crate::{
    api::{
        ApiClient,
        DeckSnapshot,
    },
    core::{
        CardId,
        Deck,
        FlashdeckError,
    },
    proposal::ApplyTicket,
};

/// Runs backend calls off the event loop. Every call posts exactly one `TaskResult`;
/// results are delivered in completion order and nothing is ever cancelled.
pub struct TaskManager {
    runtime: Arc<Runtime>,
    receiver: mpsc::Receiver<TaskResult>,
    sender: mpsc::Sender<TaskResult>,
    api: ApiClient,
}

impl TaskManager {
    pub fn new(api: ApiClient) -> Result<Self, FlashdeckError> {
        let runtime = Arc::new(Runtime::new()?);

        let (sender, receiver) = mpsc::channel();

        Ok(Self { runtime, receiver, sender, api })
    }

    pub fn poll_results(&mut self) -> Vec<TaskResult> {
        let mut results = Vec::new();

        while let Ok(result) = self.receiver.try_recv() {
            results.push(result);
        }

        results
    }

    /// Blocks until the next result arrives or `timeout` elapses.
    pub fn wait_for_result(&self, timeout: Duration) -> Option<TaskResult> {
        self.receiver.recv_timeout(timeout).ok()
    }

    fn task_context(&self) -> (mpsc::Sender<TaskResult>, Arc<Runtime>, ApiClient) {
        (self.sender.clone(), self.runtime.clone(), self.api.clone())
    }

    fn spawn<F>(&self, label: &'static str, work: F)
    where
        F: FnOnce(&Runtime, &ApiClient) -> TaskResult + Send + 'static,
    {
        let (sender, runtime, api) = self.task_context();

        thread::spawn(move || {
            let result = work(&runtime, &api);
            debug!(task = label, result = result.task_type(), "task finished");
            let _ = sender.send(result);
        });
    }

    pub fn load_deck(&self, deck_id: u64) {
        self.spawn("load_deck", move |runtime, api| {
            let result = runtime.block_on(api.get_deck(deck_id)).map_err(|e| e.to_string());
            TaskResult::DeckLoaded(result)
        });
    }

    pub fn save_deck(&self, deck: Deck) {
        self.spawn("save_deck", move |runtime, api| {
            let result = runtime.block_on(api.update_deck(&deck)).map_err(|e| e.to_string());
            TaskResult::DeckSaved(result)
        });
    }

    pub fn send_chat(&self, message: String, snapshot: DeckSnapshot, anchors: Vec<CardId>) {
        self.spawn("send_chat", move |runtime, api| {
            let result =
                runtime.block_on(api.chat(&message, &snapshot)).map_err(|e| e.to_string());
            TaskResult::ChatReplied { anchors, result }
        });
    }

    pub fn apply_proposal(&self, ticket: ApplyTicket) {
        self.spawn("apply_proposal", move |runtime, api| {
            let ApplyTicket { proposal_id, accepted_indexes, snapshot } = ticket;
            let result = runtime
                .block_on(api.apply(&proposal_id, &accepted_indexes, &snapshot))
                .map_err(|e| e.to_string());
            TaskResult::ProposalApplied { proposal_id, result }
        });
    }
}
