//! Conversation session: owns the turn list and drives response streams.
//!
//! All state mutation happens on the single processing path of `submit`;
//! the only shared resource is the cancellation signal, written once per
//! submission and read between chunk reads.

use futures::{Stream, StreamExt};
use log::{error, info, warn};
use std::sync::Arc;
use tokio::sync::watch;

use crate::assembler::{
    ChunkDisposition, ResponseAssembler, CANCELLED_MESSAGE, FAILURE_MESSAGE,
};
use crate::client::AdvisorClient;
use crate::history::ConversationStore;
use crate::models::chat::ConversationTurn;
use crate::models::stream::CardsData;

/// Write-once cancellation trigger for one submission.
pub struct CancelSignal(watch::Sender<bool>);

impl CancelSignal {
    /// Create a signal and its paired receiver. The receiver belongs to the
    /// one `submit` call this signal should cancel; a fresh pair is needed
    /// per submission.
    pub fn new() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self(tx), rx)
    }

    pub fn cancel(&self) {
        let _ = self.0.send(true);
    }
}

/// How a driven stream ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamOutcome {
    /// `[DONE]` sentinel or clean end of stream.
    Completed,
    /// The backend sent an `error` record.
    BackendError,
    /// The user cancelled mid-stream.
    Cancelled,
    /// Transport failure: network error, bad status, broken body.
    Failed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// A stream was already in flight (or the query was empty); nothing
    /// happened.
    Rejected,
    Finished(StreamOutcome),
}

pub struct ChatSession {
    client: AdvisorClient,
    store: Arc<dyn ConversationStore>,
    turns: Vec<ConversationTurn>,
    in_flight: bool,
}

impl ChatSession {
    /// Restore the persisted conversation, or start fresh with the greeting.
    /// A corrupt snapshot is logged and discarded rather than propagated.
    pub async fn new(client: AdvisorClient, store: Arc<dyn ConversationStore>) -> Self {
        let mut turns = match store.load_conversation().await {
            Ok(turns) => turns,
            Err(err) => {
                warn!("failed to restore conversation history: {}", err);
                Vec::new()
            }
        };
        // A snapshot taken mid-stream leaves a turn claiming to still
        // receive data; no restored turn may stay in that state.
        for turn in &mut turns {
            if turn.is_streaming {
                turn.is_streaming = false;
                if turn.content.is_empty() {
                    turn.content = FAILURE_MESSAGE.to_string();
                }
            }
        }
        if turns.is_empty() {
            turns.push(ConversationTurn::greeting());
        }
        Self {
            client,
            store,
            turns,
            in_flight: false,
        }
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn is_streaming(&self) -> bool {
        self.in_flight
    }

    /// Submit one query and stream the answer into a new assistant turn.
    ///
    /// `on_update` observes the turn after every applied chunk and once more
    /// on termination. Transport failures never surface as an error here;
    /// they end up as the fixed failure text on the turn.
    pub async fn submit(
        &mut self,
        query: &str,
        mut cancel: watch::Receiver<bool>,
        mut on_update: impl FnMut(&ConversationTurn),
    ) -> SubmitOutcome {
        let query = query.trim().to_string();
        if query.is_empty() {
            return SubmitOutcome::Rejected;
        }
        if self.in_flight {
            info!("submission rejected: a response stream is already in flight");
            return SubmitOutcome::Rejected;
        }
        self.in_flight = true;

        self.turns.push(ConversationTurn::user(&query));
        let pending = ConversationTurn::assistant_pending();
        let turn_id = pending.id.clone();
        self.turns.push(pending);
        self.persist().await;

        let on_update: &mut dyn FnMut(&ConversationTurn) = &mut on_update;
        let response = tokio::select! {
            _ = cancelled(&mut cancel) => None,
            result = self.client.send_query(&query) => match result {
                Ok(resp) => Some(resp),
                Err(err) => {
                    warn!("query submission failed: {}", err);
                    self.finalize(&turn_id, StreamOutcome::Failed, None, on_update)
                        .await;
                    self.in_flight = false;
                    return SubmitOutcome::Finished(StreamOutcome::Failed);
                }
            },
        };

        let outcome = match response {
            Some(resp) => {
                self.consume(&turn_id, resp.bytes_stream(), &mut cancel, on_update)
                    .await
            }
            None => {
                self.finalize(&turn_id, StreamOutcome::Cancelled, None, on_update)
                    .await;
                StreamOutcome::Cancelled
            }
        };

        self.in_flight = false;
        SubmitOutcome::Finished(outcome)
    }

    /// Reset to the seed greeting and drop persisted state.
    pub async fn clear(&mut self) {
        self.turns = vec![ConversationTurn::greeting()];
        if let Err(err) = self.store.clear().await {
            error!("failed to clear conversation history: {}", err);
        }
    }

    /// Newest cards payload in the conversation, persisted under its own key
    /// for the recommendations view.
    pub async fn latest_cards(&self) -> Option<CardsData> {
        let cards = self.turns.iter().rev().find_map(|turn| turn.cards.clone())?;
        if let Err(err) = self.store.save_last_cards(&cards).await {
            error!("failed to persist cards payload: {}", err);
        }
        Some(cards)
    }

    pub async fn load_last_cards(&self) -> Option<CardsData> {
        match self.store.load_last_cards().await {
            Ok(cards) => cards,
            Err(err) => {
                warn!("failed to load cards payload: {}", err);
                None
            }
        }
    }

    /// Drain the response body through one assembler, checking the
    /// cancellation signal between reads. Dropping the stream on exit is
    /// what aborts the underlying request.
    async fn consume<S, B, E>(
        &mut self,
        turn_id: &str,
        stream: S,
        cancel: &mut watch::Receiver<bool>,
        on_update: &mut dyn FnMut(&ConversationTurn),
    ) -> StreamOutcome
    where
        S: Stream<Item = Result<B, E>>,
        B: AsRef<[u8]>,
        E: std::fmt::Display,
    {
        let mut assembler = ResponseAssembler::new();
        futures::pin_mut!(stream);

        let outcome = loop {
            tokio::select! {
                _ = cancelled(cancel) => break StreamOutcome::Cancelled,
                chunk = stream.next() => match chunk {
                    Some(Ok(bytes)) => {
                        let disposition = assembler.push_chunk(bytes.as_ref());
                        self.sync_turn(turn_id, &assembler, on_update).await;
                        match disposition {
                            ChunkDisposition::Continue => {}
                            ChunkDisposition::Done => break StreamOutcome::Completed,
                            ChunkDisposition::BackendError => break StreamOutcome::BackendError,
                        }
                    }
                    Some(Err(err)) => {
                        warn!("transport error while streaming: {}", err);
                        break StreamOutcome::Failed;
                    }
                    None => {
                        // End of stream without a sentinel still completes.
                        match assembler.finish() {
                            ChunkDisposition::BackendError => break StreamOutcome::BackendError,
                            _ => break StreamOutcome::Completed,
                        }
                    }
                },
            }
        };

        self.finalize(turn_id, outcome, Some(&assembler), on_update)
            .await;
        outcome
    }

    /// Mirror the assembler state onto the turn and persist. Text and cards
    /// move together, so observers never see torn state.
    async fn sync_turn(
        &mut self,
        turn_id: &str,
        assembler: &ResponseAssembler,
        on_update: &mut dyn FnMut(&ConversationTurn),
    ) {
        if let Some(turn) = self.turns.iter_mut().find(|t| t.id == turn_id) {
            turn.content = assembler.text().to_string();
            turn.cards = assembler.cards().cloned();
            on_update(turn);
        }
        self.persist().await;
    }

    async fn finalize(
        &mut self,
        turn_id: &str,
        outcome: StreamOutcome,
        assembler: Option<&ResponseAssembler>,
        on_update: &mut dyn FnMut(&ConversationTurn),
    ) {
        if let Some(turn) = self.turns.iter_mut().find(|t| t.id == turn_id) {
            match outcome {
                StreamOutcome::Completed | StreamOutcome::BackendError => {
                    if let Some(assembler) = assembler {
                        turn.content = assembler.text().to_string();
                        turn.cards = assembler.cards().cloned();
                    }
                }
                StreamOutcome::Cancelled => {
                    // Accumulated text is discarded; applied cards are not
                    // rolled back.
                    turn.content = CANCELLED_MESSAGE.to_string();
                }
                StreamOutcome::Failed => {
                    turn.content = FAILURE_MESSAGE.to_string();
                }
            }
            turn.is_streaming = false;
            on_update(turn);
        }
        self.persist().await;
    }

    /// Persisted after every update, skipped while only the greeting exists.
    async fn persist(&self) {
        if self.turns.len() <= 1 {
            return;
        }
        if let Err(err) = self.store.save_conversation(&self.turns).await {
            error!("failed to persist conversation: {}", err);
        }
    }
}

/// Resolves once the signal is set; never resolves if the sender is gone.
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            futures::future::pending::<()>().await;
        }
    }
}
