// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use roster_app::{FetchError, FetchTicket, PageSource, UserRecord, ViewEvent, ViewSession};
use tracing::{debug, warn};

#[derive(Debug)]
struct FetchCompleted {
    seq: u64,
    result: Result<Vec<UserRecord>, FetchError>,
}

/// Runs fetch tickets on background threads against a shared record store
/// and feeds the results back into a [`ViewSession`].
pub struct FetchRuntime<S> {
    source: Arc<Mutex<S>>,
    tx: Sender<FetchCompleted>,
    rx: Receiver<FetchCompleted>,
    timeout: Duration,
}

impl<S: PageSource + Send + 'static> FetchRuntime<S> {
    pub fn new(source: S, timeout: Duration) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            source: Arc::new(Mutex::new(source)),
            tx,
            rx,
            timeout,
        }
    }

    /// Shared handle to the store, for callers that mutate it between pages.
    pub fn source(&self) -> Arc<Mutex<S>> {
        Arc::clone(&self.source)
    }

    pub fn spawn(&self, ticket: &FetchTicket) {
        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        let FetchTicket { seq, options } = ticket.clone();
        thread::spawn(move || {
            let result = match source.lock() {
                Ok(mut store) => store.fetch_page(&options),
                Err(_) => Err(FetchError::NetworkOrServer(
                    "record store lock poisoned".to_owned(),
                )),
            };
            // The receiver is gone once the console exits; nothing to report to.
            let _ = tx.send(FetchCompleted { seq, result });
        });
    }

    /// Spawns every ticket issued in `events`.
    pub fn launch(&self, events: &[ViewEvent]) {
        for event in events {
            if let ViewEvent::FetchIssued(ticket) = event {
                debug!(seq = ticket.seq, "spawning fetch");
                self.spawn(ticket);
            }
        }
    }

    /// Applies whatever results have already arrived.
    pub fn drain(&self, session: &mut ViewSession) -> Vec<ViewEvent> {
        let mut events = Vec::new();
        while let Ok(done) = self.rx.try_recv() {
            events.extend(session.apply_response(done.seq, done.result));
        }
        events
    }

    /// Blocks until the session has nothing in flight. A request that
    /// outlives the timeout is failed; its late result then arrives stale.
    pub fn wait(&self, session: &mut ViewSession) -> Vec<ViewEvent> {
        let mut events = self.drain(session);
        let deadline = Instant::now() + self.timeout;
        while let Some(seq) = session.pending().map(|ticket| ticket.seq) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(done) => events.extend(session.apply_response(done.seq, done.result)),
                Err(RecvTimeoutError::Timeout) => {
                    warn!(seq, timeout_ms = self.timeout.as_millis(), "fetch timed out");
                    let error = FetchError::NetworkOrServer(format!(
                        "timed out after {}ms",
                        self.timeout.as_millis()
                    ));
                    events.extend(session.apply_response(seq, Err(error)));
                }
                Err(RecvTimeoutError::Disconnected) => {
                    let error = FetchError::NetworkOrServer("fetch channel closed".to_owned());
                    events.extend(session.apply_response(seq, Err(error)));
                }
            }
        }
        events
    }

    /// Launches the fetches `events` asked for and waits for them to land.
    pub fn run(&self, session: &mut ViewSession, mut events: Vec<ViewEvent>) -> Vec<ViewEvent> {
        self.launch(&events);
        events.extend(self.wait(session));
        events
    }
}
