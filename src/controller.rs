use serde::Serialize;
use std::sync::{Arc, Mutex};

use crate::data_models::{Entitlement, SearchResult};
use crate::error::SessionError;
use crate::gate::{GateDecision, can_search, searches_left};
use crate::session::{ListenerHandle, SessionStore};
use crate::storage::lock;
use crate::synthesizer::{GenerativeBackend, Synthesizer};

/// The only error text users ever see for a failed search.
pub const SEARCH_FAILED_MESSAGE: &str = "Failed to fetch video results. Please try again.";

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchExample {
    pub lang: &'static str,
    pub query: &'static str,
}

pub const SEARCH_EXAMPLES: &[SearchExample] = &[
    SearchExample {
        lang: "Spanish",
        query: "canciones de rock en español",
    },
    SearchExample {
        lang: "Hindi",
        query: "बॉलीवुड नई फिल्म ट्रेलर",
    },
    SearchExample {
        lang: "Japanese",
        query: "面白い猫の動画",
    },
    SearchExample {
        lang: "Arabic",
        query: "كيفية طبخ الكبسة",
    },
    SearchExample {
        lang: "French",
        query: "recettes de croissants faciles",
    },
];

/// Where a search attempt is. Every attempt ends back at `Idle`.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Gating,
    Blocked,
    Running,
    Success,
    Failed,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UpsellPrompt {
    SignInRequired,
    Upgrade { price: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Completed(SearchResult),
    Blocked(UpsellPrompt),
    Failed(String),
    /// Another search from this controller is still running.
    Busy,
    /// Blank query, or the controller was shut down.
    Ignored,
}

/// Snapshot of everything a front-end needs to draw the search page.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchView {
    pub phase: Phase,
    pub query: String,
    pub result: Option<SearchResult>,
    pub error: Option<String>,
    pub free_searches_used: u32,
    pub searches_left: u32,
    pub signed_in: bool,
    pub subscribed: bool,
    pub upsell: Option<UpsellPrompt>,
}

#[derive(Debug)]
struct ControllerState {
    phase: Phase,
    query: String,
    result: Option<SearchResult>,
    error: Option<String>,
    free_searches_used: u32,
    upsell: Option<UpsellPrompt>,
    signed_in: bool,
    /// Bumped on every sign-out so a search that straddles one does not count.
    sign_out_epoch: u64,
    torn_down: bool,
}

impl ControllerState {
    fn transition(&mut self, next: Phase) {
        log::debug!("search phase {:?} -> {:?}", self.phase, next);
        self.phase = next;
    }
}

/// Runs one search at a time: gate, synthesize, then update counters and view state.
pub struct SearchController<B> {
    synthesizer: Synthesizer<B>,
    session: Arc<SessionStore>,
    limit: u32,
    subscription_price: u32,
    state: Arc<Mutex<ControllerState>>,
    _session_listener: ListenerHandle,
}

impl<B: GenerativeBackend> SearchController<B> {
    pub fn new(
        synthesizer: Synthesizer<B>,
        session: Arc<SessionStore>,
        limit: u32,
        subscription_price: u32,
    ) -> Self {
        let state = Arc::new(Mutex::new(ControllerState {
            phase: Phase::Idle,
            query: String::new(),
            result: None,
            error: None,
            free_searches_used: 0,
            upsell: None,
            signed_in: false,
            sign_out_epoch: 0,
            torn_down: false,
        }));

        // signing out is the only thing that resets the free-search counter
        let listener_state = Arc::downgrade(&state);
        let session_listener = session.on_change(move |identity| {
            let Some(state) = listener_state.upgrade() else {
                return;
            };
            let mut state = lock(&state);
            let signed_in = identity.is_some();
            if state.signed_in && !signed_in {
                log::info!("signed out, resetting free search counter");
                state.free_searches_used = 0;
                state.sign_out_epoch += 1;
            }
            state.signed_in = signed_in;
        });

        Self {
            synthesizer,
            session,
            limit,
            subscription_price,
            state,
            _session_listener: session_listener,
        }
    }

    pub fn synthesizer(&self) -> &Synthesizer<B> {
        &self.synthesizer
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub async fn submit(&self, query: &str) -> SearchOutcome {
        let query = query.trim();
        if query.is_empty() {
            return SearchOutcome::Ignored;
        }

        let (entitlement, epoch) = {
            let mut state = lock(&self.state);
            if state.torn_down {
                return SearchOutcome::Ignored;
            }
            if state.phase == Phase::Running {
                log::warn!("search for {query:?} rejected, another search is running");
                return SearchOutcome::Busy;
            }

            state.transition(Phase::Gating);
            let entitlement = self.session.entitlement(state.free_searches_used);

            if can_search(&entitlement, self.limit) == GateDecision::Deny {
                let prompt = if entitlement.signed_in {
                    UpsellPrompt::Upgrade {
                        price: self.subscription_price,
                    }
                } else {
                    UpsellPrompt::SignInRequired
                };
                log::info!(
                    "free search limit of {} reached, showing upsell",
                    self.limit
                );
                state.upsell = Some(prompt);
                state.transition(Phase::Blocked);
                state.transition(Phase::Idle);
                return SearchOutcome::Blocked(prompt);
            }

            state.transition(Phase::Running);
            state.query = query.to_string();
            state.error = None;
            (entitlement, state.sign_out_epoch)
        };

        // resets the phase if this future is dropped before the call returns
        let mut in_flight = InFlight {
            state: &self.state,
            finished: false,
        };
        let outcome = self.synthesizer.run(query).await;
        in_flight.finished = true;

        let mut state = lock(&self.state);
        if state.torn_down {
            log::debug!("dropping search response for {query:?} after shutdown");
            return SearchOutcome::Ignored;
        }

        match outcome {
            Ok(result) => {
                state.transition(Phase::Success);
                state.result = Some(result.clone());
                state.error = None;
                if !entitlement.subscribed && state.sign_out_epoch == epoch {
                    state.free_searches_used += 1;
                }
                state.transition(Phase::Idle);
                SearchOutcome::Completed(result)
            }
            Err(e) => {
                log::error!("search for {query:?} failed: {e:#}");
                state.transition(Phase::Failed);
                state.error = Some(SEARCH_FAILED_MESSAGE.to_string());
                state.result = None;
                state.transition(Phase::Idle);
                SearchOutcome::Failed(SEARCH_FAILED_MESSAGE.to_string())
            }
        }
    }

    pub fn view(&self) -> SearchView {
        let subscribed = self.session.is_subscribed();
        let state = lock(&self.state);
        let entitlement = Entitlement {
            signed_in: state.signed_in,
            subscribed,
            free_searches_used: state.free_searches_used,
        };
        SearchView {
            phase: state.phase,
            query: state.query.clone(),
            result: state.result.clone(),
            error: state.error.clone(),
            free_searches_used: state.free_searches_used,
            searches_left: searches_left(&entitlement, self.limit),
            signed_in: state.signed_in,
            subscribed,
            upsell: state.upsell,
        }
    }

    /// Subscribe from the upsell. Fails (and keeps the upsell open) when nobody is signed in.
    pub fn accept_upsell(&self) -> Result<(), SessionError> {
        self.session.subscribe()?;
        lock(&self.state).upsell = None;
        Ok(())
    }

    pub fn dismiss_upsell(&self) {
        lock(&self.state).upsell = None;
    }

    /// Back to the welcome screen. An in-flight search still lands when it completes.
    pub fn go_home(&self) {
        let mut state = lock(&self.state);
        state.query.clear();
        state.result = None;
        state.error = None;
    }

    /// Stop mutating state. Responses that arrive later are dropped.
    pub fn shutdown(&self) {
        let mut state = lock(&self.state);
        state.torn_down = true;
        state.transition(Phase::Idle);
    }
}

struct InFlight<'a> {
    state: &'a Mutex<ControllerState>,
    finished: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let mut state = lock(self.state);
        if state.phase == Phase::Running {
            log::warn!("search for {:?} was cancelled", state.query);
            state.transition(Phase::Idle);
        }
    }
}
