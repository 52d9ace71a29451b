use tracing::{debug, warn};

use crate::app::{App, Effect, Message, Model, update};
use crate::fetch::{FetchRequest, FetchWorker, index_candidates};

impl App {
    /// A model for a terminal of `size`, with the index and first document
    /// already requested.
    pub fn initial_model(&self, size: (u16, u16)) -> Model {
        let mut model = Model::new(size);
        model.site_label = self.fetcher.describe();
        model.content_root.clone_from(&self.content_root);
        model.outline_levels = self.outline_levels;
        if self.sidebar_hidden {
            model.sidebar_visible = false;
        }
        model
            .config_global_path
            .clone_from(&self.config_global_path);
        model.config_local_path.clone_from(&self.config_local_path);

        let initial = self.initial_route();
        debug!(?initial, site = %self.site, "initial route");
        model.begin(initial, index_candidates(self.index_location.as_deref()));
        model
    }

    /// A background worker fetching from this app's site.
    pub fn worker(&self) -> FetchWorker {
        FetchWorker::new(std::sync::Arc::clone(&self.fetcher))
    }

    /// Hand the effects queued on `model` to the worker and the session.
    pub(super) fn run_effects(&mut self, model: &mut Model, worker: &FetchWorker) {
        for effect in model.take_effects() {
            match effect {
                Effect::Fetch(request) => {
                    log_request(&request);
                    worker.dispatch(request);
                }
                Effect::RememberPath(path) => self.remember(&path),
            }
        }
    }

    /// Run queued effects on the calling thread until none are left.
    ///
    /// Fetch results are applied in request order, which makes the outcome
    /// deterministic for scripted use and tests.
    pub fn settle(&mut self, mut model: Model, worker: &FetchWorker) -> Model {
        loop {
            let effects = model.take_effects();
            if effects.is_empty() {
                return model;
            }
            for effect in effects {
                match effect {
                    Effect::Fetch(request) => {
                        log_request(&request);
                        let outcome = worker.run_blocking(request);
                        model = update(model, Message::FetchCompleted(outcome));
                    }
                    Effect::RememberPath(path) => self.remember(&path),
                }
            }
        }
    }

    fn remember(&mut self, path: &str) {
        let key = self.last_path_key();
        if let Err(err) = self.session.set(&key, path) {
            warn!(%err, "could not save session");
        }
    }

    /// The session store, as last written.
    pub const fn session(&self) -> &crate::session::SessionStore {
        &self.session
    }
}

fn log_request(request: &FetchRequest) {
    match request {
        FetchRequest::Index { candidates } => {
            debug!(candidates = candidates.len(), "fetching directory index");
        }
        FetchRequest::Document { path, location, .. } => {
            debug!(%path, %location, "fetching document");
        }
    }
}
