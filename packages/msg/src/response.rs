//! Event accumulation for handler responses.

use cosmwasm_std::{Event, Response};

/// Collects typed events while a handler runs and folds them into the
/// final [Response].
pub struct ResponseBuilder {
    events: Vec<Event>,
    mute_events: bool,
}

impl ResponseBuilder {
    /// Standard event-emitting builder.
    pub fn new() -> Self {
        ResponseBuilder {
            events: Vec::new(),
            mute_events: false,
        }
    }

    /// A builder that drops all events, for replay and simulation paths.
    pub fn new_mute_events() -> Self {
        ResponseBuilder {
            events: Vec::new(),
            mute_events: true,
        }
    }

    /// Record a typed event.
    pub fn add_event(&mut self, event: impl Into<Event>) {
        if !self.mute_events {
            self.events.push(event.into());
        }
    }

    /// Events accumulated so far.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Finalize into a [Response].
    pub fn into_response(self) -> Response {
        let mut resp = Response::new();
        for event in self.events {
            resp = resp.add_event(event);
        }
        resp
    }
}

impl Default for ResponseBuilder {
    fn default() -> Self {
        Self::new()
    }
}
