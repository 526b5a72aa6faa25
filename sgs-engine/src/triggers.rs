use std::cmp::Reverse;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use get_size::GetSize;
use tracing::{debug, error};

use crate::events::{EventData, TriggerEvent};
use crate::game_rule::GameRule;
use crate::gameplay::{Game, PlayerId, TriggerResult};

pub const GAME_RULE: &str = "game_rule";

/// A rule or skill reacting to events.
///
/// `trigger` returns `Ok(true)` to veto the event: no lower priority handler
/// sees it. Returning an `Err` unwinds every dispatch level up to the turn driver.
pub trait TriggerHandler: Debug + Send + Sync {
    fn name(&self) -> &str;
    fn events(&self) -> &[TriggerEvent];
    fn priority(&self) -> i32 {
        0
    }
    fn triggerable(&self, _game: &Game, _player: Option<PlayerId>) -> bool {
        true
    }
    fn trigger(
        &self,
        event: TriggerEvent,
        game: &mut Game,
        player: Option<PlayerId>,
        data: &mut EventData,
    ) -> TriggerResult;
}

#[derive(Debug, Clone)]
struct Registered {
    handler: Arc<dyn TriggerHandler>,
    order: usize,
}

/// Handlers per event, highest priority first, ties in registration order.
#[derive(Debug, Clone, Default)]
pub struct TriggerRegistry {
    by_event: HashMap<TriggerEvent, Vec<Registered>>,
    names: HashMap<String, Registered>,
    next_order: usize,
}

impl TriggerRegistry {
    pub fn new() -> Self {
        TriggerRegistry::default()
    }

    pub fn register(&mut self, handler: impl TriggerHandler + 'static) -> bool {
        self.register_arc(Arc::new(handler))
    }

    /// Names are unique, a second handler with the same name is ignored.
    pub fn register_arc(&mut self, handler: Arc<dyn TriggerHandler>) -> bool {
        let name = handler.name().to_string();
        if self.names.contains_key(&name) {
            debug!("handler already registered: {name}");
            return false;
        }

        let registered = Registered {
            handler,
            order: self.next_order,
        };
        self.next_order += 1;

        for event in registered.handler.events() {
            let handlers = self.by_event.entry(*event).or_default();
            if handlers.iter().any(|r| r.order == registered.order) {
                continue;
            }
            handlers.push(registered.clone());
            handlers.sort_by_key(|r| (Reverse(r.handler.priority()), r.order));
        }
        self.names.insert(name, registered);
        true
    }

    pub fn unregister(&mut self, name: &str) -> Option<Arc<dyn TriggerHandler>> {
        let registered = self.names.remove(name)?;
        for handlers in self.by_event.values_mut() {
            handlers.retain(|r| r.order != registered.order);
        }
        Some(registered.handler)
    }

    /// Replaces the handler called `name`, the replacement usually defers to it.
    pub fn supersede(&mut self, name: &str, handler: impl TriggerHandler + 'static) -> bool {
        self.unregister(name);
        self.register(handler)
    }

    pub fn handler(&self, name: &str) -> Option<Arc<dyn TriggerHandler>> {
        self.names.get(name).map(|r| r.handler.clone())
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    pub fn handlers_for(&self, event: TriggerEvent) -> Vec<Arc<dyn TriggerHandler>> {
        self.by_event
            .get(&event)
            .map(|handlers| handlers.iter().map(|r| r.handler.clone()).collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, GetSize)]
pub struct EventSpan {
    pub event_stack: Vec<TriggerEvent>,
}

impl EventSpan {
    pub fn new() -> Self {
        Self {
            event_stack: Vec::new(),
        }
    }

    pub fn open_event_span(&mut self, event: TriggerEvent) {
        self.event_stack.push(event);
    }
    pub fn close_event_span(&mut self, event: TriggerEvent) {
        assert_eq!(self.current_event(), Some(event));
        self.event_stack.pop();
    }

    pub fn current_event(&self) -> Option<TriggerEvent> {
        self.event_stack.last().copied()
    }
    pub fn depth(&self) -> usize {
        self.event_stack.len()
    }
    pub fn is_within(&self, event: TriggerEvent) -> bool {
        self.event_stack.contains(&event)
    }
}

impl Game {
    /// Runs every handler registered for `event`, returns whether it was vetoed.
    pub fn trigger(
        &mut self,
        event: TriggerEvent,
        player: Option<PlayerId>,
        data: &mut EventData,
    ) -> TriggerResult {
        if data.kind() != event.payload_kind() {
            error!(
                "payload mismatch - event: {event:?} - expected: {:?} - found: {:?}",
                event.payload_kind(),
                data.kind()
            );
            panic!("payload mismatch");
        }

        // handlers can register others, work on a snapshot
        let handlers = self.triggers.handlers_for(event);

        self.state.event_span.open_event_span(event);
        let result = self.run_handlers(event, player, data, &handlers);
        self.state.event_span.close_event_span(event);

        result
    }

    fn run_handlers(
        &mut self,
        event: TriggerEvent,
        player: Option<PlayerId>,
        data: &mut EventData,
        handlers: &[Arc<dyn TriggerHandler>],
    ) -> TriggerResult {
        for handler in handlers {
            if !handler.triggerable(self, player) {
                continue;
            }
            debug!(
                "TRIGGER = {event:?} - {} - {player:?} - depth {}",
                handler.name(),
                self.state.event_span.depth()
            );
            if handler.trigger(event, self, player, data)? {
                debug!("VETO = {event:?} - {}", handler.name());
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Same event for several players in order, stops at the first veto.
    pub fn trigger_each(
        &mut self,
        event: TriggerEvent,
        players: &[PlayerId],
        data: &mut EventData,
    ) -> TriggerResult {
        for player in players {
            if self.trigger(event, Some(*player), data)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Calls the base rule directly, even when a mode replaced it.
    pub fn trigger_game_rule(
        &mut self,
        event: TriggerEvent,
        player: Option<PlayerId>,
        data: &mut EventData,
    ) -> TriggerResult {
        GameRule::new().trigger(event, self, player, data)
    }
}
