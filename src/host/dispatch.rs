use crate::engine::{DiagramEngine, DiagramEvent, ElementRegistry, Mutation, apply_mutation};
use tracing::{trace, warn};

/// Event budget of one drain of the bus: a floor plus a share per element.
const BASE_EVENT_BUDGET: usize = 1_000;
const EVENTS_PER_ELEMENT: usize = 16;

/// A subscriber on the engine's event bus.
///
/// Handlers never touch the engine directly; they describe the changes they
/// want and the dispatcher applies them in order.
pub trait EventHandler: Send {
    fn name(&self) -> &'static str;

    fn handle(&mut self, event: &DiagramEvent, registry: &dyn ElementRegistry) -> Vec<Mutation>;

    /// Called whenever the bus runs dry, for work batched across several events.
    fn settle(&mut self, _registry: &dyn ElementRegistry) -> Vec<Mutation> {
        Vec::new()
    }
}

/// Delivers engine events to handlers in emission order and applies their mutations.
#[derive(Default)]
pub struct Dispatcher {
    handlers: Vec<Box<dyn EventHandler>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handlers see each event in subscription order.
    pub fn subscribe(&mut self, handler: Box<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    pub fn clear(&mut self) {
        self.handlers.clear();
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Drains the bus until it is quiet, including events caused by applied
    /// mutations and by the handlers' settle passes.
    ///
    /// Double-clicks are not for handlers; they are returned for the host to route.
    pub fn pump<E: DiagramEngine>(&mut self, engine: &mut E) -> Vec<DiagramEvent> {
        let mut routed = Vec::new();
        let mut delivered = 0usize;
        let budget = BASE_EVENT_BUDGET + EVENTS_PER_ELEMENT * engine.elements().len();

        loop {
            let Some(event) = engine.next_event() else {
                if self.settle(engine) {
                    continue;
                }
                break;
            };
            delivered += 1;
            if delivered > budget {
                warn!(delivered, budget, "Event cascade did not settle, dropping the rest");
                while engine.next_event().is_some() {}
                break;
            }
            if matches!(event, DiagramEvent::ElementDoubleClick { .. }) {
                routed.push(event);
                continue;
            }

            trace!(?event, "Dispatching");
            for handler in self.handlers.iter_mut() {
                let mutations = handler.handle(&event, &*engine);
                apply_all(engine, handler.name(), mutations);
            }
        }
        routed
    }

    /// Runs every handler's settle pass; reports whether any produced work.
    fn settle<E: DiagramEngine>(&mut self, engine: &mut E) -> bool {
        let mut produced = false;
        for handler in self.handlers.iter_mut() {
            let mutations = handler.settle(&*engine);
            produced |= !mutations.is_empty();
            apply_all(engine, handler.name(), mutations);
        }
        produced
    }
}

fn apply_all<E: DiagramEngine>(engine: &mut E, handler: &str, mutations: Vec<Mutation>) {
    for mutation in mutations {
        if let Err(e) = apply_mutation(engine, mutation) {
            warn!(handler, error = %e, "Dropping mutation");
        }
    }
}
