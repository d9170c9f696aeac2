use crate::config::Locale;
use crate::engine::{DiagramEvent, ElementRegistry, Mutation};
use crate::host::EventHandler;
use crate::model::{AttributePatch, ElementId, ElementKind};
use tracing::{debug, warn};

/// Maintains the ordinal step number of every task.
///
/// New tasks get `max + 1` over the tasks already numbered, so numbers follow
/// creation order and a gap left by a delete is never filled. After a load, tasks
/// without a number (or with `0`) are back-filled in registry order. Duplicate
/// numbers coming from an imported diagram are left as they are. Once a task
/// holds `u32::MAX` no further number exists, so later tasks stay unnumbered
/// and a warning is logged instead.
pub struct StepNumberAssigner {
    locale: Locale,
}

impl StepNumberAssigner {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    /// Highest committed step number among tasks, ignoring `exclude`.
    pub fn highest_step(registry: &dyn ElementRegistry, exclude: Option<&ElementId>) -> u32 {
        registry
            .elements_of_kind(ElementKind::Task)
            .into_iter()
            .filter(|task| Some(&task.id) != exclude)
            .filter_map(|task| task.attributes.step_number())
            .max()
            .unwrap_or(0)
    }

    /// Numbers a freshly created task and gives it a default name if it has none.
    pub fn assign(&self, id: &ElementId, registry: &dyn ElementRegistry) -> Vec<Mutation> {
        let Some(task) = registry.get(id).filter(|element| element.is_task()) else {
            return Vec::new();
        };
        let highest = Self::highest_step(registry, Some(id));
        let Some(step) = highest.checked_add(1) else {
            warn!(task = %id, highest, "Step numbers exhausted, leaving task unnumbered");
            return Vec::new();
        };
        debug!(task = %id, step, "Assigning step number");

        let mut patch = AttributePatch::new().step_number(step);
        if task.attributes.name().is_none_or(|name| name.trim().is_empty()) {
            patch = patch.name(self.locale.step_name(step));
        }
        vec![Mutation::UpdateProperties {
            id: id.clone(),
            patch,
        }]
    }

    /// Numbers every task whose step number is missing or zero.
    ///
    /// Running it on a fully numbered diagram yields no mutations.
    pub fn backfill(&self, registry: &dyn ElementRegistry) -> Vec<Mutation> {
        let mut highest = Self::highest_step(registry, None);
        let mut mutations = Vec::new();
        for task in registry.elements_of_kind(ElementKind::Task) {
            if task.attributes.step_number().unwrap_or(0) > 0 {
                continue;
            }
            let Some(step) = highest.checked_add(1) else {
                warn!(task = %task.id, highest, "Step numbers exhausted, leaving task unnumbered");
                continue;
            };
            debug!(task = %task.id, step, "Back-filling step number");
            mutations.push(Mutation::UpdateProperties {
                id: task.id.clone(),
                patch: AttributePatch::new().step_number(step),
            });
            highest = step;
        }
        mutations
    }
}

impl EventHandler for StepNumberAssigner {
    fn name(&self) -> &'static str {
        "step-number-assigner"
    }

    fn handle(&mut self, event: &DiagramEvent, registry: &dyn ElementRegistry) -> Vec<Mutation> {
        match event {
            DiagramEvent::ShapeAdded {
                id,
                kind: ElementKind::Task,
            } => self.assign(id, registry),
            DiagramEvent::ImportDone => self.backfill(registry),
            _ => Vec::new(),
        }
    }
}
