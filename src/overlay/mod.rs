use crate::config::OverlayConfig;
use crate::engine::{DiagramEvent, ElementRegistry, Mutation, Overlay, OverlayKind};
use crate::host::EventHandler;
use crate::model::Element;
use std::sync::Arc;
use tracing::debug;

pub mod measure;

pub use measure::{FixedMetricMeasurer, TextExtent, TextMeasurer};

/// Sizes below this are treated as equal, so a pass never fights float noise.
const SIZE_EPSILON: f64 = 0.5;

/// Keeps each task's box and step-number badge consistent with its attributes.
///
/// As an event handler it only records that tasks changed; the full pass runs
/// once when the bus runs dry, however many changes came before it.
pub struct OverlayRenderer {
    config: OverlayConfig,
    measurer: Arc<dyn TextMeasurer>,
    dirty: bool,
}

impl OverlayRenderer {
    pub fn new(config: OverlayConfig, measurer: Arc<dyn TextMeasurer>) -> Self {
        Self {
            config,
            measurer,
            dirty: false,
        }
    }

    /// Whether a pass is pending for the next settle.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The padded, floored box size a task label needs.
    pub fn target_size(&self, label: &str) -> (f64, f64) {
        let extent = self.measurer.measure(label, &self.config.font);
        let width = (extent.width + self.config.padding_x)
            .ceil()
            .max(self.config.min_width);
        let height = (extent.height + self.config.padding_y)
            .ceil()
            .max(self.config.min_height);
        (width, height)
    }

    /// Full pass: clear every badge, then resize and re-badge each task.
    pub fn render(&self, registry: &dyn ElementRegistry) -> Vec<Mutation> {
        let mut mutations = vec![Mutation::ClearOverlays];
        for task in registry
            .elements()
            .into_iter()
            .filter(|element| element.is_task())
        {
            if let Some(resize) = self.resize_for(task) {
                mutations.push(resize);
            }
            if let Some(badge) = self.badge_for(task) {
                mutations.push(Mutation::AddOverlay(badge));
            }
        }
        mutations
    }

    fn resize_for(&self, task: &Element) -> Option<Mutation> {
        let bounds = task.bounds()?;
        let (width, height) = self.target_size(task.attributes.name().unwrap_or_default());
        if (bounds.width - width).abs() < SIZE_EPSILON && (bounds.height - height).abs() < SIZE_EPSILON
        {
            return None;
        }
        debug!(task = %task.id, width, height, "Resizing task to fit its label");
        Some(Mutation::ResizeShape {
            id: task.id.clone(),
            bounds: bounds.resized_around_center(width, height),
        })
    }

    fn badge_for(&self, task: &Element) -> Option<Overlay> {
        let step = task.attributes.step_number().filter(|step| *step > 0)?;
        Some(Overlay {
            element: task.id.clone(),
            kind: OverlayKind::StepBadge,
            left: self.config.badge_offset_x,
            top: self.config.badge_offset_y,
            label: step.to_string(),
        })
    }
}

impl EventHandler for OverlayRenderer {
    fn name(&self) -> &'static str {
        "overlay-renderer"
    }

    fn handle(&mut self, event: &DiagramEvent, registry: &dyn ElementRegistry) -> Vec<Mutation> {
        let affects_tasks = match event {
            DiagramEvent::ImportDone | DiagramEvent::ElementsRemoved { .. } => true,
            DiagramEvent::ElementChanged { id } => {
                registry.get(id).is_some_and(|element| element.is_task())
            }
            _ => false,
        };
        self.dirty |= affects_tasks;
        Vec::new()
    }

    fn settle(&mut self, registry: &dyn ElementRegistry) -> Vec<Mutation> {
        if !std::mem::take(&mut self.dirty) {
            return Vec::new();
        }
        self.render(registry)
    }
}
