use super::xml::{self, DEFAULT_PROCESS_ID};
use super::{
    ContainerHandle, DiagramEvent, ElementRegistry, EngineFactory, EngineOptions, EventBus,
    Modeling, Overlay, OverlayLayer, Serialization, ToolProviders, Viewport, Zoom,
};
use crate::error::EngineError;
use crate::model::{AttributePatch, Bounds, Element, ElementId, ElementKind, Geometry, Point};
use crate::vocabulary::{ContextAction, PaletteEntry, VocabularyRestrictor};
use ahash::AHashMap;
use async_trait::async_trait;
use std::collections::VecDeque;

const MIN_ZOOM: f64 = 0.2;
const MAX_ZOOM: f64 = 4.0;
const FIT_MARGIN: f64 = 40.0;

/// An in-process diagram engine holding the graph in an ordered registry.
pub struct MemoryEngine {
    container: ContainerHandle,
    vocabulary: VocabularyRestrictor,
    process_id: String,
    order: Vec<ElementId>,
    elements: AHashMap<ElementId, Element>,
    events: VecDeque<DiagramEvent>,
    overlays: Vec<Overlay>,
    zoom_level: f64,
    next_id: u64,
}

impl MemoryEngine {
    pub fn new(options: EngineOptions) -> Self {
        Self {
            container: options.container,
            vocabulary: options.vocabulary,
            process_id: DEFAULT_PROCESS_ID.to_string(),
            order: Vec::new(),
            elements: AHashMap::new(),
            events: VecDeque::new(),
            overlays: Vec::new(),
            zoom_level: 1.0,
            next_id: 1,
        }
    }

    pub fn zoom_level(&self) -> f64 {
        self.zoom_level
    }

    pub fn container(&self) -> &ContainerHandle {
        &self.container
    }

    fn generate_id(&mut self, kind: ElementKind) -> ElementId {
        loop {
            let candidate = ElementId::new(format!("{}_{}", kind.id_prefix(), self.next_id));
            self.next_id += 1;
            if !self.elements.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    fn insert(&mut self, element: Element) {
        self.order.push(element.id.clone());
        self.elements.insert(element.id.clone(), element);
    }

    fn element_mut(&mut self, id: &ElementId) -> Result<&mut Element, EngineError> {
        self.elements
            .get_mut(id)
            .ok_or_else(|| EngineError::UnknownElement(id.to_string()))
    }

    /// Union of all shape bounds, if there are any shapes.
    fn content_bounds(&self) -> Option<Bounds> {
        let mut all = self.elements.values().filter_map(Element::bounds);
        let first = all.next()?;
        let (mut min_x, mut min_y) = (first.x, first.y);
        let (mut max_x, mut max_y) = (first.x + first.width, first.y + first.height);
        for bounds in all {
            min_x = min_x.min(bounds.x);
            min_y = min_y.min(bounds.y);
            max_x = max_x.max(bounds.x + bounds.width);
            max_y = max_y.max(bounds.y + bounds.height);
        }
        Some(Bounds {
            x: min_x,
            y: min_y,
            width: max_x - min_x,
            height: max_y - min_y,
        })
    }
}

impl ElementRegistry for MemoryEngine {
    fn get(&self, id: &ElementId) -> Option<&Element> {
        self.elements.get(id)
    }

    fn elements(&self) -> Vec<&Element> {
        self.order
            .iter()
            .filter_map(|id| self.elements.get(id))
            .collect()
    }
}

impl Modeling for MemoryEngine {
    fn create_shape(&mut self, kind: ElementKind, at: Point) -> Result<ElementId, EngineError> {
        if !kind.is_shape() {
            return Err(EngineError::InvalidShape(kind.to_string()));
        }
        let id = self.generate_id(kind);
        let (width, height) = kind.default_size();
        self.insert(Element::shape(
            id.clone(),
            kind,
            Bounds::centered_at(at, width, height),
        ));
        self.events.push_back(DiagramEvent::ShapeAdded {
            id: id.clone(),
            kind,
        });
        Ok(id)
    }

    fn connect(
        &mut self,
        source: &ElementId,
        target: &ElementId,
    ) -> Result<ElementId, EngineError> {
        let source_element = self
            .elements
            .get(source)
            .ok_or_else(|| EngineError::UnknownElement(source.to_string()))?;
        let target_element = self
            .elements
            .get(target)
            .ok_or_else(|| EngineError::UnknownElement(target.to_string()))?;
        self.vocabulary
            .check_connection(source_element, target_element)
            .map_err(|reason| EngineError::InvalidConnection {
                source_id: source.to_string(),
                target_id: target.to_string(),
                reason,
            })?;

        let id = self.generate_id(ElementKind::SequenceFlow);
        self.insert(Element::connection(id.clone(), source.clone(), target.clone()));
        self.events
            .push_back(DiagramEvent::ConnectionCreated { id: id.clone() });
        Ok(id)
    }

    fn remove_element(&mut self, id: &ElementId) -> Result<Vec<ElementId>, EngineError> {
        if !self.elements.contains_key(id) {
            return Err(EngineError::UnknownElement(id.to_string()));
        }
        let removed: Vec<ElementId> = self
            .order
            .iter()
            .filter(|candidate| {
                *candidate == id
                    || self
                        .elements
                        .get(*candidate)
                        .is_some_and(|element| element.touches(id))
            })
            .cloned()
            .collect();

        self.order.retain(|candidate| !removed.contains(candidate));
        for gone in &removed {
            self.elements.remove(gone);
        }
        self.overlays
            .retain(|overlay| !removed.contains(&overlay.element));
        self.events.push_back(DiagramEvent::ElementsRemoved {
            ids: removed.clone(),
        });
        Ok(removed)
    }

    fn update_properties(
        &mut self,
        id: &ElementId,
        patch: &AttributePatch,
    ) -> Result<(), EngineError> {
        self.element_mut(id)?.attributes.merge(patch);
        self.events
            .push_back(DiagramEvent::ElementChanged { id: id.clone() });
        Ok(())
    }

    fn resize_shape(&mut self, id: &ElementId, bounds: Bounds) -> Result<(), EngineError> {
        let element = self.element_mut(id)?;
        match &mut element.geometry {
            Geometry::Shape { bounds: current } => *current = bounds,
            Geometry::Connection { .. } => {
                return Err(EngineError::InvalidShape(id.to_string()));
            }
        }
        self.events
            .push_back(DiagramEvent::ElementChanged { id: id.clone() });
        Ok(())
    }
}

impl EventBus for MemoryEngine {
    fn emit(&mut self, event: DiagramEvent) {
        self.events.push_back(event);
    }

    fn next_event(&mut self) -> Option<DiagramEvent> {
        self.events.pop_front()
    }
}

impl OverlayLayer for MemoryEngine {
    fn add_overlay(&mut self, overlay: Overlay) {
        self.overlays.push(overlay);
    }

    fn clear_overlays(&mut self) {
        self.overlays.clear();
    }

    fn overlays(&self) -> &[Overlay] {
        &self.overlays
    }
}

impl ToolProviders for MemoryEngine {
    fn palette(&self) -> Vec<PaletteEntry> {
        self.vocabulary.palette()
    }

    fn context_pad(&self, id: &ElementId) -> Vec<ContextAction> {
        self.elements
            .get(id)
            .map(|element| self.vocabulary.context_actions(element.kind))
            .unwrap_or_default()
    }
}

#[async_trait]
impl Viewport for MemoryEngine {
    async fn zoom(&mut self, zoom: Zoom) -> Result<f64, EngineError> {
        if self.container.width <= 0.0 || self.container.height <= 0.0 {
            return Err(EngineError::Viewport(format!(
                "container '{}' has no size",
                self.container.id
            )));
        }
        self.zoom_level = match zoom {
            Zoom::Fit => match self.content_bounds() {
                Some(content) if content.width > 0.0 && content.height > 0.0 => {
                    let fit_x = self.container.width / (content.width + 2.0 * FIT_MARGIN);
                    let fit_y = self.container.height / (content.height + 2.0 * FIT_MARGIN);
                    fit_x.min(fit_y).min(1.0)
                }
                _ => 1.0,
            },
            Zoom::By(step) => self.zoom_level + step,
        }
        .clamp(MIN_ZOOM, MAX_ZOOM);
        Ok(self.zoom_level)
    }
}

#[async_trait]
impl Serialization for MemoryEngine {
    async fn import_xml(&mut self, xml: &str) -> Result<(), EngineError> {
        let parsed = xml::read_diagram(xml)?;

        self.process_id = parsed.process_id;
        self.order.clear();
        self.elements.clear();
        self.overlays.clear();
        // Events about the replaced graph must not reach handlers.
        self.events.clear();
        for element in parsed.elements {
            self.insert(element);
        }
        self.events.push_back(DiagramEvent::ImportDone);
        Ok(())
    }

    async fn save_xml(&self) -> Result<String, EngineError> {
        xml::write_diagram(&self.process_id, &self.elements())
    }
}

/// Builds `MemoryEngine`s; never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryEngineFactory;

impl EngineFactory for MemoryEngineFactory {
    type Engine = MemoryEngine;

    fn create(&self, options: EngineOptions) -> Result<Self::Engine, EngineError> {
        Ok(MemoryEngine::new(options))
    }
}
