//! Capability interfaces of the embedded diagram engine.
//!
//! The authoring layer never renders or hit-tests anything itself. It talks to
//! the engine through the traits below: an element registry, a modeling
//! (mutation) API, an event bus, an overlay layer, tool providers, viewport
//! control and serialization. `MemoryEngine` is a complete in-process
//! implementation used by tests and headless tooling.

use crate::error::EngineError;
use crate::model::{AttributePatch, Bounds, Element, ElementId, ElementKind, Point};
use crate::vocabulary::{ContextAction, PaletteEntry, VocabularyRestrictor};
use async_trait::async_trait;

pub mod memory;
mod xml;

pub use memory::{MemoryEngine, MemoryEngineFactory};

/// Notifications emitted by the engine, delivered in emission order.
#[derive(Debug, Clone, PartialEq)]
pub enum DiagramEvent {
    /// A shape was created from the palette or context pad.
    ShapeAdded { id: ElementId, kind: ElementKind },
    /// A sequence flow was created with the connect tool.
    ConnectionCreated { id: ElementId },
    /// Attributes or bounds of an element changed.
    ElementChanged { id: ElementId },
    /// Elements were deleted; includes flows removed with their endpoint.
    ElementsRemoved { ids: Vec<ElementId> },
    /// A diagram finished loading and replaced the whole graph.
    ImportDone,
    ElementDoubleClick { id: ElementId },
}

/// A single change to apply through the engine, produced by event handlers
/// and property panels.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    UpdateProperties { id: ElementId, patch: AttributePatch },
    ResizeShape { id: ElementId, bounds: Bounds },
    ClearOverlays,
    AddOverlay(Overlay),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayKind {
    StepBadge,
}

/// A decoration positioned relative to an element's top-left corner.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub element: ElementId,
    pub kind: OverlayKind,
    pub left: f64,
    pub top: f64,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Zoom {
    /// Fit the whole diagram into the container.
    Fit,
    /// Change the zoom level by a relative step (positive zooms in).
    By(f64),
}

/// The page element the engine renders into.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerHandle {
    pub id: String,
    pub width: f64,
    pub height: f64,
}

impl ContainerHandle {
    pub fn new(id: impl Into<String>, width: f64, height: f64) -> Self {
        Self {
            id: id.into(),
            width,
            height,
        }
    }
}

pub trait ElementRegistry {
    fn get(&self, id: &ElementId) -> Option<&Element>;

    /// All elements in the engine's native registry order.
    fn elements(&self) -> Vec<&Element>;

    fn elements_of_kind(&self, kind: ElementKind) -> Vec<&Element> {
        self.elements()
            .into_iter()
            .filter(|element| element.kind == kind)
            .collect()
    }
}

/// Command API. Every successful call emits the matching `DiagramEvent`.
pub trait Modeling {
    fn create_shape(&mut self, kind: ElementKind, at: Point) -> Result<ElementId, EngineError>;

    fn connect(&mut self, source: &ElementId, target: &ElementId)
    -> Result<ElementId, EngineError>;

    /// Removes an element and every flow attached to it; returns all removed ids.
    fn remove_element(&mut self, id: &ElementId) -> Result<Vec<ElementId>, EngineError>;

    fn update_properties(
        &mut self,
        id: &ElementId,
        patch: &AttributePatch,
    ) -> Result<(), EngineError>;

    fn resize_shape(&mut self, id: &ElementId, bounds: Bounds) -> Result<(), EngineError>;
}

pub trait EventBus {
    /// Queues an event raised by the canvas itself (e.g. a double-click).
    fn emit(&mut self, event: DiagramEvent);

    /// Takes the oldest undelivered event.
    fn next_event(&mut self) -> Option<DiagramEvent>;
}

pub trait OverlayLayer {
    fn add_overlay(&mut self, overlay: Overlay);
    fn clear_overlays(&mut self);
    fn overlays(&self) -> &[Overlay];
}

/// Palette and context-pad entries as shown by the engine.
pub trait ToolProviders {
    fn palette(&self) -> Vec<PaletteEntry>;
    fn context_pad(&self, id: &ElementId) -> Vec<ContextAction>;
}

#[async_trait]
pub trait Viewport {
    /// Applies a zoom and returns the resulting zoom level.
    async fn zoom(&mut self, zoom: Zoom) -> Result<f64, EngineError>;
}

#[async_trait]
pub trait Serialization {
    /// Replaces the whole graph with the parsed content of `xml`.
    ///
    /// Implementations must either fully apply the import or leave the current
    /// graph untouched.
    async fn import_xml(&mut self, xml: &str) -> Result<(), EngineError>;

    async fn save_xml(&self) -> Result<String, EngineError>;
}

/// Every capability the authoring layer consumes.
pub trait DiagramEngine:
    ElementRegistry
    + Modeling
    + EventBus
    + OverlayLayer
    + ToolProviders
    + Viewport
    + Serialization
    + Send
    + Sync
{
}

impl<T> DiagramEngine for T where
    T: ElementRegistry
        + Modeling
        + EventBus
        + OverlayLayer
        + ToolProviders
        + Viewport
        + Serialization
        + Send
        + Sync
{
}

/// What an engine is constructed with.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub container: ContainerHandle,
    pub vocabulary: VocabularyRestrictor,
}

pub trait EngineFactory: Send + Sync {
    type Engine: DiagramEngine;

    fn create(&self, options: EngineOptions) -> Result<Self::Engine, EngineError>;
}

/// Applies one mutation through the engine's command and overlay APIs.
pub fn apply_mutation<E>(engine: &mut E, mutation: Mutation) -> Result<(), EngineError>
where
    E: DiagramEngine + ?Sized,
{
    match mutation {
        Mutation::UpdateProperties { id, patch } => engine.update_properties(&id, &patch),
        Mutation::ResizeShape { id, bounds } => engine.resize_shape(&id, bounds),
        Mutation::ClearOverlays => {
            engine.clear_overlays();
            Ok(())
        }
        Mutation::AddOverlay(overlay) => {
            engine.add_overlay(overlay);
            Ok(())
        }
    }
}
