//! Ownership of the embedded engine and the facade used by the surrounding page.

use crate::config::DesignerConfig;
use crate::editor::{EditingSession, FlowValues, PropertyEditor, TaskValues};
use crate::engine::{
    ContainerHandle, DiagramEvent, ElementRegistry, EngineFactory, EngineOptions, EventBus,
    Modeling, Overlay, OverlayLayer, Serialization, ToolProviders, Viewport, Zoom,
    apply_mutation,
};
use crate::error::DesignerError;
use crate::model::{Element, ElementId, ElementKind, Point, Policy, PolicyCatalog};
use crate::numbering::StepNumberAssigner;
use crate::overlay::{FixedMetricMeasurer, OverlayRenderer, TextMeasurer};
use crate::vocabulary::{ConnectionDefaults, ContextAction, PaletteEntry, VocabularyRestrictor};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, MutexGuard, PoisonError};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

mod dispatch;
mod template;

pub use dispatch::{Dispatcher, EventHandler};
pub use template::EMPTY_DIAGRAM;

/// Lifecycle of a `DiagramHost`.
///
/// `Uninitialized -> Loading -> Ready <-> Loading -> Disposed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostState {
    Uninitialized,
    Loading,
    Ready,
    Disposed,
}

/// A user action on the canvas.
#[derive(Debug, Clone, PartialEq)]
pub enum Gesture {
    /// Drop a palette item at a canvas position.
    CreateShape { kind: ElementKind, at: Point },
    /// Draw a sequence flow with the connect tool.
    Connect { source: ElementId, target: ElementId },
    Remove { id: ElementId },
    DoubleClick { id: ElementId },
}

/// Everything that only exists while an engine is alive.
struct Session<E> {
    engine: E,
    dispatcher: Dispatcher,
    editing: Option<EditingSession>,
}

impl<E: crate::engine::DiagramEngine> Session<E> {
    /// Drains the bus and routes double-clicks to the property editor.
    fn pump(&mut self, editor: &PropertyEditor) {
        for event in self.dispatcher.pump(&mut self.engine) {
            let DiagramEvent::ElementDoubleClick { id } = event else {
                continue;
            };
            let Some(element) = self.engine.get(&id) else {
                continue;
            };
            match editor.open_for(element, &self.engine) {
                Some(session) => {
                    debug!(element = %id, "Opening property panel");
                    self.editing = Some(session);
                }
                None => debug!(element = %id, kind = %element.kind, "No property panel for element"),
            }
        }
    }

    fn dispose(mut self) {
        self.dispatcher.clear();
        self.engine.clear_overlays();
        while self.engine.next_event().is_some() {}
    }
}

pub struct DiagramHostBuilder<F: EngineFactory> {
    factory: F,
    config: DesignerConfig,
    policies: Vec<Policy>,
    measurer: Arc<dyn TextMeasurer>,
}

impl<F: EngineFactory> DiagramHostBuilder<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            config: DesignerConfig::default(),
            policies: Vec::new(),
            measurer: Arc::new(FixedMetricMeasurer::default()),
        }
    }

    pub fn with_config(mut self, config: DesignerConfig) -> Self {
        self.config = config;
        self
    }

    /// Policies offered by the task panel's selection control.
    pub fn with_policies(mut self, policies: Vec<Policy>) -> Self {
        self.policies = policies;
        self
    }

    pub fn with_measurer(mut self, measurer: impl TextMeasurer + 'static) -> Self {
        self.measurer = Arc::new(measurer);
        self
    }

    pub fn build(self) -> DiagramHost<F> {
        let editor = PropertyEditor::new(self.config.locale, PolicyCatalog::new(self.policies));
        DiagramHost {
            factory: self.factory,
            config: self.config,
            vocabulary: VocabularyRestrictor::new(),
            editor,
            measurer: self.measurer,
            state: std::sync::Mutex::new(HostState::Uninitialized),
            initialized: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
            session: Mutex::new(None),
        }
    }
}

/// Owns one diagram engine instance and bridges it to the rest of the page.
///
/// Loads (`initialize`, `import_diagram`) are serialized through a FIFO lock, so
/// an import issued while another load is in flight waits for it to finish.
/// Synchronous operations never wait: they fail with `DesignerError::Busy`
/// while a load holds the engine.
pub struct DiagramHost<F: EngineFactory> {
    factory: F,
    config: DesignerConfig,
    vocabulary: VocabularyRestrictor,
    editor: PropertyEditor,
    measurer: Arc<dyn TextMeasurer>,
    state: std::sync::Mutex<HostState>,
    initialized: AtomicBool,
    disposed: AtomicBool,
    session: Mutex<Option<Session<F::Engine>>>,
}

impl<F: EngineFactory> DiagramHost<F> {
    pub fn builder(factory: F) -> DiagramHostBuilder<F> {
        DiagramHostBuilder::new(factory)
    }

    pub fn config(&self) -> &DesignerConfig {
        &self.config
    }

    pub fn policies(&self) -> &PolicyCatalog {
        self.editor.catalog()
    }

    pub fn editor(&self) -> &PropertyEditor {
        &self.editor
    }

    pub fn state(&self) -> HostState {
        *self.lock_state()
    }

    fn lock_state(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: HostState) {
        let mut current = self.lock_state();
        if *current != HostState::Disposed {
            debug!(from = ?*current, to = ?state, "Host state change");
            *current = state;
        }
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Handlers subscribed to every new engine, in delivery order.
    fn subscriptions(&self) -> Dispatcher {
        let mut dispatcher = Dispatcher::new();
        dispatcher.subscribe(Box::new(ConnectionDefaults::new(self.config.locale)));
        dispatcher.subscribe(Box::new(StepNumberAssigner::new(self.config.locale)));
        dispatcher.subscribe(Box::new(OverlayRenderer::new(
            self.config.overlay.clone(),
            Arc::clone(&self.measurer),
        )));
        dispatcher
    }

    /// Constructs the engine in `container`, loads `initial_diagram` (or the
    /// empty template), fits the viewport and back-fills step numbers.
    #[instrument(skip_all, fields(container = %container.id))]
    pub async fn initialize(
        &self,
        container: ContainerHandle,
        initial_diagram: Option<&str>,
    ) -> Result<(), DesignerError> {
        {
            let mut state = self.lock_state();
            match *state {
                HostState::Uninitialized => *state = HostState::Loading,
                HostState::Disposed => return Err(DesignerError::Disposed),
                HostState::Loading | HostState::Ready => {
                    return Err(DesignerError::AlreadyInitialized);
                }
            }
        }

        let mut slot = self.session.lock().await;
        let mut engine = match self.factory.create(EngineOptions {
            container,
            vocabulary: self.vocabulary,
        }) {
            Ok(engine) => engine,
            Err(e) => {
                self.set_state(HostState::Uninitialized);
                return Err(DesignerError::EngineCreationFailed(e.to_string()));
            }
        };

        if let Err(e) = engine
            .import_xml(initial_diagram.unwrap_or(EMPTY_DIAGRAM))
            .await
        {
            self.set_state(HostState::Uninitialized);
            return Err(DesignerError::ImportFailed(e.to_string()));
        }

        let mut session = Session {
            engine,
            dispatcher: self.subscriptions(),
            editing: None,
        };
        self.after_load(&mut session).await;
        *slot = Some(session);
        self.initialized.store(true, Ordering::SeqCst);
        self.finish_load(&mut slot);
        info!("Diagram host ready");
        Ok(())
    }

    /// Serializes the current graph.
    #[instrument(skip_all)]
    pub async fn export_diagram(&self) -> Result<String, DesignerError> {
        if self.is_disposed() {
            return Err(DesignerError::Disposed);
        }
        if !self.initialized.load(Ordering::SeqCst) {
            return Err(DesignerError::NotInitialized);
        }
        let slot = self.session.lock().await;
        let session = slot.as_ref().ok_or(DesignerError::Disposed)?;
        session
            .engine
            .save_xml()
            .await
            .map_err(|e| DesignerError::SerializationFailed(e.to_string()))
    }

    /// Replaces the current graph with `xml`, then re-fits and back-fills.
    ///
    /// Waits behind any load already in flight. On failure the engine's
    /// previous graph is kept.
    #[instrument(skip_all, fields(len = xml.len()))]
    pub async fn import_diagram(&self, xml: &str) -> Result<(), DesignerError> {
        match self.state() {
            HostState::Disposed => return Err(DesignerError::Disposed),
            HostState::Uninitialized => return Err(DesignerError::NotInitialized),
            HostState::Loading | HostState::Ready => {}
        }

        let mut slot = self.session.lock().await;
        if self.is_disposed() {
            return Err(DesignerError::Disposed);
        }
        let Some(session) = slot.as_mut() else {
            return Err(DesignerError::NotInitialized);
        };

        self.set_state(HostState::Loading);
        session.editing = None;
        if let Err(e) = session.engine.import_xml(xml).await {
            warn!(error = %e, "Import rejected, keeping the current diagram");
            self.finish_load(&mut slot);
            return Err(DesignerError::ImportFailed(e.to_string()));
        }
        self.after_load(session).await;
        self.finish_load(&mut slot);
        info!("Diagram imported");
        Ok(())
    }

    /// Best-effort zoom. Returns the new zoom level, or `None` if the engine
    /// could not adjust the viewport.
    pub async fn zoom(&self, zoom: Zoom) -> Result<Option<f64>, DesignerError> {
        if self.is_disposed() {
            return Err(DesignerError::Disposed);
        }
        if !self.initialized.load(Ordering::SeqCst) {
            return Err(DesignerError::NotInitialized);
        }
        let mut slot = self.session.lock().await;
        let session = slot.as_mut().ok_or(DesignerError::Disposed)?;
        Ok(Self::adjust_viewport(&mut session.engine, zoom).await)
    }

    async fn adjust_viewport(engine: &mut F::Engine, zoom: Zoom) -> Option<f64> {
        match engine.zoom(zoom).await {
            Ok(level) => Some(level),
            Err(e) => {
                let error = DesignerError::ViewportAdjustmentFailed(e.to_string());
                warn!(%error, "Ignoring viewport failure");
                None
            }
        }
    }

    async fn after_load(&self, session: &mut Session<F::Engine>) {
        if self.config.fit_viewport_on_load {
            Self::adjust_viewport(&mut session.engine, Zoom::Fit).await;
        }
        session.pump(&self.editor);
    }

    /// Leaves `Loading`, or completes a teardown requested while loading.
    fn finish_load(&self, slot: &mut Option<Session<F::Engine>>) {
        if self.is_disposed() {
            if let Some(session) = slot.take() {
                session.dispose();
            }
            return;
        }
        self.set_state(HostState::Ready);
    }

    /// Disposes the engine and detaches all subscriptions. Idempotent.
    ///
    /// A load in flight is not cancelled; the engine is dropped once it settles.
    pub fn teardown(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        *self.lock_state() = HostState::Disposed;
        if let Ok(mut slot) = self.session.try_lock() {
            if let Some(session) = slot.take() {
                session.dispose();
            }
        }
        info!("Diagram host torn down");
    }

    /// Runs `op` against the live session, refusing while a load is in flight.
    fn with_session<R>(
        &self,
        op: impl FnOnce(&mut Session<F::Engine>, &Self) -> Result<R, DesignerError>,
    ) -> Result<R, DesignerError> {
        match self.state() {
            HostState::Disposed => return Err(DesignerError::Disposed),
            HostState::Uninitialized => return Err(DesignerError::NotInitialized),
            HostState::Loading => return Err(DesignerError::Busy),
            HostState::Ready => {}
        }
        let mut slot = self.session.try_lock().map_err(|_| DesignerError::Busy)?;
        let session = slot.as_mut().ok_or(DesignerError::NotInitialized)?;
        op(session, self)
    }

    /// Applies a canvas gesture. Returns the id of a created shape or flow.
    pub fn perform(&self, gesture: Gesture) -> Result<Option<ElementId>, DesignerError> {
        self.with_session(|session, host| {
            let rejected = |e: crate::error::EngineError| DesignerError::GestureRejected(e.to_string());
            let created = match gesture {
                Gesture::CreateShape { kind, at } => {
                    if !host.vocabulary.allows_creation(kind) {
                        return Err(DesignerError::GestureRejected(format!(
                            "'{}' is not offered by the palette",
                            kind
                        )));
                    }
                    Some(session.engine.create_shape(kind, at).map_err(rejected)?)
                }
                Gesture::Connect { source, target } => {
                    Some(session.engine.connect(&source, &target).map_err(rejected)?)
                }
                Gesture::Remove { id } => {
                    let removed = session.engine.remove_element(&id).map_err(rejected)?;
                    if session
                        .editing
                        .as_ref()
                        .is_some_and(|editing| removed.contains(editing.element()))
                    {
                        session.editing = None;
                    }
                    None
                }
                Gesture::DoubleClick { id } => {
                    if session.engine.get(&id).is_none() {
                        return Err(DesignerError::GestureRejected(format!(
                            "element '{}' does not exist",
                            id
                        )));
                    }
                    session.engine.emit(DiagramEvent::ElementDoubleClick { id });
                    None
                }
            };
            session.pump(&host.editor);
            Ok(created)
        })
    }

    /// The panel currently open, if any.
    pub fn editing_session(&self) -> Result<Option<EditingSession>, DesignerError> {
        self.with_session(|session, _| Ok(session.editing.clone()))
    }

    /// Writes the task panel's values to the task and closes the panel.
    ///
    /// Validation is enforced here, not merely shown next to the form: an
    /// empty name or a step number outside `1..=u32::MAX` returns
    /// [`DesignerError::InvalidTaskValues`] and leaves both the panel and the
    /// model untouched. A UI that wants to accept such input anyway has to
    /// correct it before committing.
    pub fn commit_task(&self, values: TaskValues) -> Result<(), DesignerError> {
        self.with_session(|session, host| {
            let panel = match &session.editing {
                Some(EditingSession::Task(panel)) => panel,
                Some(EditingSession::Flow(_)) => return Err(DesignerError::SessionMismatch),
                None => return Err(DesignerError::NoActiveSession),
            };
            let issues = values.validate();
            let mutation = host
                .editor
                .commit_task(panel, &values)
                .ok_or(DesignerError::InvalidTaskValues(issues))?;
            apply_mutation(&mut session.engine, mutation)
                .map_err(|e| DesignerError::GestureRejected(e.to_string()))?;
            session.editing = None;
            session.pump(&host.editor);
            Ok(())
        })
    }

    /// Writes the flow panel's action (and its label) and closes the panel.
    pub fn commit_flow(&self, values: FlowValues) -> Result<(), DesignerError> {
        self.with_session(|session, host| {
            let panel = match &session.editing {
                Some(EditingSession::Flow(panel)) => panel,
                Some(EditingSession::Task(_)) => return Err(DesignerError::SessionMismatch),
                None => return Err(DesignerError::NoActiveSession),
            };
            let mutation = host.editor.commit_flow(panel, values);
            apply_mutation(&mut session.engine, mutation)
                .map_err(|e| DesignerError::GestureRejected(e.to_string()))?;
            session.editing = None;
            session.pump(&host.editor);
            Ok(())
        })
    }

    /// Closes the open panel without touching the model.
    pub fn cancel_edit(&self) -> Result<(), DesignerError> {
        self.with_session(|session, _| {
            session.editing = None;
            Ok(())
        })
    }

    /// Snapshot of all elements in registry order.
    pub fn elements(&self) -> Result<Vec<Element>, DesignerError> {
        self.with_session(|session, _| {
            Ok(session.engine.elements().into_iter().cloned().collect())
        })
    }

    pub fn element(&self, id: &ElementId) -> Result<Option<Element>, DesignerError> {
        self.with_session(|session, _| Ok(session.engine.get(id).cloned()))
    }

    pub fn overlays(&self) -> Result<Vec<Overlay>, DesignerError> {
        self.with_session(|session, _| Ok(session.engine.overlays().to_vec()))
    }

    pub fn palette(&self) -> Result<Vec<PaletteEntry>, DesignerError> {
        self.with_session(|session, _| Ok(session.engine.palette()))
    }

    pub fn context_actions(&self, id: &ElementId) -> Result<Vec<ContextAction>, DesignerError> {
        self.with_session(|session, _| Ok(session.engine.context_pad(id)))
    }
}

impl<F: EngineFactory> Drop for DiagramHost<F> {
    fn drop(&mut self) {
        self.teardown();
    }
}
