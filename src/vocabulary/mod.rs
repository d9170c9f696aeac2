use crate::config::Locale;
use crate::engine::{DiagramEvent, ElementRegistry, Mutation};
use crate::host::EventHandler;
use crate::model::{AttributePatch, Element, ElementKind, FlowAction};
use tracing::{debug, warn};

/// Tools the engine's creation palette can offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaletteEntry {
    HandTool,
    LassoTool,
    SpaceTool,
    GlobalConnectTool,
    ZoomIn,
    ZoomOut,
    CreateStartEvent,
    CreateIntermediateEvent,
    CreateEndEvent,
    CreateExclusiveGateway,
    CreateTask,
    CreateSubprocess,
    CreateDataObject,
    CreateDataStore,
    CreateParticipant,
    CreateGroup,
}

impl PaletteEntry {
    /// Everything a generic engine palette shows.
    pub const ENGINE_DEFAULTS: [PaletteEntry; 16] = [
        PaletteEntry::HandTool,
        PaletteEntry::LassoTool,
        PaletteEntry::SpaceTool,
        PaletteEntry::GlobalConnectTool,
        PaletteEntry::ZoomIn,
        PaletteEntry::ZoomOut,
        PaletteEntry::CreateStartEvent,
        PaletteEntry::CreateIntermediateEvent,
        PaletteEntry::CreateEndEvent,
        PaletteEntry::CreateExclusiveGateway,
        PaletteEntry::CreateTask,
        PaletteEntry::CreateSubprocess,
        PaletteEntry::CreateDataObject,
        PaletteEntry::CreateDataStore,
        PaletteEntry::CreateParticipant,
        PaletteEntry::CreateGroup,
    ];

    /// The element kind this entry creates, if it is a creation tool of our vocabulary.
    pub fn creates(&self) -> Option<ElementKind> {
        match self {
            PaletteEntry::CreateStartEvent => Some(ElementKind::StartEvent),
            PaletteEntry::CreateEndEvent => Some(ElementKind::EndEvent),
            PaletteEntry::CreateExclusiveGateway => Some(ElementKind::ExclusiveGateway),
            PaletteEntry::CreateTask => Some(ElementKind::Task),
            _ => None,
        }
    }
}

/// Shortcuts of the engine's contextual action menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextAction {
    AppendTask,
    AppendExclusiveGateway,
    AppendEndEvent,
    AppendIntermediateEvent,
    AppendTextAnnotation,
    Replace,
    Connect,
    Delete,
}

impl ContextAction {
    /// What a generic engine offers for an element of `kind`.
    pub fn engine_defaults(kind: ElementKind) -> Vec<ContextAction> {
        use ContextAction::*;
        match kind {
            ElementKind::StartEvent | ElementKind::Task | ElementKind::ExclusiveGateway => vec![
                AppendTask,
                AppendExclusiveGateway,
                AppendEndEvent,
                AppendIntermediateEvent,
                AppendTextAnnotation,
                Replace,
                Connect,
                Delete,
            ],
            ElementKind::EndEvent => vec![AppendTextAnnotation, Replace, Connect, Delete],
            ElementKind::SequenceFlow => vec![AppendTextAnnotation, Replace, Delete],
        }
    }
}

/// Pares the engine's generic affordances down to the approval-workflow vocabulary.
#[derive(Debug, Clone, Copy, Default)]
pub struct VocabularyRestrictor;

impl VocabularyRestrictor {
    pub fn new() -> Self {
        Self
    }

    /// Start, task, gateway and end creation plus pan, select and zoom.
    pub fn palette(&self) -> Vec<PaletteEntry> {
        PaletteEntry::ENGINE_DEFAULTS
            .into_iter()
            .filter(|entry| {
                entry.creates().is_some()
                    || matches!(
                        entry,
                        PaletteEntry::HandTool
                            | PaletteEntry::LassoTool
                            | PaletteEntry::ZoomIn
                            | PaletteEntry::ZoomOut
                    )
            })
            .collect()
    }

    pub fn context_actions(&self, kind: ElementKind) -> Vec<ContextAction> {
        ContextAction::engine_defaults(kind)
            .into_iter()
            .filter(|action| self.keeps_context_action(kind, *action))
            .collect()
    }

    fn keeps_context_action(&self, kind: ElementKind, action: ContextAction) -> bool {
        match action {
            ContextAction::Replace
            | ContextAction::AppendIntermediateEvent
            | ContextAction::AppendTextAnnotation => false,
            ContextAction::AppendEndEvent | ContextAction::AppendExclusiveGateway => {
                kind != ElementKind::Task
            }
            ContextAction::Connect => kind != ElementKind::EndEvent,
            ContextAction::AppendTask | ContextAction::Delete => true,
        }
    }

    pub fn allows_creation(&self, kind: ElementKind) -> bool {
        self.palette()
            .iter()
            .any(|entry| entry.creates() == Some(kind))
    }

    /// Checks whether a sequence flow may run from `source` to `target`.
    pub fn check_connection(&self, source: &Element, target: &Element) -> Result<(), String> {
        if !source.kind.is_shape() || !target.kind.is_shape() {
            return Err("only shapes can be connected".to_string());
        }
        if source.id == target.id {
            return Err("an element cannot be connected to itself".to_string());
        }
        if source.kind == ElementKind::EndEvent {
            return Err("an end event has no outgoing flows".to_string());
        }
        if target.kind == ElementKind::StartEvent {
            return Err("a start event has no incoming flows".to_string());
        }
        Ok(())
    }
}

/// Gives every new flow touching a gateway a valid `action`/`name` pair.
///
/// After an import, any flow whose `name` is not the label of its `action`
/// in the current locale gets its name rewritten.
pub struct ConnectionDefaults {
    locale: Locale,
}

impl ConnectionDefaults {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    /// Rewrites imported flow labels that disagree with their action.
    fn relabel(&self, registry: &dyn ElementRegistry) -> Vec<Mutation> {
        registry
            .elements_of_kind(ElementKind::SequenceFlow)
            .into_iter()
            .filter_map(|flow| {
                let action = flow.attributes.action()?;
                let label = action.label(self.locale);
                let name = flow.attributes.name();
                if name == Some(label) {
                    return None;
                }
                warn!(
                    flow = %flow.id,
                    %action,
                    name,
                    "Flow label disagrees with its action, relabeling"
                );
                Some(Mutation::UpdateProperties {
                    id: flow.id.clone(),
                    patch: AttributePatch::new().name(label),
                })
            })
            .collect()
    }
}

impl EventHandler for ConnectionDefaults {
    fn name(&self) -> &'static str {
        "connection-defaults"
    }

    fn handle(&mut self, event: &DiagramEvent, registry: &dyn ElementRegistry) -> Vec<Mutation> {
        let id = match event {
            DiagramEvent::ConnectionCreated { id } => id,
            DiagramEvent::ImportDone => return self.relabel(registry),
            _ => return Vec::new(),
        };
        let Some(flow) = registry.get(id) else {
            return Vec::new();
        };
        let Some((source, target)) = flow.endpoints() else {
            return Vec::new();
        };
        if flow.attributes.action().is_some() {
            return Vec::new();
        }

        let touches_gateway = [source, target].into_iter().any(|endpoint| {
            registry
                .get(endpoint)
                .is_some_and(|element| element.kind == ElementKind::ExclusiveGateway)
        });
        if !touches_gateway {
            return Vec::new();
        }

        let action = FlowAction::default();
        debug!(flow = %id, %action, "Defaulting gateway flow action");
        vec![Mutation::UpdateProperties {
            id: id.clone(),
            patch: AttributePatch::new()
                .action(action)
                .name(action.label(self.locale)),
        }]
    }
}
