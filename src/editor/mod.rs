use crate::config::Locale;
use crate::engine::{ElementRegistry, Mutation};
use crate::model::{
    AttributePatch, Element, ElementId, ElementKind, FlowAction, Policy, PolicyCatalog, PolicySet,
};
use std::fmt;
use tracing::warn;

/// State of the task properties panel while it is open.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskPanel {
    pub element: ElementId,
    pub name: String,
    pub step_number: u32,
    pub policy_ids: PolicySet,
}

/// State of the gateway-flow properties panel while it is open.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowPanel {
    pub element: ElementId,
    pub action: FlowAction,
}

/// The element currently being edited and the values its panel was opened with.
#[derive(Debug, Clone, PartialEq)]
pub enum EditingSession {
    Task(TaskPanel),
    Flow(FlowPanel),
}

impl EditingSession {
    pub fn element(&self) -> &ElementId {
        match self {
            EditingSession::Task(panel) => &panel.element,
            EditingSession::Flow(panel) => &panel.element,
        }
    }
}

/// Values submitted from the task panel.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskValues {
    pub name: String,
    /// Signed so that out-of-range input can be reported rather than rejected on entry.
    pub step_number: i64,
    pub policy_ids: PolicySet,
}

impl TaskValues {
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        if self.name.trim().is_empty() {
            issues.push(ValidationIssue::EmptyName);
        }
        if self.step_number < 1 || self.step_number > i64::from(u32::MAX) {
            issues.push(ValidationIssue::StepNumberNotPositive(self.step_number));
        }
        issues
    }
}

impl From<&TaskPanel> for TaskValues {
    fn from(panel: &TaskPanel) -> Self {
        Self {
            name: panel.name.clone(),
            step_number: i64::from(panel.step_number),
            policy_ids: panel.policy_ids.clone(),
        }
    }
}

/// Values submitted from the flow panel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowValues {
    pub action: FlowAction,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationIssue {
    EmptyName,
    StepNumberNotPositive(i64),
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyName => write!(f, "name must not be empty"),
            ValidationIssue::StepNumberNotPositive(n) => {
                write!(f, "step number must be a positive integer, got {}", n)
            }
        }
    }
}

/// Opens property panels for tasks and gateway flows and turns submissions into mutations.
pub struct PropertyEditor {
    locale: Locale,
    catalog: PolicyCatalog,
}

impl PropertyEditor {
    pub fn new(locale: Locale, catalog: PolicyCatalog) -> Self {
        Self { locale, catalog }
    }

    pub fn catalog(&self) -> &PolicyCatalog {
        &self.catalog
    }

    /// Opens the panel matching `element`, or `None` for elements without one.
    pub fn open_for(
        &self,
        element: &Element,
        registry: &dyn ElementRegistry,
    ) -> Option<EditingSession> {
        match element.kind {
            ElementKind::Task => Some(EditingSession::Task(self.open_task(element))),
            ElementKind::SequenceFlow => {
                let (source, _) = element.endpoints()?;
                let from_gateway = registry
                    .get(source)
                    .is_some_and(|source| source.kind == ElementKind::ExclusiveGateway);
                from_gateway.then(|| {
                    EditingSession::Flow(FlowPanel {
                        element: element.id.clone(),
                        action: element.attributes.action().unwrap_or_default(),
                    })
                })
            }
            _ => None,
        }
    }

    fn open_task(&self, task: &Element) -> TaskPanel {
        let policy_ids = match task.attributes.policy_ids_raw() {
            None => PolicySet::default(),
            Some(raw) if raw.trim().is_empty() => PolicySet::default(),
            Some(raw) => PolicySet::from_json(raw).unwrap_or_else(|e| {
                warn!(task = %task.id, error = %e, "Unreadable policy set, opening with none selected");
                PolicySet::default()
            }),
        };
        TaskPanel {
            element: task.id.clone(),
            name: task.attributes.name().unwrap_or_default().to_string(),
            step_number: task.attributes.step_number().unwrap_or(0),
            policy_ids,
        }
    }

    /// Builds the single mutation writing name, step number and policies together.
    ///
    /// Values that fail [`TaskValues::validate`] yield `None` and nothing is
    /// written. The issues are a hard gate on the commit, not advice to show
    /// beside a form that saves regardless.
    pub fn commit_task(&self, panel: &TaskPanel, values: &TaskValues) -> Option<Mutation> {
        if !values.validate().is_empty() {
            return None;
        }
        let step = u32::try_from(values.step_number).ok()?;
        Some(Mutation::UpdateProperties {
            id: panel.element.clone(),
            patch: AttributePatch::new()
                .name(values.name.trim())
                .step_number(step)
                .policy_ids(&values.policy_ids),
        })
    }

    /// Sets the action and the name derived from it.
    pub fn commit_flow(&self, panel: &FlowPanel, values: FlowValues) -> Mutation {
        Mutation::UpdateProperties {
            id: panel.element.clone(),
            patch: AttributePatch::new()
                .action(values.action)
                .name(values.action.label(self.locale)),
        }
    }

    /// Selected policy ids the catalog does not know about.
    pub fn unknown_policies<'a>(&self, selection: &'a PolicySet) -> Vec<&'a str> {
        selection
            .ids()
            .iter()
            .map(String::as_str)
            .filter(|id| !self.catalog.contains(id))
            .collect()
    }

    /// Catalog entries backing the current selection, in selection order.
    pub fn selected_policies(&self, selection: &PolicySet) -> Vec<&Policy> {
        selection
            .ids()
            .iter()
            .filter_map(|id| self.catalog.get(id))
            .collect()
    }
}
