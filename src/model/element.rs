use super::attributes::Attributes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a node or edge, unique within one diagram.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(pub String);

impl ElementId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ElementId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// The restricted vocabulary of element types an approval workflow may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ElementKind {
    StartEvent,
    Task,
    ExclusiveGateway,
    EndEvent,
    SequenceFlow,
}

impl ElementKind {
    /// The element's tag in the diagram wire format.
    pub fn tag(&self) -> &'static str {
        match self {
            ElementKind::StartEvent => "startEvent",
            ElementKind::Task => "task",
            ElementKind::ExclusiveGateway => "exclusiveGateway",
            ElementKind::EndEvent => "endEvent",
            ElementKind::SequenceFlow => "sequenceFlow",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "startEvent" => Some(ElementKind::StartEvent),
            "task" => Some(ElementKind::Task),
            "exclusiveGateway" => Some(ElementKind::ExclusiveGateway),
            "endEvent" => Some(ElementKind::EndEvent),
            "sequenceFlow" => Some(ElementKind::SequenceFlow),
            _ => None,
        }
    }

    /// Prefix used when the engine generates ids for new elements.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            ElementKind::StartEvent => "StartEvent",
            ElementKind::Task => "Activity",
            ElementKind::ExclusiveGateway => "Gateway",
            ElementKind::EndEvent => "Event",
            ElementKind::SequenceFlow => "Flow",
        }
    }

    /// Default box size for a freshly created shape of this kind.
    pub fn default_size(&self) -> (f64, f64) {
        match self {
            ElementKind::Task => (100.0, 80.0),
            ElementKind::ExclusiveGateway => (50.0, 50.0),
            ElementKind::StartEvent | ElementKind::EndEvent => (36.0, 36.0),
            ElementKind::SequenceFlow => (0.0, 0.0),
        }
    }

    pub fn is_shape(&self) -> bool {
        !matches!(self, ElementKind::SequenceFlow)
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Axis-aligned box of a shape; `x`/`y` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn centered_at(center: Point, width: f64, height: f64) -> Self {
        Self {
            x: center.x - width / 2.0,
            y: center.y - height / 2.0,
            width,
            height,
        }
    }

    pub fn center(&self) -> Point {
        Point {
            x: self.x + self.width / 2.0,
            y: self.y + self.height / 2.0,
        }
    }

    /// Returns a box of the given size sharing this box's center.
    pub fn resized_around_center(&self, width: f64, height: f64) -> Self {
        Self {
            x: self.x + (self.width - width) / 2.0,
            y: self.y + (self.height - height) / 2.0,
            width,
            height,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    Shape { bounds: Bounds },
    Connection { source: ElementId, target: ElementId },
}

/// A node or edge of the diagram together with its extended attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: ElementId,
    pub kind: ElementKind,
    pub geometry: Geometry,
    pub attributes: Attributes,
}

impl Element {
    pub fn shape(id: ElementId, kind: ElementKind, bounds: Bounds) -> Self {
        Self {
            id,
            kind,
            geometry: Geometry::Shape { bounds },
            attributes: Attributes::default(),
        }
    }

    pub fn connection(id: ElementId, source: ElementId, target: ElementId) -> Self {
        Self {
            id,
            kind: ElementKind::SequenceFlow,
            geometry: Geometry::Connection { source, target },
            attributes: Attributes::default(),
        }
    }

    pub fn is_task(&self) -> bool {
        self.kind == ElementKind::Task
    }

    pub fn bounds(&self) -> Option<Bounds> {
        match &self.geometry {
            Geometry::Shape { bounds } => Some(*bounds),
            Geometry::Connection { .. } => None,
        }
    }

    /// `(source, target)` for connections.
    pub fn endpoints(&self) -> Option<(&ElementId, &ElementId)> {
        match &self.geometry {
            Geometry::Connection { source, target } => Some((source, target)),
            Geometry::Shape { .. } => None,
        }
    }

    pub fn touches(&self, id: &ElementId) -> bool {
        self.endpoints()
            .is_some_and(|(source, target)| source == id || target == id)
    }
}
