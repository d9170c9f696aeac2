use crate::error::EngineError;
use crate::model::{AttributeKey, Bounds, Element, ElementId, ElementKind, Geometry};
use ahash::{AHashMap, AHashSet};
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use std::fmt::Display;
use tracing::warn;

const MODEL_NS: &str = "http://www.omg.org/spec/BPMN/20100524/MODEL";
const TARGET_NS: &str = "http://bpmn.io/schema/bpmn";
pub(crate) const DEFAULT_PROCESS_ID: &str = "Process_1";

/// The graph recovered from a serialized diagram.
pub(crate) struct ParsedDiagram {
    pub process_id: String,
    pub elements: Vec<Element>,
}

fn import_err(message: impl Display) -> EngineError {
    EngineError::Import(message.to_string())
}

fn serialization_err(message: impl Display) -> EngineError {
    EngineError::Serialization(message.to_string())
}

fn local_name(raw: &[u8]) -> Result<String, EngineError> {
    std::str::from_utf8(raw)
        .map(str::to_string)
        .map_err(|e| import_err(format!("invalid UTF-8 in tag name: {}", e)))
}

/// Collects an element's attributes by local name, skipping namespace declarations.
fn attribute_map(start: &BytesStart) -> Result<AHashMap<String, String>, EngineError> {
    let mut map = AHashMap::new();
    for attr in start.attributes() {
        let attr = attr.map_err(import_err)?;
        if attr.key.as_ref().starts_with(b"xmlns") {
            continue;
        }
        let key = local_name(attr.key.local_name().as_ref())?;
        let value = attr.unescape_value().map_err(import_err)?;
        map.insert(key, value.into_owned());
    }
    Ok(map)
}

fn parse_coordinate(attrs: &AHashMap<String, String>, key: &str) -> Result<f64, EngineError> {
    let raw = attrs
        .get(key)
        .ok_or_else(|| import_err(format!("shape bounds are missing '{}'", key)))?;
    raw.trim()
        .parse::<f64>()
        .map_err(|_| import_err(format!("'{}' is not a valid {} coordinate", raw, key)))
}

fn parse_bounds(attrs: &AHashMap<String, String>) -> Result<Bounds, EngineError> {
    Ok(Bounds {
        x: parse_coordinate(attrs, "x")?,
        y: parse_coordinate(attrs, "y")?,
        width: parse_coordinate(attrs, "width")?,
        height: parse_coordinate(attrs, "height")?,
    })
}

/// Builds an element from a process-level tag; bounds are filled in later.
fn parse_element(kind: ElementKind, attrs: &AHashMap<String, String>) -> Result<Element, EngineError> {
    let id = attrs
        .get("id")
        .filter(|id| !id.trim().is_empty())
        .map(|id| ElementId::new(id.trim()))
        .ok_or_else(|| import_err(format!("<{}> is missing an id", kind)))?;

    let mut element = if kind == ElementKind::SequenceFlow {
        let endpoint = |key: &str| {
            attrs
                .get(key)
                .map(|value| ElementId::new(value.trim()))
                .ok_or_else(|| import_err(format!("flow '{}' is missing '{}'", id, key)))
        };
        Element::connection(id.clone(), endpoint("sourceRef")?, endpoint("targetRef")?)
    } else {
        Element::shape(id.clone(), kind, Bounds::default())
    };

    for key in AttributeKey::ALL {
        let Some(raw) = attrs.get(key.wire_name()) else {
            continue;
        };
        match key.decode(raw) {
            Ok(value) => element.attributes.set(key, value),
            Err(e) => warn!(element = %id, attribute = %key, error = %e, "Dropping undecodable attribute"),
        }
    }
    Ok(element)
}

/// Parses the diagram wire format.
pub(crate) fn read_diagram(xml: &str) -> Result<ParsedDiagram, EngineError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut saw_definitions = false;
    let mut process_id: Option<String> = None;
    let mut in_process = false;
    let mut in_diagram = false;
    // Depth inside a process element's own children (incoming/outgoing refs, docs).
    let mut nested = 0usize;
    let mut current_shape: Option<String> = None;
    // Depth inside a shape's non-bounds children, e.g. a label with its own box.
    let mut shape_nested = 0usize;

    let mut elements: Vec<Element> = Vec::new();
    let mut bounds: AHashMap<String, Bounds> = AHashMap::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| import_err(format!("malformed XML at byte {}: {}", reader.buffer_position(), e)))?;
        match event {
            Event::Start(ref start) | Event::Empty(ref start) => {
                let is_empty = matches!(event, Event::Empty(_));
                if nested > 0 || shape_nested > 0 {
                    if !is_empty {
                        if nested > 0 {
                            nested += 1;
                        } else {
                            shape_nested += 1;
                        }
                    }
                    continue;
                }
                let tag = local_name(start.local_name().as_ref())?;
                match tag.as_str() {
                    "definitions" => saw_definitions = true,
                    "process" if saw_definitions => {
                        if process_id.is_some() {
                            return Err(import_err("only one <process> is supported"));
                        }
                        let attrs = attribute_map(start)?;
                        process_id = Some(
                            attrs
                                .get("id")
                                .cloned()
                                .unwrap_or_else(|| DEFAULT_PROCESS_ID.to_string()),
                        );
                        in_process = !is_empty;
                    }
                    "diagram" | "BPMNDiagram" if saw_definitions => in_diagram = !is_empty,
                    _ if in_process => {
                        let kind = ElementKind::from_tag(&tag)
                            .ok_or_else(|| import_err(format!("unsupported element <{}>", tag)))?;
                        elements.push(parse_element(kind, &attribute_map(start)?)?);
                        if !is_empty {
                            nested = 1;
                        }
                    }
                    "shape" | "BPMNShape" if in_diagram => {
                        let attrs = attribute_map(start)?;
                        let target = attrs
                            .get("bpmnElement")
                            .cloned()
                            .ok_or_else(|| import_err("shape is missing 'bpmnElement'"))?;
                        if attrs.contains_key("x") {
                            bounds.insert(target.clone(), parse_bounds(&attrs)?);
                        }
                        if !is_empty {
                            current_shape = Some(target);
                        }
                    }
                    "Bounds" if in_diagram => {
                        if let Some(target) = &current_shape {
                            bounds.insert(target.clone(), parse_bounds(&attribute_map(start)?)?);
                        }
                    }
                    _ if current_shape.is_some() && !is_empty => shape_nested = 1,
                    _ => {}
                }
            }
            Event::End(ref end) => {
                if nested > 0 {
                    nested -= 1;
                    continue;
                }
                if shape_nested > 0 {
                    shape_nested -= 1;
                    continue;
                }
                match local_name(end.local_name().as_ref())?.as_str() {
                    "process" => in_process = false,
                    "diagram" | "BPMNDiagram" => in_diagram = false,
                    "shape" | "BPMNShape" => current_shape = None,
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_definitions {
        return Err(import_err("missing <definitions> root element"));
    }
    let process_id = process_id.ok_or_else(|| import_err("missing <process> element"))?;

    validate_graph(&elements)?;
    place_shapes(&mut elements, &bounds);

    Ok(ParsedDiagram {
        process_id,
        elements,
    })
}

fn validate_graph(elements: &[Element]) -> Result<(), EngineError> {
    let mut seen = AHashSet::new();
    for element in elements {
        if !seen.insert(element.id.clone()) {
            return Err(import_err(format!("duplicate element id '{}'", element.id)));
        }
    }

    let shapes: AHashSet<&ElementId> = elements
        .iter()
        .filter(|element| element.kind.is_shape())
        .map(|element| &element.id)
        .collect();
    for element in elements {
        if let Some((source, target)) = element.endpoints() {
            for endpoint in [source, target] {
                if !shapes.contains(endpoint) {
                    return Err(import_err(format!(
                        "flow '{}' references unknown shape '{}'",
                        element.id, endpoint
                    )));
                }
            }
        }
    }
    Ok(())
}

/// Applies diagram bounds; shapes without any are laid out on a row.
fn place_shapes(elements: &mut [Element], bounds: &AHashMap<String, Bounds>) {
    let mut unplaced = 0usize;
    for element in elements.iter_mut() {
        let Geometry::Shape { bounds: shape_bounds } = &mut element.geometry else {
            continue;
        };
        if let Some(found) = bounds.get(element.id.as_str()) {
            *shape_bounds = *found;
        } else {
            let (width, height) = element.kind.default_size();
            *shape_bounds = Bounds {
                x: 100.0 + unplaced as f64 * 150.0,
                y: 100.0,
                width,
                height,
            };
            unplaced += 1;
        }
    }
}

/// Serializes a graph into the diagram wire format.
pub(crate) fn write_diagram(process_id: &str, elements: &[&Element]) -> Result<String, EngineError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(serialization_err)?;

    let mut root = BytesStart::new("definitions");
    root.push_attribute(("xmlns", MODEL_NS));
    root.push_attribute(("id", "Definitions_1"));
    root.push_attribute(("targetNamespace", TARGET_NS));
    writer.write_event(Event::Start(root)).map_err(serialization_err)?;

    let mut process = BytesStart::new("process");
    process.push_attribute(("id", process_id));
    process.push_attribute(("isExecutable", "false"));
    writer.write_event(Event::Start(process)).map_err(serialization_err)?;

    for element in elements {
        let mut tag = BytesStart::new(element.kind.tag());
        tag.push_attribute(("id", element.id.as_str()));
        if let Some((source, target)) = element.endpoints() {
            tag.push_attribute(("sourceRef", source.as_str()));
            tag.push_attribute(("targetRef", target.as_str()));
        }
        for (key, value) in element.attributes.entries() {
            let encoded = value.encode();
            tag.push_attribute((key.wire_name(), encoded.as_str()));
        }
        writer.write_event(Event::Empty(tag)).map_err(serialization_err)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("process")))
        .map_err(serialization_err)?;

    let mut diagram = BytesStart::new("diagram");
    diagram.push_attribute(("id", "Diagram_1"));
    writer.write_event(Event::Start(diagram)).map_err(serialization_err)?;
    for element in elements {
        let Some(bounds) = element.bounds() else {
            continue;
        };
        let (x, y, width, height) = (
            bounds.x.to_string(),
            bounds.y.to_string(),
            bounds.width.to_string(),
            bounds.height.to_string(),
        );
        let mut shape = BytesStart::new("shape");
        shape.push_attribute(("bpmnElement", element.id.as_str()));
        shape.push_attribute(("x", x.as_str()));
        shape.push_attribute(("y", y.as_str()));
        shape.push_attribute(("width", width.as_str()));
        shape.push_attribute(("height", height.as_str()));
        writer.write_event(Event::Empty(shape)).map_err(serialization_err)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("diagram")))
        .map_err(serialization_err)?;
    writer
        .write_event(Event::End(BytesEnd::new("definitions")))
        .map_err(serialization_err)?;

    String::from_utf8(writer.into_inner()).map_err(serialization_err)
}
