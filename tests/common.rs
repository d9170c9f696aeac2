//! Common test utilities for building hosts, engines and diagram fixtures.
use async_trait::async_trait;
use kessai::engine::{
    EngineOptions, EventBus, Modeling, OverlayLayer, Serialization, ToolProviders, Viewport,
};
use kessai::prelude::*;
use std::sync::Arc;
use tokio::sync::Notify;

/// A diagram with one numbered task, one without a number and one numbered `0`.
///
/// Layout: Start -> Review(2) -> Gateway -(yes)-> Sign -> End
///                                   \-(no)--> Archive(0) -> End
#[allow(dead_code)]
pub const PARTIALLY_NUMBERED_DIAGRAM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<bpmn:definitions xmlns:bpmn="http://www.omg.org/spec/BPMN/20100524/MODEL" xmlns:camunda="http://camunda.org/schema/1.0/bpmn" id="Definitions_7">
  <bpmn:process id="Process_approval" isExecutable="false">
    <bpmn:startEvent id="StartEvent_1"/>
    <bpmn:task id="Activity_review" name="Review" camunda:stepNumber="2" camunda:policyId="[&quot;finance-lead&quot;]">
      <bpmn:incoming>Flow_1</bpmn:incoming>
    </bpmn:task>
    <bpmn:exclusiveGateway id="Gateway_1"/>
    <bpmn:task id="Activity_sign" name="Sign"/>
    <bpmn:task id="Activity_archive" name="Archive" camunda:stepNumber="0"/>
    <bpmn:endEvent id="EndEvent_1"/>
    <bpmn:sequenceFlow id="Flow_1" sourceRef="StartEvent_1" targetRef="Activity_review"/>
    <bpmn:sequenceFlow id="Flow_2" sourceRef="Activity_review" targetRef="Gateway_1"/>
    <bpmn:sequenceFlow id="Flow_3" sourceRef="Gateway_1" targetRef="Activity_sign" name="Yes" camunda:action="yes"/>
    <bpmn:sequenceFlow id="Flow_4" sourceRef="Gateway_1" targetRef="Activity_archive" name="No" camunda:action="no"/>
    <bpmn:sequenceFlow id="Flow_5" sourceRef="Activity_sign" targetRef="EndEvent_1"/>
    <bpmn:sequenceFlow id="Flow_6" sourceRef="Activity_archive" targetRef="EndEvent_1"/>
  </bpmn:process>
  <bpmndi:BPMNDiagram id="BPMNDiagram_1" xmlns:bpmndi="http://www.omg.org/spec/BPMN/20100524/DI" xmlns:dc="http://www.omg.org/spec/DD/20100524/DC">
    <bpmndi:BPMNPlane id="BPMNPlane_1" bpmnElement="Process_approval">
      <bpmndi:BPMNShape id="StartEvent_1_di" bpmnElement="StartEvent_1">
        <dc:Bounds x="152" y="102" width="36" height="36"/>
      </bpmndi:BPMNShape>
      <bpmndi:BPMNShape id="Activity_review_di" bpmnElement="Activity_review">
        <dc:Bounds x="240" y="80" width="100" height="80"/>
      </bpmndi:BPMNShape>
      <bpmndi:BPMNShape id="Gateway_1_di" bpmnElement="Gateway_1">
        <dc:Bounds x="395" y="95" width="50" height="50"/>
      </bpmndi:BPMNShape>
      <bpmndi:BPMNShape id="Activity_sign_di" bpmnElement="Activity_sign">
        <dc:Bounds x="500" y="80" width="100" height="80"/>
      </bpmndi:BPMNShape>
      <bpmndi:BPMNShape id="Activity_archive_di" bpmnElement="Activity_archive">
        <dc:Bounds x="500" y="220" width="100" height="80"/>
      </bpmndi:BPMNShape>
      <bpmndi:BPMNShape id="EndEvent_1_di" bpmnElement="EndEvent_1">
        <dc:Bounds x="662" y="102" width="36" height="36"/>
      </bpmndi:BPMNShape>
      <bpmndi:BPMNEdge id="Flow_1_di" bpmnElement="Flow_1">
        <di:waypoint x="188" y="120"/>
        <di:waypoint x="240" y="120"/>
      </bpmndi:BPMNEdge>
    </bpmndi:BPMNPlane>
  </bpmndi:BPMNDiagram>
</bpmn:definitions>
"#;

/// A task whose policy attribute is not JSON.
#[allow(dead_code)]
pub const BROKEN_POLICY_DIAGRAM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<definitions>
  <process id="Process_1">
    <startEvent id="StartEvent_1"/>
    <task id="Activity_1" name="Approve" stepNumber="1" policyId="not valid json"/>
    <endEvent id="EndEvent_1"/>
  </process>
</definitions>
"#;

#[allow(dead_code)]
pub fn create_policies() -> Vec<Policy> {
    vec![
        Policy {
            id: "finance-lead".to_string(),
            display_name: "Finance lead".to_string(),
        },
        Policy {
            id: "warehouse-manager".to_string(),
            display_name: "Warehouse manager".to_string(),
        },
    ]
}

#[allow(dead_code)]
pub fn create_container() -> ContainerHandle {
    ContainerHandle::new("approval-canvas", 1280.0, 720.0)
}

#[allow(dead_code)]
pub fn create_host() -> DiagramHost<MemoryEngineFactory> {
    DiagramHost::builder(MemoryEngineFactory)
        .with_policies(create_policies())
        .build()
}

/// A host that has finished initializing with the empty template.
#[allow(dead_code)]
pub async fn create_ready_host() -> DiagramHost<MemoryEngineFactory> {
    let host = create_host();
    host.initialize(create_container(), None)
        .await
        .expect("initialize should succeed");
    host
}

#[allow(dead_code)]
pub fn create_engine() -> MemoryEngine {
    MemoryEngine::new(EngineOptions {
        container: create_container(),
        vocabulary: VocabularyRestrictor::new(),
    })
}

/// Drops a task on the canvas at a column derived from `slot`.
#[allow(dead_code)]
pub fn add_task<F: EngineFactory>(host: &DiagramHost<F>, slot: u32) -> ElementId {
    host.perform(Gesture::CreateShape {
        kind: ElementKind::Task,
        at: Point {
            x: 200.0 + f64::from(slot) * 160.0,
            y: 300.0,
        },
    })
    .expect("task creation should be accepted")
    .expect("task creation returns the new id")
}

#[allow(dead_code)]
pub fn add_shape<F: EngineFactory>(host: &DiagramHost<F>, kind: ElementKind) -> ElementId {
    host.perform(Gesture::CreateShape {
        kind,
        at: Point { x: 400.0, y: 400.0 },
    })
    .expect("shape creation should be accepted")
    .expect("shape creation returns the new id")
}

#[allow(dead_code)]
pub fn tasks_of<F: EngineFactory>(host: &DiagramHost<F>) -> Vec<Element> {
    host.elements()
        .expect("host should be ready")
        .into_iter()
        .filter(|element| element.kind == ElementKind::Task)
        .collect()
}

#[allow(dead_code)]
pub fn step_of<F: EngineFactory>(host: &DiagramHost<F>, id: &ElementId) -> Option<u32> {
    host.element(id)
        .expect("host should be ready")
        .and_then(|element| element.attributes.step_number())
}

/// Measures every character as exactly `char_width` units, one line per `\n`.
#[allow(dead_code)]
pub struct StubMeasurer {
    pub char_width: f64,
    pub line_height: f64,
}

impl TextMeasurer for StubMeasurer {
    fn measure(&self, text: &str, _font: &FontSpec) -> TextExtent {
        if text.is_empty() {
            return TextExtent::default();
        }
        let lines: Vec<&str> = text.split('\n').collect();
        let widest = lines.iter().map(|line| line.chars().count()).max().unwrap_or(0);
        TextExtent {
            width: widest as f64 * self.char_width,
            height: lines.len() as f64 * self.line_height,
        }
    }
}

/// An engine whose imports wait for a permit, to observe the host mid-load.
#[allow(dead_code)]
pub struct GatedEngine {
    inner: MemoryEngine,
    gate: Arc<Notify>,
}

#[allow(dead_code)]
pub struct GatedFactory {
    pub gate: Arc<Notify>,
}

impl EngineFactory for GatedFactory {
    type Engine = GatedEngine;

    fn create(&self, options: EngineOptions) -> Result<Self::Engine, EngineError> {
        Ok(GatedEngine {
            inner: MemoryEngine::new(options),
            gate: Arc::clone(&self.gate),
        })
    }
}

impl ElementRegistry for GatedEngine {
    fn get(&self, id: &ElementId) -> Option<&Element> {
        self.inner.get(id)
    }

    fn elements(&self) -> Vec<&Element> {
        self.inner.elements()
    }
}

impl Modeling for GatedEngine {
    fn create_shape(&mut self, kind: ElementKind, at: Point) -> Result<ElementId, EngineError> {
        self.inner.create_shape(kind, at)
    }

    fn connect(
        &mut self,
        source: &ElementId,
        target: &ElementId,
    ) -> Result<ElementId, EngineError> {
        self.inner.connect(source, target)
    }

    fn remove_element(&mut self, id: &ElementId) -> Result<Vec<ElementId>, EngineError> {
        self.inner.remove_element(id)
    }

    fn update_properties(
        &mut self,
        id: &ElementId,
        patch: &AttributePatch,
    ) -> Result<(), EngineError> {
        self.inner.update_properties(id, patch)
    }

    fn resize_shape(&mut self, id: &ElementId, bounds: Bounds) -> Result<(), EngineError> {
        self.inner.resize_shape(id, bounds)
    }
}

impl EventBus for GatedEngine {
    fn emit(&mut self, event: DiagramEvent) {
        self.inner.emit(event)
    }

    fn next_event(&mut self) -> Option<DiagramEvent> {
        self.inner.next_event()
    }
}

impl OverlayLayer for GatedEngine {
    fn add_overlay(&mut self, overlay: Overlay) {
        self.inner.add_overlay(overlay)
    }

    fn clear_overlays(&mut self) {
        self.inner.clear_overlays()
    }

    fn overlays(&self) -> &[Overlay] {
        self.inner.overlays()
    }
}

impl ToolProviders for GatedEngine {
    fn palette(&self) -> Vec<PaletteEntry> {
        self.inner.palette()
    }

    fn context_pad(&self, id: &ElementId) -> Vec<ContextAction> {
        self.inner.context_pad(id)
    }
}

#[async_trait]
impl Viewport for GatedEngine {
    async fn zoom(&mut self, zoom: Zoom) -> Result<f64, EngineError> {
        self.inner.zoom(zoom).await
    }
}

#[async_trait]
impl Serialization for GatedEngine {
    async fn import_xml(&mut self, xml: &str) -> Result<(), EngineError> {
        self.gate.notified().await;
        self.inner.import_xml(xml).await
    }

    async fn save_xml(&self) -> Result<String, EngineError> {
        self.inner.save_xml().await
    }
}
