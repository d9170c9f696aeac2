/// The diagram a new approval workflow starts from: one start and one end event.
pub const EMPTY_DIAGRAM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<definitions xmlns="http://www.omg.org/spec/BPMN/20100524/MODEL" id="Definitions_1" targetNamespace="http://bpmn.io/schema/bpmn">
  <process id="Process_1" isExecutable="false">
    <startEvent id="StartEvent_1"/>
    <endEvent id="EndEvent_1"/>
  </process>
  <diagram id="Diagram_1">
    <shape bpmnElement="StartEvent_1" x="180" y="160" width="36" height="36"/>
    <shape bpmnElement="EndEvent_1" x="580" y="160" width="36" height="36"/>
  </diagram>
</definitions>
"#;
