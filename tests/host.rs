//! Lifecycle and concurrency tests for the diagram host.
mod common;
use common::*;
use kessai::host::EMPTY_DIAGRAM;
use kessai::prelude::*;
use std::sync::Arc;
use tokio::sync::Notify;
use tracing_test::traced_test;

fn gated_host() -> (DiagramHost<GatedFactory>, Arc<Notify>) {
    let gate = Arc::new(Notify::new());
    let host = DiagramHost::builder(GatedFactory {
        gate: Arc::clone(&gate),
    })
    .with_policies(create_policies())
    .build();
    (host, gate)
}

fn kinds(elements: &[Element]) -> Vec<ElementKind> {
    elements.iter().map(|element| element.kind).collect()
}

#[tokio::test]
async fn test_initialize_loads_template() {
    let host = create_host();
    assert_eq!(host.state(), HostState::Uninitialized);

    host.initialize(create_container(), None).await.unwrap();

    assert_eq!(host.state(), HostState::Ready);
    let elements = host.elements().unwrap();
    assert_eq!(
        kinds(&elements),
        vec![ElementKind::StartEvent, ElementKind::EndEvent]
    );
    assert!(host.overlays().unwrap().is_empty());
}

#[test]
fn test_initialize_twice_is_rejected() {
    tokio_test::block_on(async {
        let host = create_ready_host().await;
        assert_eq!(
            host.initialize(create_container(), None).await,
            Err(DesignerError::AlreadyInitialized)
        );
        assert_eq!(host.state(), HostState::Ready);
    });
}

#[tokio::test]
async fn test_initialize_with_bad_diagram_can_be_retried() {
    let host = create_host();
    let result = host
        .initialize(create_container(), Some("<definitions/>"))
        .await;
    assert!(matches!(result, Err(DesignerError::ImportFailed(_))));
    assert_eq!(host.state(), HostState::Uninitialized);

    host.initialize(create_container(), None).await.unwrap();
    assert_eq!(host.state(), HostState::Ready);
}

#[tokio::test]
async fn test_operations_before_initialize() {
    let host = create_host();
    assert_eq!(host.export_diagram().await, Err(DesignerError::NotInitialized));
    assert_eq!(
        host.import_diagram(EMPTY_DIAGRAM).await,
        Err(DesignerError::NotInitialized)
    );
    assert_eq!(host.zoom(Zoom::Fit).await, Err(DesignerError::NotInitialized));
    assert_eq!(host.elements(), Err(DesignerError::NotInitialized));
}

#[tokio::test]
async fn test_gateway_connection_gets_yes_default() {
    let host = create_ready_host().await;
    let task = add_task(&host, 0);
    let gateway = add_shape(&host, ElementKind::ExclusiveGateway);

    let flow = host
        .perform(Gesture::Connect {
            source: task,
            target: gateway.clone(),
        })
        .unwrap()
        .unwrap();
    let created = host.element(&flow).unwrap().unwrap();
    assert_eq!(created.attributes.action(), Some(FlowAction::Yes));
    assert_eq!(created.attributes.name(), Some("Yes"));

    // Any flow touching a gateway gets the default, in either direction.
    let end = ElementId::from("EndEvent_1");
    let to_end = host
        .perform(Gesture::Connect {
            source: gateway,
            target: end.clone(),
        })
        .unwrap()
        .unwrap();
    assert_eq!(
        host.element(&to_end).unwrap().unwrap().attributes.action(),
        Some(FlowAction::Yes)
    );

    // Flows away from gateways stay bare.
    let start = ElementId::from("StartEvent_1");
    let bare = host
        .perform(Gesture::Connect {
            source: start,
            target: end,
        })
        .unwrap()
        .unwrap();
    let bare = host.element(&bare).unwrap().unwrap();
    assert_eq!(bare.attributes.action(), None);
    assert_eq!(bare.attributes.name(), None);
}

#[tokio::test]
#[traced_test]
async fn test_imported_flow_label_follows_its_action() {
    let xml = r#"<definitions><process>
        <exclusiveGateway id="G"/>
        <task id="A" name="Sign" stepNumber="1"/>
        <task id="B" name="Archive" stepNumber="2"/>
        <sequenceFlow id="Mislabeled" sourceRef="G" targetRef="A" action="no" name="Yes"/>
        <sequenceFlow id="Unlabeled" sourceRef="G" targetRef="B" action="yes"/>
    </process></definitions>"#;
    let host = create_host();
    host.initialize(create_container(), Some(xml)).await.unwrap();

    let mislabeled = host.element(&ElementId::from("Mislabeled")).unwrap().unwrap();
    assert_eq!(mislabeled.attributes.action(), Some(FlowAction::No));
    assert_eq!(mislabeled.attributes.name(), Some("No"));
    let unlabeled = host.element(&ElementId::from("Unlabeled")).unwrap().unwrap();
    assert_eq!(unlabeled.attributes.name(), Some("Yes"));
    assert!(logs_contain("Flow label disagrees with its action"));
}

#[tokio::test]
async fn test_palette_is_restricted() {
    let host = create_ready_host().await;
    let palette = host.palette().unwrap();
    assert_eq!(palette, VocabularyRestrictor::new().palette());
    assert!(palette.contains(&PaletteEntry::CreateTask));
    assert!(!palette.contains(&PaletteEntry::CreateDataObject));

    let result = host.perform(Gesture::CreateShape {
        kind: ElementKind::SequenceFlow,
        at: Point::default(),
    });
    assert!(matches!(result, Err(DesignerError::GestureRejected(_))));

    let actions = host
        .context_actions(&ElementId::from("EndEvent_1"))
        .unwrap();
    assert!(!actions.contains(&ContextAction::Connect));
}

#[tokio::test]
async fn test_rejected_gestures_leave_the_graph_alone() {
    let host = create_ready_host().await;
    let before = host.elements().unwrap();

    let result = host.perform(Gesture::Connect {
        source: ElementId::from("EndEvent_1"),
        target: ElementId::from("StartEvent_1"),
    });
    assert!(matches!(result, Err(DesignerError::GestureRejected(_))));
    let result = host.perform(Gesture::DoubleClick {
        id: ElementId::from("ghost"),
    });
    assert!(matches!(result, Err(DesignerError::GestureRejected(_))));

    assert_eq!(host.elements().unwrap(), before);
}

#[tokio::test]
async fn test_export_import_round_trip() {
    let host = create_ready_host().await;
    let task = add_task(&host, 0);
    host.perform(Gesture::Connect {
        source: ElementId::from("StartEvent_1"),
        target: task.clone(),
    })
    .unwrap();
    let exported = host.export_diagram().await.unwrap();

    let other = create_host();
    other
        .initialize(create_container(), Some(&exported))
        .await
        .unwrap();
    assert_eq!(other.elements().unwrap(), host.elements().unwrap());
    assert_eq!(other.export_diagram().await.unwrap(), exported);
}

#[tokio::test]
async fn test_failed_import_keeps_current_diagram() {
    let host = create_ready_host().await;
    add_task(&host, 0);
    let before = host.elements().unwrap();

    let result = host
        .import_diagram(r#"<definitions><process><userTask id="U"/></process></definitions>"#)
        .await;
    assert!(matches!(result, Err(DesignerError::ImportFailed(_))));
    assert_eq!(host.state(), HostState::Ready);
    assert_eq!(host.elements().unwrap(), before);
}

#[tokio::test]
async fn test_import_closes_open_panel() {
    let host = create_ready_host().await;
    let task = add_task(&host, 0);
    host.perform(Gesture::DoubleClick { id: task }).unwrap();
    assert!(host.editing_session().unwrap().is_some());

    host.import_diagram(PARTIALLY_NUMBERED_DIAGRAM)
        .await
        .unwrap();
    assert_eq!(host.editing_session().unwrap(), None);
    assert_eq!(tasks_of(&host).len(), 3);
}

#[tokio::test]
async fn test_export_during_initialize_is_not_initialized() {
    let (host, gate) = gated_host();

    let (initialized, exported) = tokio::join!(
        host.initialize(create_container(), None),
        async {
            let exported = host.export_diagram().await;
            gate.notify_one();
            exported
        }
    );

    assert_eq!(exported, Err(DesignerError::NotInitialized));
    assert_eq!(initialized, Ok(()));
    assert!(host.export_diagram().await.is_ok());
}

#[tokio::test]
async fn test_sync_operations_are_busy_while_loading() {
    let (host, gate) = gated_host();
    gate.notify_one();
    host.initialize(create_container(), None).await.unwrap();

    let (imported, (state, elements, perform)) = tokio::join!(
        host.import_diagram(PARTIALLY_NUMBERED_DIAGRAM),
        async {
            let observed = (
                host.state(),
                host.elements(),
                host.perform(Gesture::CreateShape {
                    kind: ElementKind::Task,
                    at: Point::default(),
                }),
            );
            gate.notify_one();
            observed
        }
    );

    assert_eq!(state, HostState::Loading);
    assert_eq!(elements, Err(DesignerError::Busy));
    assert_eq!(perform, Err(DesignerError::Busy));
    assert_eq!(imported, Ok(()));
    assert_eq!(host.state(), HostState::Ready);
}

#[tokio::test]
async fn test_concurrent_imports_apply_in_call_order() {
    let (host, gate) = gated_host();
    gate.notify_one();
    host.initialize(create_container(), None).await.unwrap();

    let (first, second, _) = tokio::join!(
        host.import_diagram(PARTIALLY_NUMBERED_DIAGRAM),
        host.import_diagram(BROKEN_POLICY_DIAGRAM),
        async {
            // One wakes the waiting import, the other is stored for the queued one.
            gate.notify_one();
            gate.notify_one();
        }
    );

    assert_eq!(first, Ok(()));
    assert_eq!(second, Ok(()));
    let ids: Vec<String> = host
        .elements()
        .unwrap()
        .into_iter()
        .map(|element| element.id.to_string())
        .collect();
    assert_eq!(ids, vec!["StartEvent_1", "Activity_1", "EndEvent_1"]);
}

#[tokio::test]
async fn test_teardown_is_idempotent() {
    let host = create_ready_host().await;
    host.teardown();
    host.teardown();

    assert_eq!(host.state(), HostState::Disposed);
    assert_eq!(host.export_diagram().await, Err(DesignerError::Disposed));
    assert_eq!(host.elements(), Err(DesignerError::Disposed));
    assert_eq!(
        host.initialize(create_container(), None).await,
        Err(DesignerError::Disposed)
    );
    assert_eq!(
        host.import_diagram(EMPTY_DIAGRAM).await,
        Err(DesignerError::Disposed)
    );
}

#[tokio::test]
async fn test_teardown_before_initialize() {
    let host = create_host();
    host.teardown();
    assert_eq!(host.state(), HostState::Disposed);
    assert_eq!(
        host.initialize(create_container(), None).await,
        Err(DesignerError::Disposed)
    );
}

#[tokio::test]
async fn test_teardown_while_loading_disposes_after_load() {
    let (host, gate) = gated_host();

    let (initialized, _) = tokio::join!(host.initialize(create_container(), None), async {
        host.teardown();
        gate.notify_one();
    });

    assert_eq!(initialized, Ok(()));
    assert_eq!(host.state(), HostState::Disposed);
    assert_eq!(host.export_diagram().await, Err(DesignerError::Disposed));
}

#[tokio::test]
#[traced_test]
async fn test_viewport_failure_is_logged_not_fatal() {
    let host = create_host();
    host.initialize(ContainerHandle::new("hidden", 0.0, 0.0), None)
        .await
        .unwrap();

    assert_eq!(host.state(), HostState::Ready);
    assert!(logs_contain("Ignoring viewport failure"));
    assert_eq!(host.zoom(Zoom::Fit).await, Ok(None));
}

#[tokio::test]
async fn test_zoom_reports_level() {
    let host = create_ready_host().await;
    let level = host.zoom(Zoom::By(0.5)).await.unwrap();
    assert!(level.is_some_and(|level| level > 1.0));
}

#[tokio::test]
async fn test_fit_can_be_disabled() {
    let host = DiagramHost::builder(MemoryEngineFactory)
        .with_config(DesignerConfig {
            fit_viewport_on_load: false,
            ..DesignerConfig::default()
        })
        .build();
    host.initialize(ContainerHandle::new("hidden", 0.0, 0.0), None)
        .await
        .unwrap();
    assert_eq!(host.state(), HostState::Ready);
}
