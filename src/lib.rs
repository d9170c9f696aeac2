//! # Kessai - Approval Workflow Diagram Authoring
//!
//! **Kessai** is the authoring core behind an approval-workflow designer. It hosts an
//! embeddable process-diagram engine, extends its element model with approval
//! attributes (ordinal step number, authorizing policy set, branch outcome), keeps a
//! badge overlay in sync with that model, and restricts the generic diagram
//! vocabulary to start events, tasks, exclusive gateways and end events.
//!
//! ## Core Workflow
//!
//! The diagram engine itself (rendering, hit-testing, XML internals) is consumed
//! through the capability traits in [`engine`]. The flow is:
//!
//! 1.  **Build a host**: `DiagramHost::builder(factory)` with a `DesignerConfig`, the
//!     policy registry entries and optionally a custom `TextMeasurer`.
//! 2.  **Initialize**: the host constructs the engine with the restricted palette,
//!     subscribes the step numbering and overlay handlers, loads a diagram (or the
//!     empty template), fits the viewport and back-fills step numbers.
//! 3.  **Edit**: canvas gestures create tasks (numbered automatically), connect
//!     shapes (gateway flows default to "yes") and open property panels.
//! 4.  **Save / Load**: `export_diagram` and `import_diagram` move the serialized
//!     diagram in and out; persistence belongs to the caller.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kessai::prelude::*;
//!
//! # async fn run() -> Result<(), DesignerError> {
//! let host = DiagramHost::builder(MemoryEngineFactory)
//!     .with_config(DesignerConfig::default())
//!     .with_policies(vec![Policy {
//!         id: "finance-lead".to_string(),
//!         display_name: "Finance lead".to_string(),
//!     }])
//!     .build();
//!
//! host.initialize(ContainerHandle::new("canvas", 1280.0, 720.0), None)
//!     .await?;
//!
//! // Drop a task on the canvas; it becomes "Step 1".
//! let task = host
//!     .perform(Gesture::CreateShape {
//!         kind: ElementKind::Task,
//!         at: Point { x: 300.0, y: 180.0 },
//!     })?
//!     .expect("shape id");
//!
//! // Double-click opens the task panel; commit new values.
//! host.perform(Gesture::DoubleClick { id: task })?;
//! host.commit_task(TaskValues {
//!     name: "Approve purchase order".to_string(),
//!     step_number: 1,
//!     policy_ids: PolicySet::new(["finance-lead"]),
//! })?;
//!
//! let xml = host.export_diagram().await?;
//! println!("{}", xml);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod editor;
pub mod engine;
pub mod error;
pub mod host;
pub mod model;
pub mod numbering;
pub mod overlay;
pub mod prelude;
pub mod vocabulary;
