//! Prelude module for convenient imports
//!
//! This module re-exports the most commonly used types and traits from the kessai crate.
//!
//! # Example
//!
//! ```rust,no_run
//! use kessai::prelude::*;
//!
//! # async fn run_example() -> Result<(), DesignerError> {
//! let host = DiagramHost::builder(MemoryEngineFactory).build();
//! host.initialize(ContainerHandle::new("canvas", 800.0, 600.0), None)
//!     .await?;
//! let xml = host.export_diagram().await?;
//! host.import_diagram(&xml).await?;
//! host.teardown();
//! # Ok(())
//! # }
//! ```

// Host facade
pub use crate::host::{DiagramHost, DiagramHostBuilder, Gesture, HostState};

// Configuration
pub use crate::config::{DesignerConfig, FontSpec, Locale, OverlayConfig};

// Engine capabilities
pub use crate::engine::{
    ContainerHandle, DiagramEngine, DiagramEvent, ElementRegistry, EngineFactory,
    MemoryEngine, MemoryEngineFactory, Mutation, Overlay, OverlayKind, Zoom,
};

// Element model
pub use crate::model::{
    AttributeKey, AttributePatch, AttributeValue, Attributes, Bounds, Element, ElementId,
    ElementKind, FlowAction, Geometry, Point, Policy, PolicyCatalog, PolicySet,
};

// Property panels
pub use crate::editor::{EditingSession, FlowPanel, FlowValues, TaskPanel, TaskValues};

// Components
pub use crate::numbering::StepNumberAssigner;
pub use crate::overlay::{FixedMetricMeasurer, OverlayRenderer, TextExtent, TextMeasurer};
pub use crate::vocabulary::{ContextAction, PaletteEntry, VocabularyRestrictor};

// Error types
pub use crate::error::{AttributeError, ConfigError, DesignerError, EngineError};
