use crate::error::ConfigError;
use serde::Deserialize;

/// Language used for generated labels (default task names, yes/no flow names).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Vi,
}

impl Locale {
    /// Default name given to a task that was created without one.
    pub fn step_name(&self, step: u32) -> String {
        match self {
            Locale::En => format!("Step {}", step),
            Locale::Vi => format!("Bước {}", step),
        }
    }
}

/// Font metric used to measure task labels.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FontSpec {
    pub family: String,
    /// Font size in canvas units.
    pub size: f64,
    /// Line height as a multiple of `size`.
    pub line_height: f64,
}

impl Default for FontSpec {
    fn default() -> Self {
        Self {
            family: "Arial".to_string(),
            size: 12.0,
            line_height: 1.2,
        }
    }
}

/// Geometry of task boxes and step-number badges.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub font: FontSpec,
    pub padding_x: f64,
    pub padding_y: f64,
    pub min_width: f64,
    pub min_height: f64,
    pub badge_offset_x: f64,
    pub badge_offset_y: f64,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            font: FontSpec::default(),
            padding_x: 30.0,
            padding_y: 30.0,
            min_width: 100.0,
            min_height: 80.0,
            badge_offset_x: -10.0,
            badge_offset_y: -10.0,
        }
    }
}

/// Configuration of the diagram authoring layer.
///
/// Every field has a default, so an empty JSON object is a valid config.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DesignerConfig {
    pub locale: Locale,
    pub overlay: OverlayConfig,
    pub fit_viewport_on_load: bool,
}

impl Default for DesignerConfig {
    fn default() -> Self {
        Self {
            locale: Locale::default(),
            overlay: OverlayConfig::default(),
            fit_viewport_on_load: true,
        }
    }
}

impl DesignerConfig {
    /// Parses and validates a config from its JSON representation.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: DesignerConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::JsonParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let overlay = &self.overlay;
        if overlay.font.size <= 0.0 || overlay.font.line_height <= 0.0 {
            return Err(ConfigError::ValidationError(
                "font size and line height must be positive".to_string(),
            ));
        }
        if overlay.min_width <= 0.0 || overlay.min_height <= 0.0 {
            return Err(ConfigError::ValidationError(
                "minimum task size must be positive".to_string(),
            ));
        }
        if overlay.padding_x < 0.0 || overlay.padding_y < 0.0 {
            return Err(ConfigError::ValidationError(
                "padding must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}
