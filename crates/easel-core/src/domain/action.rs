//! The closed set of job kinds.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What a task asks the remote backend to do.
///
/// Serialized as SCREAMING_SNAKE_CASE (`ZOOM_NEAR`, `PAN_LEFT`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskAction {
    Create,
    Upscale,
    Variation,
    Reroll,
    Describe,
    Composite,
    ZoomNear,
    ZoomFar,
    PanUp,
    PanDown,
    PanLeft,
    PanRight,
    VaryHigh,
    VaryLow,
}

impl TaskAction {
    pub const ALL: [TaskAction; 14] = [
        TaskAction::Create,
        TaskAction::Upscale,
        TaskAction::Variation,
        TaskAction::Reroll,
        TaskAction::Describe,
        TaskAction::Composite,
        TaskAction::ZoomNear,
        TaskAction::ZoomFar,
        TaskAction::PanUp,
        TaskAction::PanDown,
        TaskAction::PanLeft,
        TaskAction::PanRight,
        TaskAction::VaryHigh,
        TaskAction::VaryLow,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskAction::Create => "CREATE",
            TaskAction::Upscale => "UPSCALE",
            TaskAction::Variation => "VARIATION",
            TaskAction::Reroll => "REROLL",
            TaskAction::Describe => "DESCRIBE",
            TaskAction::Composite => "COMPOSITE",
            TaskAction::ZoomNear => "ZOOM_NEAR",
            TaskAction::ZoomFar => "ZOOM_FAR",
            TaskAction::PanUp => "PAN_UP",
            TaskAction::PanDown => "PAN_DOWN",
            TaskAction::PanLeft => "PAN_LEFT",
            TaskAction::PanRight => "PAN_RIGHT",
            TaskAction::VaryHigh => "VARY_HIGH",
            TaskAction::VaryLow => "VARY_LOW",
        }
    }
}

impl fmt::Display for TaskAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output aspect for a composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompositeDimensions {
    Portrait,
    #[default]
    Square,
    Landscape,
}

impl CompositeDimensions {
    /// Aspect ratio understood by the backend.
    pub fn ratio(self) -> &'static str {
        match self {
            CompositeDimensions::Portrait => "2:3",
            CompositeDimensions::Square => "1:1",
            CompositeDimensions::Landscape => "3:2",
        }
    }
}
