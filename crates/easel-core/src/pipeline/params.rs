//! Action variant -> dispatch parameter tables.
//!
//! Each table is an exhaustive match over [`TaskAction`] with no wildcard arm:
//! a new variant does not compile until every table says what it maps to.

use crate::domain::TaskAction;

/// Zoom-out amount. Only `ZoomNear` zooms to 75; everything else gets 50.
pub fn zoom_ratio(action: TaskAction) -> &'static str {
    match action {
        TaskAction::ZoomNear => "75",
        TaskAction::ZoomFar
        | TaskAction::Create
        | TaskAction::Upscale
        | TaskAction::Variation
        | TaskAction::Reroll
        | TaskAction::Describe
        | TaskAction::Composite
        | TaskAction::PanUp
        | TaskAction::PanDown
        | TaskAction::PanLeft
        | TaskAction::PanRight
        | TaskAction::VaryHigh
        | TaskAction::VaryLow => "50",
    }
}

/// Variation strength. Only `VaryHigh` is strong.
pub fn vary_strength(action: TaskAction) -> &'static str {
    match action {
        TaskAction::VaryHigh => "high_variation",
        TaskAction::VaryLow
        | TaskAction::Create
        | TaskAction::Upscale
        | TaskAction::Variation
        | TaskAction::Reroll
        | TaskAction::Describe
        | TaskAction::Composite
        | TaskAction::ZoomNear
        | TaskAction::ZoomFar
        | TaskAction::PanUp
        | TaskAction::PanDown
        | TaskAction::PanLeft
        | TaskAction::PanRight => "low_variation",
    }
}

/// Pan direction. Non-pan actions fall back to `pan_up` rather than failing.
pub fn pan_direction(action: TaskAction) -> &'static str {
    match action {
        TaskAction::PanUp => "pan_up",
        TaskAction::PanDown => "pan_down",
        TaskAction::PanLeft => "pan_left",
        TaskAction::PanRight => "pan_right",
        TaskAction::Create
        | TaskAction::Upscale
        | TaskAction::Variation
        | TaskAction::Reroll
        | TaskAction::Describe
        | TaskAction::Composite
        | TaskAction::ZoomNear
        | TaskAction::ZoomFar
        | TaskAction::VaryHigh
        | TaskAction::VaryLow => "pan_up",
    }
}
