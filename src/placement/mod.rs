//! Margin annotation layout.
//!
//! The placer maps a marker's original location to a target rectangle in
//! the margin freed by the transform, wraps the annotation text into it and
//! commits the result when it does not collide with anything already there.

mod layout;
pub mod metrics;
mod placer;

pub use layout::{layout_text, LaidOutText, TextLine};
pub use placer::{
    colliding_blocks, AnnotationLocation, AnnotationPlacer, AnnotationRequest, AnnotationStyle,
    MarginTarget, PlacedAnnotation, PlacementOutcome, SkipReason,
};
