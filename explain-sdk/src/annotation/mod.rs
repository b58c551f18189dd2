//! Click-to-explain front end
//!
//! The controller is toolkit-agnostic: the viewer supplies a [`SceneHost`],
//! an [`AnnotationSurface`] and a [`SpeechOutput`].

pub mod controller;
pub mod projector;
pub mod view;

pub use controller::{
    Annotation, AnnotationController, AnnotationSurface, ControllerState, Marker, PendingQuery, PointerInput,
    PointerOutcome, RayHit, SceneHost, SpeechOutput, ARMED_HINT,
};
pub use projector::{label_layout, pointer_to_ndc, project, Camera, CanvasSize, ElementRect, LabelLayout};
pub use view::{AnnotationView, ConnectorView, LabelView, Utterance};
