//! Fakes shared by the pipeline and controller tests

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use glam::{Vec2, Vec3};

use crate::annotation::{
    AnnotationSurface, AnnotationView, Camera, CanvasSize, ElementRect, Marker, RayHit, SceneHost, SpeechOutput,
    Utterance,
};
use crate::core::GenerativeBackend;
use crate::error::{ErrorContext, Result, ServiceError};
use crate::explain::ImagePayload;

/// A model call seen by [`ScriptedBackend`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub model_id: String,
    pub with_image: bool,
    pub prompt: String,
}

type Script = Box<dyn Fn(&str, bool) -> Result<String> + Send + Sync>;

/// Backend whose answers come from a closure over `(model_id, with_image)`
pub struct ScriptedBackend {
    configured: bool,
    delay: Option<Duration>,
    script: Script,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedBackend {
    pub fn new(script: impl Fn(&str, bool) -> Result<String> + Send + Sync + 'static) -> Self {
        Self {
            configured: true,
            delay: None,
            script: Box::new(script),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn answering(text: &'static str) -> Self {
        Self::new(move |_, _| Ok(text.to_string()))
    }

    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::answering("unused")
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn called_models(&self) -> Vec<(String, bool)> {
        self.calls().into_iter().map(|c| (c.model_id, c.with_image)).collect()
    }
}

#[async_trait]
impl GenerativeBackend for ScriptedBackend {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn generate(&self, model_id: &str, prompt: &str, image: Option<&ImagePayload>) -> Result<String> {
        self.calls.lock().unwrap().push(Call {
            model_id: model_id.to_string(),
            with_image: image.is_some(),
            prompt: prompt.to_string(),
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        (self.script)(model_id, image.is_some())
    }
}

/// Gemini-shaped HTTP failure
pub fn gemini_error(status: u16, google_status: &str, inner: ServiceError) -> ServiceError {
    inner.with_context(
        ErrorContext::for_service("gemini")
            .status_code(status)
            .error_code(google_status),
    )
}

pub fn quota_error() -> ServiceError {
    gemini_error(
        429,
        "RESOURCE_EXHAUSTED",
        ServiceError::rate_limit("Resource has been exhausted (e.g. check quota)."),
    )
}

pub fn overloaded_error() -> ServiceError {
    gemini_error(503, "UNAVAILABLE", ServiceError::service("The model is overloaded. Please try again later."))
}

pub fn image_rejected_error() -> ServiceError {
    gemini_error(
        400,
        "INVALID_ARGUMENT",
        ServiceError::validation("Unable to process input image. Please retry or report in https://developers.generativeai.google/guide/troubleshooting"),
    )
}

pub fn internal_error() -> ServiceError {
    gemini_error(500, "INTERNAL", ServiceError::service("An internal error has occurred."))
}

/// `data:` URI of a three-byte JPEG header
pub const TINY_JPEG_URI: &str = "data:image/jpeg;base64,/9j/";

#[derive(Debug, Default)]
pub struct SceneState {
    pub hit: Option<RayHit>,
    pub capture: Option<String>,
    pub camera: Option<Camera>,
    pub events: Vec<&'static str>,
    pub markers: Vec<Marker>,
    pub raycasts: Vec<Vec2>,
}

/// Scene whose hit result and camera are set by the test
#[derive(Clone)]
pub struct FakeScene(pub Rc<RefCell<SceneState>>);

impl FakeScene {
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(SceneState {
            capture: Some(TINY_JPEG_URI.to_string()),
            ..SceneState::default()
        })))
    }

    pub fn set_hit(&self, name: &str, point: Vec3) {
        self.0.borrow_mut().hit = Some(RayHit {
            point,
            object_name: name.to_string(),
        });
    }

    pub fn set_miss(&self) {
        self.0.borrow_mut().hit = None;
    }

    pub fn set_camera(&self, camera: Camera) {
        self.0.borrow_mut().camera = Some(camera);
    }

    pub fn events(&self) -> Vec<&'static str> {
        self.0.borrow().events.clone()
    }

    pub fn last_marker(&self) -> Option<Marker> {
        self.0.borrow().markers.last().copied()
    }
}

/// Camera at z = 5 looking at the origin, square 800px canvas
pub fn front_camera() -> Camera {
    Camera::perspective(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y, 60.0, 1.0, 0.1, 100.0)
}

impl SceneHost for FakeScene {
    fn raycast(&self, ndc: Vec2, _camera: &Camera) -> Option<RayHit> {
        let mut state = self.0.borrow_mut();
        state.raycasts.push(ndc);
        state.hit.clone()
    }

    fn sync_marker(&mut self, marker: &Marker) {
        let mut state = self.0.borrow_mut();
        state.events.push("sync_marker");
        state.markers.push(*marker);
    }

    fn render_now(&mut self) {
        self.0.borrow_mut().events.push("render_now");
    }

    fn capture_jpeg(&mut self, _quality: f32) -> Option<String> {
        let mut state = self.0.borrow_mut();
        state.events.push("capture_jpeg");
        state.capture.clone()
    }

    fn restore_materials(&mut self) {
        self.0.borrow_mut().events.push("restore_materials");
    }

    fn camera(&self) -> Camera {
        self.0.borrow().camera.unwrap_or_else(front_camera)
    }

    fn canvas_size(&self) -> CanvasSize {
        CanvasSize::new(800.0, 800.0)
    }

    fn canvas_rect(&self) -> ElementRect {
        ElementRect::new(0.0, 0.0, 800.0, 800.0)
    }
}

#[derive(Debug, Default)]
pub struct SurfaceState {
    pub shown: Option<AnnotationView>,
    pub show_count: usize,
    pub statuses: Vec<String>,
}

/// Overlay that holds at most one view, like a real label layer
#[derive(Clone, Default)]
pub struct FakeSurface(pub Rc<RefCell<SurfaceState>>);

impl FakeSurface {
    pub fn shown(&self) -> Option<AnnotationView> {
        self.0.borrow().shown.clone()
    }

    pub fn last_status(&self) -> Option<String> {
        self.0.borrow().statuses.last().cloned()
    }
}

impl AnnotationSurface for FakeSurface {
    fn show(&mut self, view: &AnnotationView) {
        let mut state = self.0.borrow_mut();
        state.shown = Some(view.clone());
        state.show_count += 1;
    }

    fn clear(&mut self) {
        self.0.borrow_mut().shown = None;
    }

    fn set_status(&mut self, status: &str) {
        self.0.borrow_mut().statuses.push(status.to_string());
    }
}

#[derive(Debug, Default)]
pub struct SpeechState {
    pub spoken: Vec<Utterance>,
    pub cancels: usize,
}

#[derive(Clone, Default)]
pub struct FakeSpeech(pub Rc<RefCell<SpeechState>>);

impl FakeSpeech {
    pub fn cancels(&self) -> usize {
        self.0.borrow().cancels
    }

    pub fn spoken(&self) -> Vec<Utterance> {
        self.0.borrow().spoken.clone()
    }
}

impl SpeechOutput for FakeSpeech {
    fn speak(&mut self, utterance: &Utterance) {
        self.0.borrow_mut().spoken.push(utterance.clone());
    }

    fn cancel(&mut self) {
        self.0.borrow_mut().cancels += 1;
    }
}
