//! Click-to-explain state machine
//!
//! ```text
//! Idle --toggle--> Armed --hit--> Querying --answer--> Annotated
//!   ^                |  ^            |                    |
//!   +----toggle------+  +----miss----+--------miss--------+
//! ```
//!
//! Every query carries a generation number. Toggling, closing, a miss or a
//! newer click advance the generation, and an answer for an older generation
//! is dropped.

use glam::{Vec2, Vec3};
use log::{debug, info, warn};

use crate::config::ExplainerSettings;
use crate::core::GenerativeBackend;
use crate::error::FailureClassifier;
use crate::explain::{parse_response, ExplainRequest, ExplainResult, FallbackClient, ImagePayload, Language};

use super::projector::{label_layout, pointer_to_ndc, project, Camera, CanvasSize, ElementRect};
use super::view::{AnnotationView, Utterance};

/// Status shown while armed and waiting for a click
pub const ARMED_HINT: &str = "Tap any part of the model to learn about it!";

/// Context used until the viewer names the loaded model
pub const DEFAULT_CONTEXT_LABEL: &str = "3D model";

const UNNAMED_PART: &str = "Unnamed part";

/// Nearest surface under the pointer
#[derive(Debug, Clone, PartialEq)]
pub struct RayHit {
    pub point: Vec3,
    pub object_name: String,
}

/// The 3D glyph placed at the queried point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Marker {
    pub position: Vec3,
    pub visible: bool,
}

impl Marker {
    pub fn hidden() -> Self {
        Self {
            position: Vec3::ZERO,
            visible: false,
        }
    }
}

/// The explanation currently pinned to the model
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    /// Last projected position; `None` while the anchor is behind the camera
    pub screen_position: Option<Vec2>,
    pub world_anchor: Vec3,
    pub content: ExplainResult,
}

/// Pointer position in client (page) pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerInput {
    pub client_x: f32,
    pub client_y: f32,
}

impl PointerInput {
    pub fn new(client_x: f32, client_y: f32) -> Self {
        Self { client_x, client_y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Armed,
    Querying { generation: u64 },
    Annotated,
}

/// A query the caller must run and hand back to [`AnnotationController::complete_query`]
#[derive(Debug, Clone)]
pub struct PendingQuery {
    pub generation: u64,
    pub request: ExplainRequest,
    pub anchor: Vec3,
}

#[derive(Debug, Clone)]
pub enum PointerOutcome {
    /// Explain mode is off or the pointer was over an excluded region
    Ignored,
    /// Nothing under the pointer; marker and annotation were cleared
    Missed,
    Query(PendingQuery),
}

/// The 3D viewer hosting the model
pub trait SceneHost {
    fn raycast(&self, ndc: Vec2, camera: &Camera) -> Option<RayHit>;

    /// Show, move or hide the marker glyph
    fn sync_marker(&mut self, marker: &Marker);

    /// Render a frame synchronously so the next capture reflects scene changes
    fn render_now(&mut self);

    /// JPEG data URI of the canvas, or `None` when capture is unavailable
    fn capture_jpeg(&mut self, quality: f32) -> Option<String>;

    /// Undo any highlight applied to meshes
    fn restore_materials(&mut self);

    fn camera(&self) -> Camera;

    /// Rendered size in CSS pixels, matching the width and height of `canvas_rect`
    fn canvas_size(&self) -> CanvasSize;

    fn canvas_rect(&self) -> ElementRect;
}

/// Overlay that draws the label and connector
pub trait AnnotationSurface {
    /// Replace whatever is shown with `view`
    fn show(&mut self, view: &AnnotationView);

    fn clear(&mut self);

    fn set_status(&mut self, status: &str);
}

pub trait SpeechOutput {
    fn speak(&mut self, utterance: &Utterance);

    fn cancel(&mut self);
}

struct InFlight {
    generation: u64,
    target_label: String,
    anchor: Vec3,
}

/// Owns explain-mode state and drives the scene, overlay and speech
pub struct AnnotationController<H, S, V> {
    host: H,
    surface: S,
    speech: V,
    state: ControllerState,
    generation: u64,
    in_flight: Option<InFlight>,
    marker: Marker,
    annotation: Option<Annotation>,
    language: Language,
    context_label: String,
    excluded_regions: Vec<ElementRect>,
    jpeg_quality: f32,
}

impl<H, S, V> AnnotationController<H, S, V>
where
    H: SceneHost,
    S: AnnotationSurface,
    V: SpeechOutput,
{
    pub fn new(host: H, surface: S, speech: V, settings: &ExplainerSettings) -> Self {
        Self {
            host,
            surface,
            speech,
            state: ControllerState::Idle,
            generation: 0,
            in_flight: None,
            marker: Marker::hidden(),
            annotation: None,
            language: settings.default_language.clone(),
            context_label: DEFAULT_CONTEXT_LABEL.to_string(),
            excluded_regions: Vec::new(),
            jpeg_quality: settings.jpeg_quality,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state != ControllerState::Idle
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn marker(&self) -> &Marker {
        &self.marker
    }

    pub fn annotation(&self) -> Option<&Annotation> {
        self.annotation.as_ref()
    }

    pub fn language(&self) -> &Language {
        &self.language
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn speech(&self) -> &V {
        &self.speech
    }

    /// Language for subsequent queries and speech
    pub fn set_language(&mut self, language: Language) {
        debug!("explain language set to {}", language);
        self.language = language;
    }

    /// Name of the loaded model, sent as context with every query
    pub fn set_context_label(&mut self, label: impl Into<String>) {
        let label = label.into();
        self.context_label = if label.trim().is_empty() {
            DEFAULT_CONTEXT_LABEL.to_string()
        } else {
            label.trim().to_string()
        };
    }

    /// Clicks inside `rect` (control panels) never start a query
    pub fn add_excluded_region(&mut self, rect: ElementRect) {
        self.excluded_regions.push(rect);
    }

    /// Switch explain mode on or off
    pub fn toggle_mode(&mut self) -> ControllerState {
        self.reset();

        if self.state == ControllerState::Idle {
            self.state = ControllerState::Armed;
            self.surface.set_status(ARMED_HINT);
            info!("explain mode on");
        } else {
            self.state = ControllerState::Idle;
            self.surface.set_status("");
            info!("explain mode off");
        }

        self.state
    }

    /// Leave explain mode
    pub fn close(&mut self) {
        self.reset();
        self.state = ControllerState::Idle;
        self.surface.set_status("");
    }

    /// Start a query for the surface under `pointer`.
    ///
    /// A hit places the marker, renders and captures the canvas (in that
    /// order) and returns the request to run.
    pub fn begin_query(&mut self, pointer: PointerInput) -> PointerOutcome {
        if self.state == ControllerState::Idle {
            return PointerOutcome::Ignored;
        }

        if self
            .excluded_regions
            .iter()
            .any(|rect| rect.contains(pointer.client_x, pointer.client_y))
        {
            debug!("pointer over a control panel, ignoring");
            return PointerOutcome::Ignored;
        }

        let ndc = pointer_to_ndc(pointer.client_x, pointer.client_y, self.host.canvas_rect());
        let camera = self.host.camera();

        let Some(hit) = self.host.raycast(ndc, &camera) else {
            debug!("pointer missed the model");
            self.clear_selection();
            self.state = ControllerState::Armed;
            self.surface.set_status(ARMED_HINT);
            return PointerOutcome::Missed;
        };

        self.marker = Marker {
            position: hit.point,
            visible: true,
        };
        self.host.sync_marker(&self.marker);
        self.host.render_now();
        let image = self.capture();

        self.speech.cancel();
        self.annotation = None;
        self.surface.clear();

        let target_label = if hit.object_name.trim().is_empty() {
            UNNAMED_PART.to_string()
        } else {
            hit.object_name.trim().to_string()
        };

        let request = match ExplainRequest::new(
            target_label.clone(),
            self.context_label.clone(),
            image,
            self.language.clone(),
        ) {
            Ok(request) => request,
            Err(e) => {
                warn!("could not build a query for {}: {}", target_label, e);
                self.clear_selection();
                self.state = ControllerState::Armed;
                return PointerOutcome::Ignored;
            }
        };

        self.generation += 1;
        self.in_flight = Some(InFlight {
            generation: self.generation,
            target_label: target_label.clone(),
            anchor: hit.point,
        });
        self.state = ControllerState::Querying {
            generation: self.generation,
        };
        self.surface.set_status(&format!("Analyzing {}...", target_label));
        info!("query #{} for {}", self.generation, target_label);

        PointerOutcome::Query(PendingQuery {
            generation: self.generation,
            request,
            anchor: hit.point,
        })
    }

    /// Apply an answer. Returns `false` when the answer belongs to a query
    /// that has since been superseded.
    pub fn complete_query(&mut self, generation: u64, raw_text: &str) -> bool {
        let current = matches!(self.state, ControllerState::Querying { generation: g } if g == generation);
        let in_flight = match self.in_flight.take() {
            Some(in_flight) if current && in_flight.generation == generation => in_flight,
            other => {
                self.in_flight = other;
                debug!("discarding stale answer for query #{} (current #{})", generation, self.generation);
                return false;
            }
        };

        let result = parse_response(raw_text, &in_flight.target_label);
        self.annotation = Some(Annotation {
            screen_position: None,
            world_anchor: in_flight.anchor,
            content: result,
        });
        self.state = ControllerState::Annotated;
        self.surface.set_status("");
        self.present();

        true
    }

    /// Run a full click: hit test, query, annotate
    pub async fn handle_pointer<B, C>(&mut self, pointer: PointerInput, client: &FallbackClient<B, C>) -> bool
    where
        B: GenerativeBackend,
        C: FailureClassifier,
    {
        match self.begin_query(pointer) {
            PointerOutcome::Query(pending) => {
                let text = client.query(&pending.request).await;
                self.complete_query(pending.generation, &text)
            }
            PointerOutcome::Ignored | PointerOutcome::Missed => false,
        }
    }

    /// Re-anchor the annotation after the camera moved
    pub fn on_camera_changed(&mut self) {
        if self.annotation.is_some() {
            self.present();
        }
    }

    /// Read the current annotation aloud in the selected language
    pub fn listen(&mut self) -> bool {
        let Some(annotation) = self.annotation.as_ref().filter(|_| self.state == ControllerState::Annotated) else {
            return false;
        };

        let utterance = Utterance::for_result(&annotation.content, self.language.locale());
        self.speech.cancel();
        self.speech.speak(&utterance);
        true
    }

    fn capture(&mut self) -> Option<ImagePayload> {
        let uri = self.host.capture_jpeg(self.jpeg_quality)?;
        match ImagePayload::from_data_uri(&uri) {
            Ok(image) => Some(image),
            Err(e) => {
                warn!("discarding unusable canvas capture: {}", e);
                None
            }
        }
    }

    fn present(&mut self) {
        let camera = self.host.camera();
        let canvas = self.host.canvas_size();
        let Some(annotation) = self.annotation.as_mut() else {
            return;
        };

        self.surface.clear();
        annotation.screen_position = project(annotation.world_anchor, &camera, canvas);
        match annotation.screen_position {
            Some(anchor) => {
                let view = AnnotationView::new(label_layout(anchor), &annotation.content);
                self.surface.show(&view);
            }
            None => debug!("annotation anchor is behind the camera, hiding label"),
        }
    }

    fn clear_selection(&mut self) {
        self.generation += 1;
        self.in_flight = None;
        self.marker = Marker::hidden();
        self.host.sync_marker(&self.marker);
        self.annotation = None;
        self.surface.clear();
        self.speech.cancel();
    }

    fn reset(&mut self) {
        self.clear_selection();
        self.host.restore_materials();
    }
}
