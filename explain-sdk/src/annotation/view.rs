//! What the annotation surface and speech output are asked to present

use glam::Vec2;

use crate::explain::ExplainResult;

use super::projector::LabelLayout;

/// Caption of the button that reads an annotation aloud
pub const LISTEN_LABEL: &str = "Listen";

/// Dot at the anchor plus the elbowed line to the label
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectorView {
    pub dot: Vec2,
    pub polyline: Vec<Vec2>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelView {
    /// Top-left corner in canvas pixels
    pub position: Vec2,
    pub title: String,
    pub description: String,
    pub listen_label: String,
}

/// One on-screen annotation. Shown and cleared as a unit.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationView {
    pub connector: ConnectorView,
    pub label: LabelView,
}

impl AnnotationView {
    pub fn new(layout: LabelLayout, result: &ExplainResult) -> Self {
        Self {
            connector: ConnectorView {
                dot: layout.anchor,
                polyline: layout.polyline,
            },
            label: LabelView {
                position: layout.label_origin,
                title: result.part_name.clone(),
                description: result.description.clone(),
                listen_label: LISTEN_LABEL.to_string(),
            },
        }
    }
}

/// Text to speak and the locale to speak it in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    pub text: String,
    pub locale: String,
}

impl Utterance {
    /// "<part name>. <description>"
    pub fn for_result(result: &ExplainResult, locale: &str) -> Self {
        Self {
            text: format!("{}. {}", result.part_name, result.description),
            locale: locale.to_string(),
        }
    }
}
