//! Prompt construction for part explanations

use once_cell::sync::Lazy;
use regex::Regex;

use super::request::ExplainRequest;

// Exported mesh names such as "Mesh_05", "Object.012", "node3" or "Cube001".
static GENERATED_LABEL: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:mesh|object|node|group|primitive|geometry|cube|sphere|cylinder|plane)?[\s_.\-]*\d+$").ok()
});

/// Whether a label looks auto-generated rather than descriptive
pub fn is_generated_label(label: &str) -> bool {
    GENERATED_LABEL
        .as_ref()
        .map_or(false, |re| re.is_match(label.trim()))
}

/// Build the single instruction prompt sent to every model of the plan
///
/// `with_image` must reflect whether the image part is actually attached to
/// this call, so the text-only retry does not mention a marker.
pub fn build_prompt(request: &ExplainRequest, with_image: bool) -> String {
    let mut prompt = format!(
        "You are an expert 3D tutor.\n\
         The user is looking at a 3D model of: {context}.\n\
         The user clicked on a sub-part named: \"{target}\".",
        context = request.context_label(),
        target = request.target_label(),
    );

    if with_image {
        prompt.push_str(
            "\n\nThe attached image is the user's current view. A red marker dot shows the exact \
             point the user clicked. Identify the structure directly under that marker and base \
             your answer on it, not on the rest of the image.",
        );
    }

    if is_generated_label(request.target_label()) {
        if with_image {
            prompt.push_str(
                "\nThe part name is an automatically generated identifier. Ignore it and rely on the \
                 image and the model context.",
            );
        } else {
            prompt.push_str(
                "\nThe part name is an automatically generated identifier. Use the model context to \
                 name the most likely structure.",
            );
        }
    }

    prompt.push_str(&format!(
        "\n\nTask:\n\
         1. Identify the part.\n\
         2. Explain its function concisely (max 2 sentences) in a friendly, educational tone.\n\
         3. Write both values in {language}.\n\n\
         Respond with ONLY a JSON object of exactly this shape:\n\
         {{\"part_name\": \"<name of the part>\", \"description\": \"<explanation>\"}}\n\
         Do not wrap the JSON in markdown code fences and do not add any other text.",
        language = request.language(),
    ));

    prompt
}
