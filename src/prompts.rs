//! Prompt payload for the downstream language-model step.
//!
//! The decomposer makes no network calls. This module only shapes a
//! [`DecomposedDocument`] into the multimodal user message of a
//! chat-completions request: the instruction, an optional text excerpt with
//! page markers, then every rendered picture grouped by page so the model can
//! cite page numbers.
//!
//! [`UserPart`] serialises to the wire shape directly:
//!
//! ```json
//! {"type": "text", "text": "..."}
//! {"type": "image_url", "image_url": {"url": "data:image/png;base64,...", "detail": "auto"}}
//! ```

use crate::output::{DecomposedDocument, ImageOrigin};
use serde::{Deserialize, Serialize};

/// Default system prompt for question answering over a decomposed PDF.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a careful, concise assistant analyzing a PDF. \
Use the provided text excerpt and extracted visuals (with page numbers) to ground your answers. \
Cite page numbers when referencing specific content. Avoid long verbatim quotes.";

/// Heading placed before the text excerpt.
pub const EXCERPT_HEADING: &str = "Extracted text excerpt (may be truncated):\n";

/// Heading placed before the per-page visuals.
pub const VISUALS_HEADING: &str = "Extracted visuals by page:";

/// Options for [`build_user_parts`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptOptions {
    /// Include the page-marked text excerpt. Default: true.
    pub include_text_excerpt: bool,
    /// Character budget for the excerpt, markers included. Default: 20000.
    pub max_text_chars: usize,
    /// `detail` hint sent with every image. Default: `"auto"`.
    pub image_detail: String,
}

impl Default for PromptOptions {
    fn default() -> Self {
        Self {
            include_text_excerpt: true,
            max_text_chars: 20_000,
            image_detail: "auto".to_string(),
        }
    }
}

/// One element of a multimodal user message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UserPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
    pub detail: String,
}

impl UserPart {
    pub fn text(text: impl Into<String>) -> Self {
        UserPart::Text { text: text.into() }
    }

    pub fn image(url: String, detail: &str) -> Self {
        UserPart::ImageUrl {
            image_url: ImageUrl {
                url,
                detail: detail.to_string(),
            },
        }
    }
}

/// Page-marked plain text of the document, cut at `max_chars` characters.
///
/// Pages without text are skipped. Each page starts with a
/// `--- Page N ---` marker; the cut may fall inside a marker.
pub fn text_excerpt(doc: &DecomposedDocument, max_chars: usize) -> String {
    let mut out = String::new();
    let mut used = 0usize;

    for page in &doc.pages {
        let body: Vec<&str> = page.texts().map(|t| t.text.as_str()).collect();
        if body.iter().all(|t| t.trim().is_empty()) {
            continue;
        }
        let chunk = format!("\n\n--- Page {} ---\n{}\n", page.number(), body.join("\n"));

        let remain = max_chars.saturating_sub(used);
        if remain == 0 {
            break;
        }
        let len = chunk.chars().count();
        if len > remain {
            out.extend(chunk.chars().take(remain));
            break;
        }
        out.push_str(&chunk);
        used += len;
    }

    out.trim().to_string()
}

/// Build the user message parts for the first turn of a conversation.
///
/// Failed image placeholders carry no pixels and are left out.
pub fn build_user_parts(
    doc: &DecomposedDocument,
    instruction: &str,
    options: &PromptOptions,
) -> Vec<UserPart> {
    let mut parts = vec![UserPart::text(instruction)];

    if options.include_text_excerpt {
        let excerpt = text_excerpt(doc, options.max_text_chars);
        if !excerpt.is_empty() {
            parts.push(UserPart::text(format!("{EXCERPT_HEADING}{excerpt}")));
        }
    }

    let mut visuals = Vec::new();
    for page in &doc.pages {
        let images: Vec<_> = page.images().filter(|img| !img.is_failed()).collect();
        if images.is_empty() {
            continue;
        }
        let count = |origin: ImageOrigin| images.iter().filter(|i| i.origin == origin).count();
        let label_bits: Vec<String> = [
            (count(ImageOrigin::Embedded), "embedded image(s)"),
            (count(ImageOrigin::Vector), "vector clip(s)"),
            (count(ImageOrigin::Composite), "merged image(s)"),
        ]
        .into_iter()
        .filter(|(n, _)| *n > 0)
        .map(|(n, what)| format!("{n} {what}"))
        .collect();

        visuals.push(UserPart::text(format!(
            "Page {} ({}):",
            page.number(),
            label_bits.join(", ")
        )));
        for image in images {
            visuals.push(UserPart::image(image.to_data_uri(), &options.image_detail));
        }
    }

    if !visuals.is_empty() {
        parts.push(UserPart::text(VISUALS_HEADING));
        parts.extend(visuals);
    }

    parts
}
