//! Renders the natural-language edit instruction from an editing configuration.
//!
//! Rendering is deterministic: the same configuration always yields the same
//! text, and directives always appear in [`Directive::ORDER`]. Disabled
//! directives are left out entirely and the remaining lines are numbered
//! consecutively.

use crate::options::EditingConfiguration;
use serde::Serialize;

/// Opening lines that frame every instruction.
pub const DEFAULT_PREAMBLE: &str = "As a professional photo editor, generate a high-quality Bangladeshi passport size photo (40mm x 50mm).
Ensure the person is front-facing, centered, and eyes are at the upper third level.
Apply the following specific modifications based on user input:";

/// One line of the instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Directive {
    /// Background replacement color.
    Background,
    /// Clothing change or preservation.
    Attire,
    /// Facial detail enhancement.
    Face,
    /// Skin smoothing.
    Skin,
    /// Lighting mode.
    Lighting,
    /// Closing output requirements.
    Output,
}

impl Directive {
    /// Fixed rendering order.
    pub const ORDER: [Directive; 6] = [
        Self::Background,
        Self::Attire,
        Self::Face,
        Self::Skin,
        Self::Lighting,
        Self::Output,
    ];

    /// Heading used in the rendered line.
    pub fn heading(&self) -> &'static str {
        match self {
            Self::Background => "BACKGROUND",
            Self::Attire => "ATTIRE",
            Self::Face => "FACE",
            Self::Skin => "SKIN",
            Self::Lighting => "LIGHTING",
            Self::Output => "OUTPUT",
        }
    }

    fn render(&self, config: &EditingConfiguration) -> Option<String> {
        match self {
            Self::Background => Some(format!(
                "Remove existing background and set it to a solid {} color.",
                config.background_color
            )),
            Self::Attire if config.attire.replaces_clothing() => Some(format!(
                "Digitally replace the person's current clothing with a professional {} that fits naturally.",
                config.attire
            )),
            Self::Attire => Some("Keep original clothing.".to_string()),
            Self::Face => config
                .enhance_face
                .then(|| "Slightly enhance facial details for high-definition clarity.".to_string()),
            Self::Skin => config.smooth_skin.then(|| {
                "Smooth skin textures while preserving natural features (moles, beauty marks)."
                    .to_string()
            }),
            Self::Lighting => Some(format!(
                "Adjust the portrait to {} quality lighting, ensuring no harsh shadows on the face.",
                config.lighting
            )),
            Self::Output => {
                Some("A single professional passport portrait with clean edges.".to_string())
            }
        }
    }
}

/// A rendered instruction and the directives it contains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instruction {
    /// Full text sent to the model.
    pub text: String,
    /// Directives present, in rendering order.
    pub directives: Vec<Directive>,
}

impl Instruction {
    /// Returns true if the directive was rendered.
    pub fn contains(&self, directive: Directive) -> bool {
        self.directives.contains(&directive)
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

/// Builds instructions from a fixed template.
#[derive(Debug, Clone)]
pub struct InstructionBuilder {
    preamble: String,
}

impl Default for InstructionBuilder {
    fn default() -> Self {
        Self {
            preamble: DEFAULT_PREAMBLE.to_string(),
        }
    }
}

impl InstructionBuilder {
    /// Creates a builder with the default preamble.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the preamble (e.g., for another country's photo rules).
    pub fn with_preamble(mut self, preamble: impl Into<String>) -> Self {
        self.preamble = preamble.into();
        self
    }

    /// Renders the instruction for a configuration.
    pub fn build(&self, config: &EditingConfiguration) -> Instruction {
        let mut lines = vec![self.preamble.trim().to_string()];
        let mut directives = Vec::with_capacity(Directive::ORDER.len());
        let mut number = 0;

        for directive in Directive::ORDER {
            let Some(body) = directive.render(config) else {
                continue;
            };
            let line = if directive == Directive::Output {
                format!("{}: {}", directive.heading(), body)
            } else {
                number += 1;
                format!("{}. {}: {}", number, directive.heading(), body)
            };
            lines.push(line);
            directives.push(directive);
        }

        Instruction {
            text: lines.join("\n"),
            directives,
        }
    }
}
