//! Selectable editing options and the default editing configuration.

use crate::error::{PassportError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A validated `#RGB` or `#RRGGBB` color, stored upper-case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor(String);

impl HexColor {
    /// Parses a hex color such as `#3b82f6` or `#FFF`.
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        let digits = value.strip_prefix('#').ok_or_else(|| {
            PassportError::InvalidRequest(format!("color must start with '#': {value}"))
        })?;
        if !matches!(digits.len(), 3 | 6) || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(PassportError::InvalidRequest(format!(
                "color must be #RGB or #RRGGBB: {value}"
            )));
        }
        Ok(Self(format!("#{}", digits.to_ascii_uppercase())))
    }

    /// Returns the color as a string (e.g., `#FFFFFF`).
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Plain white, the default passport background.
    pub fn white() -> Self {
        Self("#FFFFFF".into())
    }
}

impl TryFrom<String> for HexColor {
    type Error = PassportError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<HexColor> for String {
    fn from(color: HexColor) -> Self {
        color.0
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Clothing the model should put on the subject.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttireSelection {
    /// Keep whatever the subject is wearing.
    #[default]
    #[serde(rename = "No Change")]
    NoChange,
    /// Dark formal suit with shirt and tie.
    #[serde(rename = "Formal Suit")]
    FormalSuit,
    /// Black blazer over a shirt.
    #[serde(rename = "Black Blazer")]
    BlackBlazer,
    /// Plain white shirt.
    #[serde(rename = "White Shirt")]
    WhiteShirt,
    /// Plain blue shirt.
    #[serde(rename = "Blue Shirt")]
    BlueShirt,
    /// Traditional panjabi.
    Panjabi,
    /// Traditional saree.
    Saree,
}

impl AttireSelection {
    /// Every attire option, in display order.
    pub const ALL: [AttireSelection; 7] = [
        Self::NoChange,
        Self::FormalSuit,
        Self::BlackBlazer,
        Self::WhiteShirt,
        Self::BlueShirt,
        Self::Panjabi,
        Self::Saree,
    ];

    /// Returns the display label, which is also the wording used in instructions.
    pub fn label(&self) -> &'static str {
        match self {
            Self::NoChange => "No Change",
            Self::FormalSuit => "Formal Suit",
            Self::BlackBlazer => "Black Blazer",
            Self::WhiteShirt => "White Shirt",
            Self::BlueShirt => "Blue Shirt",
            Self::Panjabi => "Panjabi",
            Self::Saree => "Saree",
        }
    }

    /// Looks up an option by label or kebab-case slug (`formal-suit`).
    pub fn from_label(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|a| matches_label(a.label(), value))
    }

    /// Returns true if the subject's clothing is replaced.
    pub fn replaces_clothing(&self) -> bool {
        *self != Self::NoChange
    }
}

impl fmt::Display for AttireSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Lighting profile requested from the model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LightingMode {
    /// Natural, unaltered lighting.
    Normal,
    /// Brighter exposure.
    Bright,
    /// Even studio lighting.
    #[default]
    Studio,
    /// Let the model correct exposure and color.
    #[serde(rename = "Auto-Fix")]
    AutoFix,
}

impl LightingMode {
    /// Every lighting mode, in display order.
    pub const ALL: [LightingMode; 4] = [Self::Normal, Self::Studio, Self::Bright, Self::AutoFix];

    /// Returns the display label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Bright => "Bright",
            Self::Studio => "Studio",
            Self::AutoFix => "Auto-Fix",
        }
    }

    /// Looks up a mode by label or kebab-case slug (`auto-fix`).
    pub fn from_label(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|m| matches_label(m.label(), value))
    }
}

impl fmt::Display for LightingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn matches_label(label: &str, value: &str) -> bool {
    let value = value.trim();
    label.eq_ignore_ascii_case(value) || label.replace(' ', "-").eq_ignore_ascii_case(value)
}

/// A named background color offered as a one-click choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackgroundPreset {
    /// Display name.
    pub name: &'static str,
    /// Hex color value.
    pub value: &'static str,
}

/// Background presets commonly accepted for passport photos.
pub const BACKGROUND_PRESETS: [BackgroundPreset; 4] = [
    BackgroundPreset {
        name: "White",
        value: "#FFFFFF",
    },
    BackgroundPreset {
        name: "Classic Blue",
        value: "#3B82F6",
    },
    BackgroundPreset {
        name: "Sky Blue",
        value: "#BAE6FD",
    },
    BackgroundPreset {
        name: "Soft Gray",
        value: "#E5E7EB",
    },
];

/// The user's current editing intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditingConfiguration {
    /// Solid background color of the output.
    pub background_color: HexColor,
    /// Clothing replacement.
    pub attire: AttireSelection,
    /// Sharpen facial details.
    pub enhance_face: bool,
    /// Smooth skin texture.
    pub smooth_skin: bool,
    /// Lighting profile.
    pub lighting: LightingMode,
}

impl Default for EditingConfiguration {
    fn default() -> Self {
        Self {
            background_color: HexColor::white(),
            attire: AttireSelection::NoChange,
            enhance_face: true,
            smooth_skin: true,
            lighting: LightingMode::Studio,
        }
    }
}

/// A single user edit to the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum ConfigChange {
    /// New background color.
    BackgroundColor(HexColor),
    /// New attire.
    Attire(AttireSelection),
    /// Toggle facial detail enhancement.
    EnhanceFace(bool),
    /// Toggle skin smoothing.
    SmoothSkin(bool),
    /// New lighting mode.
    Lighting(LightingMode),
}

impl EditingConfiguration {
    /// Applies a change in place.
    pub fn apply(&mut self, change: ConfigChange) {
        match change {
            ConfigChange::BackgroundColor(color) => self.background_color = color,
            ConfigChange::Attire(attire) => self.attire = attire,
            ConfigChange::EnhanceFace(on) => self.enhance_face = on,
            ConfigChange::SmoothSkin(on) => self.smooth_skin = on,
            ConfigChange::Lighting(mode) => self.lighting = mode,
        }
    }
}

/// The options a session offers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionCatalog {
    /// One-click background colors. Any valid hex color is still accepted.
    pub backgrounds: Vec<BackgroundPreset>,
    /// Offered attire options.
    pub attire: Vec<AttireSelection>,
    /// Offered lighting modes.
    pub lighting: Vec<LightingMode>,
}

impl Default for OptionCatalog {
    fn default() -> Self {
        Self {
            backgrounds: BACKGROUND_PRESETS.to_vec(),
            attire: AttireSelection::ALL.to_vec(),
            lighting: LightingMode::ALL.to_vec(),
        }
    }
}

impl OptionCatalog {
    /// Catalog without Black Blazer and Auto-Fix.
    pub fn core() -> Self {
        let mut catalog = Self::default();
        catalog.attire.retain(|a| *a != AttireSelection::BlackBlazer);
        catalog.lighting.retain(|m| *m != LightingMode::AutoFix);
        catalog
    }

    /// Returns the preset whose color matches, if any.
    pub fn preset_for(&self, color: &HexColor) -> Option<&BackgroundPreset> {
        self.backgrounds.iter().find(|p| p.value == color.as_str())
    }

    /// Checks that a change only selects offered options.
    pub fn validate(&self, change: &ConfigChange) -> Result<()> {
        match change {
            ConfigChange::Attire(attire) if !self.attire.contains(attire) => Err(
                PassportError::UnsupportedOption(format!("attire '{attire}'")),
            ),
            ConfigChange::Lighting(mode) if !self.lighting.contains(mode) => Err(
                PassportError::UnsupportedOption(format!("lighting '{mode}'")),
            ),
            _ => Ok(()),
        }
    }
}
