//! Saved layouts and layout presets.

use crate::ids::{LayoutId, PresetId};
use crate::widget::Widget;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A named snapshot of the full widget collection.
///
/// `widgets` is an owned deep copy; editing live widgets never reaches a
/// stored layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    pub id: LayoutId,
    pub name: String,
    pub widgets: Vec<Widget>,
    #[serde(default)]
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

impl Layout {
    /// Snapshot `widgets` under a fresh id.
    pub fn snapshot(name: impl Into<String>, widgets: &[Widget]) -> Self {
        Self {
            id: LayoutId::generate(),
            name: name.into(),
            widgets: widgets.to_vec(),
            is_default: false,
            created_at: Utc::now(),
        }
    }
}

/// Preset grouping shown in the preset switcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresetCategory {
    Trading,
    Research,
    Analysis,
    #[default]
    Custom,
}

impl fmt::Display for PresetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trading => write!(f, "trading"),
            Self::Research => write!(f, "research"),
            Self::Analysis => write!(f, "analysis"),
            Self::Custom => write!(f, "custom"),
        }
    }
}

/// A widget template that instantiates into a fresh widget group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preset {
    pub id: PresetId,
    pub name: String,
    pub description: String,
    pub category: PresetCategory,
    pub icon: String,
    /// Template widgets; their ids are only prefixes for generated ids.
    pub widgets: Vec<Widget>,
}

/// A user preset before it is assigned an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: PresetCategory,
    #[serde(default)]
    pub icon: String,
    pub widgets: Vec<Widget>,
}

impl PresetDraft {
    pub fn new(name: impl Into<String>, widgets: Vec<Widget>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            category: PresetCategory::Custom,
            icon: String::new(),
            widgets,
        }
    }

    pub(crate) fn into_preset(self, id: PresetId) -> Preset {
        Preset {
            id,
            name: self.name,
            description: self.description,
            category: self.category,
            icon: self.icon,
            widgets: self.widgets,
        }
    }
}

impl From<PresetDraft> for Preset {
    /// Assigns a fresh user preset id.
    fn from(draft: PresetDraft) -> Self {
        draft.into_preset(PresetId::generate_user())
    }
}
