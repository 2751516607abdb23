//! Identifiers for widgets, layouts and presets.
//!
//! Generated ids follow `{prefix}-{unix_ms}-{random}` so that two ids minted
//! in the same millisecond still differ.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Length of the random suffix appended to generated ids.
const RANDOM_SUFFIX_LEN: usize = 9;

fn random_suffix() -> String {
    Uuid::new_v4().simple().to_string()[..RANDOM_SUFFIX_LEN].to_string()
}

pub(crate) fn timestamped(prefix: &str) -> String {
    let ts = chrono::Utc::now().timestamp_millis();
    format!("{prefix}-{ts}-{}", random_suffix())
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing id string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

string_id!(
    /// Widget identifier, unique within one dashboard.
    WidgetId
);

string_id!(
    /// Saved layout identifier.
    LayoutId
);

string_id!(
    /// Preset identifier (built-in or user-authored).
    PresetId
);

impl WidgetId {
    /// Fresh id for a widget created from the palette.
    ///
    /// Format: `widget-{timestamp_ms}-{random}`
    pub fn generate() -> Self {
        Self(timestamped("widget"))
    }

    /// Fresh id for a widget instantiated from a template widget.
    ///
    /// Format: `{template_id}-{timestamp_ms}-{random}`
    pub fn derived_from(template: &WidgetId) -> Self {
        Self(timestamped(&template.0))
    }
}

impl LayoutId {
    /// Format: `layout-{timestamp_ms}-{random}`
    pub fn generate() -> Self {
        Self(timestamped("layout"))
    }
}

impl PresetId {
    /// Id for a user-authored preset.
    ///
    /// Format: `user-preset-{timestamp_ms}-{random}`
    pub fn generate_user() -> Self {
        Self(timestamped("user-preset"))
    }
}
