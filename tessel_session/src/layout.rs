//! Flat, declarative layout descriptions.
//!
//! A layout is a map from object name to [`LayoutObject`]. Objects refer to
//! their parent by name, so the map can be listed in any order; the
//! [`resolver`](crate::resolver) winds it into a hierarchy.

use std::collections::BTreeMap;
use std::fmt;

use log::warn;
use serde::{Deserialize, Serialize};

/// A flat layout keyed by object name.
pub type FlatLayout = BTreeMap<String, LayoutObject>;

/// Declared type of a layout object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ObjectKind {
    /// Top-level window.
    Window,
    /// Terminal pane.
    Terminal,
    /// Tabbed container.
    Notebook,
    /// Side-by-side split.
    HPaned,
    /// Stacked split.
    VPaned,
    /// Any type this crate doesn't know how to build.
    Other(String),
}

impl ObjectKind {
    /// Whether this object is a top-level window.
    pub fn is_window(&self) -> bool {
        matches!(self, ObjectKind::Window)
    }

    /// Canonical type name.
    pub fn as_str(&self) -> &str {
        match self {
            ObjectKind::Window => "Window",
            ObjectKind::Terminal => "Terminal",
            ObjectKind::Notebook => "Notebook",
            ObjectKind::HPaned => "HPaned",
            ObjectKind::VPaned => "VPaned",
            ObjectKind::Other(name) => name,
        }
    }
}

impl From<String> for ObjectKind {
    fn from(name: String) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "window" => ObjectKind::Window,
            "terminal" => ObjectKind::Terminal,
            "notebook" => ObjectKind::Notebook,
            "hpaned" => ObjectKind::HPaned,
            "vpaned" => ObjectKind::VPaned,
            _ => ObjectKind::Other(name),
        }
    }
}

impl From<&str> for ObjectKind {
    fn from(name: &str) -> Self {
        ObjectKind::from(name.to_owned())
    }
}

impl From<ObjectKind> for String {
    fn from(kind: ObjectKind) -> Self {
        kind.as_str().to_owned()
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One object of a flat layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutObject {
    /// Declared type.
    #[serde(rename = "type")]
    pub kind: ObjectKind,
    /// Name of the parent object. Required for everything but windows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Remaining attributes.
    #[serde(flatten)]
    pub attributes: LayoutAttributes,
}

impl LayoutObject {
    /// Create an object with no attributes.
    pub fn new(kind: impl Into<ObjectKind>, parent: Option<&str>) -> Self {
        Self {
            kind: kind.into(),
            parent: parent.map(str::to_owned),
            attributes: LayoutAttributes::default(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with(mut self, f: impl FnOnce(&mut LayoutAttributes)) -> Self {
        f(&mut self.attributes);
        self
    }
}

/// Typed optional attributes of a layout object.
///
/// `None` (or an empty list) means unset; empty strings read from a
/// configuration file are treated the same way once [`strip_empty`] ran.
///
/// [`strip_empty`]: LayoutAttributes::strip_empty
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutAttributes {
    /// Window position as `"x:y"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    /// Window size as `[width, height]`.
    #[serde(default, with = "dimensions", skip_serializing_if = "Option::is_none")]
    pub size: Option<(i32, i32)>,
    /// Title override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Whether the window is maximised.
    #[serde(default, with = "flag", skip_serializing_if = "Option::is_none")]
    pub maximised: Option<bool>,
    /// Whether the window is fullscreen.
    #[serde(default, with = "flag", skip_serializing_if = "Option::is_none")]
    pub fullscreen: Option<bool>,
    /// Position among siblings.
    #[serde(default, with = "number", skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
    /// Split ratio of a paned container.
    #[serde(default, with = "number", skip_serializing_if = "Option::is_none")]
    pub ratio: Option<f32>,
    /// Pane identifier to reuse.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    /// Broadcast group of a pane.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Profile of a pane.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    /// Command override of a pane.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Working directory of a pane.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
    /// Tab labels of a notebook, by page.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    /// Selected page of a notebook.
    #[serde(default, with = "number", skip_serializing_if = "Option::is_none")]
    pub active_page: Option<usize>,
    /// Last focused pane: one entry for a window, one per page for a notebook.
    #[serde(default, with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub last_active_term: Vec<String>,
    /// Whether this window was the last active one.
    #[serde(default, with = "flag", skip_serializing_if = "Option::is_none")]
    pub last_active_window: Option<bool>,
    /// Any other scalar attributes, kept in text form.
    #[serde(flatten, deserialize_with = "scalars::deserialize")]
    pub extra: BTreeMap<String, String>,
}

impl LayoutAttributes {
    /// Drop every attribute holding an empty string.
    pub fn strip_empty(&mut self) {
        for field in [
            &mut self.position,
            &mut self.title,
            &mut self.uuid,
            &mut self.group,
            &mut self.profile,
            &mut self.command,
            &mut self.directory,
        ] {
            if field.as_deref() == Some("") {
                *field = None;
            }
        }
        if self.last_active_term.iter().all(String::is_empty) {
            self.last_active_term.clear();
        }
        self.extra.retain(|_, value| !value.is_empty());
    }

    /// Parse the `"x:y"` position, if present and well formed.
    pub fn parsed_position(&self) -> Option<(i32, i32)> {
        let position = self.position.as_deref()?;
        let parsed = position
            .split_once(':')
            .filter(|(_, y)| !y.contains(':'))
            .and_then(|(x, y)| Some((x.trim().parse().ok()?, y.trim().parse().ok()?)));
        if parsed.is_none() {
            warn!("Ignoring malformed position {position:?}");
        }
        parsed
    }
}

/// Serde adapter for `"True"`/`"False"` flags.
mod flag {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bool(bool),
        Text(String),
    }

    pub fn serialize<S: Serializer>(value: &Option<bool>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(true) => serializer.serialize_str("True"),
            Some(false) => serializer.serialize_str("False"),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
        Ok(match Option::<Raw>::deserialize(deserializer)? {
            Some(Raw::Bool(value)) => Some(value),
            Some(Raw::Text(text)) if text.is_empty() => None,
            Some(Raw::Text(text)) => Some(text == "True"),
            None => None,
        })
    }
}

/// Serde adapter for `[width, height]` pairs given as numbers or numeric strings.
mod dimensions {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Component {
        Int(i64),
        Text(String),
    }

    impl Component {
        fn value<E: Error>(self) -> Result<i32, E> {
            match self {
                Component::Int(value) => i32::try_from(value).map_err(E::custom),
                Component::Text(text) => text.trim().parse().map_err(E::custom),
            }
        }
    }

    pub fn serialize<S: Serializer>(
        value: &Option<(i32, i32)>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some((width, height)) => [*width, *height].serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<(i32, i32)>, D::Error> {
        let Some(parts) = Option::<Vec<Component>>::deserialize(deserializer)? else {
            return Ok(None);
        };
        let mut parts = parts.into_iter();
        match (parts.next(), parts.next(), parts.next()) {
            (Some(width), Some(height), None) => Ok(Some((width.value()?, height.value()?))),
            _ => Err(D::Error::custom("size must have exactly two components")),
        }
    }
}

/// Serde adapter for numbers that may also be written as numeric strings.
///
/// Values that don't parse are dropped with a warning.
mod number {
    use std::str::FromStr;

    use log::warn;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Float(f64),
        Text(String),
    }

    pub fn serialize<S: Serializer, T: Serialize>(
        value: &Option<T>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        value.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>, T: FromStr>(
        deserializer: D,
    ) -> Result<Option<T>, D::Error> {
        let text = match Option::<Raw>::deserialize(deserializer)? {
            Some(Raw::Int(value)) => value.to_string(),
            Some(Raw::Float(value)) => value.to_string(),
            Some(Raw::Text(text)) => text,
            None => return Ok(None),
        };
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        match text.parse() {
            Ok(value) => Ok(Some(value)),
            Err(_) => {
                warn!("Ignoring malformed numeric attribute {text:?}");
                Ok(None)
            },
        }
    }
}

/// Deserializer for the free-form attribute map.
///
/// Numbers and booleans are stored as text; tables and arrays are dropped
/// with a warning.
mod scalars {
    use std::collections::BTreeMap;

    use log::warn;
    use serde::de::IgnoredAny;
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Text(String),
        Bool(bool),
        Int(i64),
        Float(f64),
        Other(IgnoredAny),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<String, String>, D::Error> {
        let raw = BTreeMap::<String, Scalar>::deserialize(deserializer)?;
        Ok(raw
            .into_iter()
            .filter_map(|(key, value)| {
                let text = match value {
                    Scalar::Text(text) => text,
                    Scalar::Bool(true) => "True".to_owned(),
                    Scalar::Bool(false) => "False".to_owned(),
                    Scalar::Int(value) => value.to_string(),
                    Scalar::Float(value) => value.to_string(),
                    Scalar::Other(_) => {
                        warn!("Ignoring non-scalar attribute {key:?}");
                        return None;
                    },
                };
                Some((key, text))
            })
            .collect())
    }
}

/// Serde adapter accepting either one string or a list of strings.
mod one_or_many {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        One(String),
        Many(Vec<String>),
    }

    pub fn serialize<S: Serializer>(value: &[String], serializer: S) -> Result<S::Ok, S::Error> {
        value.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
        Ok(match Option::<Raw>::deserialize(deserializer)? {
            Some(Raw::One(value)) => vec![value],
            Some(Raw::Many(values)) => values,
            None => Vec::new(),
        })
    }
}
