//! Component types and the kind index used for O(1) lookup.

use std::fmt;

use playfield_common::{Color, Rect};
use serde::{Deserialize, Serialize};

use crate::error::EntityError;
use crate::physical::Physical;

/// Discriminant of [`Component`]; also the slot index inside an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ComponentKind {
    Physical,
    Graphic,
    Priority,
    Text,
    Gauge,
    Grid,
    Target,
}

impl ComponentKind {
    pub const COUNT: usize = 7;

    pub const ALL: [ComponentKind; Self::COUNT] = [
        Self::Physical,
        Self::Graphic,
        Self::Priority,
        Self::Text,
        Self::Gauge,
        Self::Grid,
        Self::Target,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Outline drawn for a [`Graphic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Shape {
    #[default]
    Rectangle,
    Ellipse,
}

/// Drawing properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Graphic {
    pub color: Option<Color>,
    pub fill_color: Option<Color>,
    pub shape: Shape,
    /// Draw bounds, synced from the entity's physical box by the engine.
    pub bounds: Rect,
    /// Drawn in screen space, unaffected by the camera.
    pub stick_to_viewport: bool,
}

impl Default for Graphic {
    fn default() -> Self {
        Self {
            color: Some(Color::WHITE),
            fill_color: None,
            shape: Shape::Rectangle,
            bounds: Rect::default(),
            stick_to_viewport: false,
        }
    }
}

impl Graphic {
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            ..Self::default()
        }
    }

    pub fn with_color(mut self, color: Option<Color>) -> Self {
        self.color = color;
        self
    }

    pub fn with_fill(mut self, fill: Option<Color>) -> Self {
        self.fill_color = fill;
        self
    }

    pub fn sticky(mut self) -> Self {
        self.stick_to_viewport = true;
        self
    }
}

/// Render and processing order key; lower draws first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Priority(pub i32);

/// A text label. A `{}` in the template is replaced by the current value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    pub template: String,
    pub value: Option<String>,
    pub color: Color,
}

impl Text {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            value: None,
            color: Color::WHITE,
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_value(mut self, value: impl ToString) -> Self {
        self.value = Some(value.to_string());
        self
    }

    pub fn set_value(&mut self, value: impl ToString) {
        self.value = Some(value.to_string());
    }

    /// The text to display.
    pub fn render(&self) -> String {
        match &self.value {
            Some(value) if self.template.contains("{}") => self.template.replacen("{}", value, 1),
            _ => self.template.clone(),
        }
    }
}

/// A bar showing `value` within `[min, max]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gauge {
    pub value: f64,
    pub min: f64,
    pub max: f64,
    pub color: Color,
}

impl Default for Gauge {
    fn default() -> Self {
        Self::new(0.0, 0.0, 100.0)
    }
}

impl Gauge {
    pub fn new(value: f64, min: f64, max: f64) -> Self {
        Self {
            value,
            min,
            max,
            color: Color::BLUE,
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    /// Fill ratio in `[0, 1]`; zero for an empty range.
    pub fn ratio(&self) -> f64 {
        let span = self.max - self.min;
        if span <= 0.0 {
            return 0.0;
        }
        ((self.value - self.min) / span).clamp(0.0, 1.0)
    }
}

/// A tile grid covering `area`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    pub tile_width: u32,
    pub tile_height: u32,
    pub area: Rect,
}

impl Grid {
    pub fn new(tile_width: u32, tile_height: u32) -> Self {
        Self {
            tile_width,
            tile_height,
            area: Rect::default(),
        }
    }

    pub fn with_area(mut self, area: Rect) -> Self {
        self.area = area;
        self
    }

    pub fn columns(&self) -> u32 {
        if self.tile_width == 0 {
            return 0;
        }
        (self.area.width() / f64::from(self.tile_width)).ceil() as u32
    }

    pub fn rows(&self) -> u32 {
        if self.tile_height == 0 {
            return 0;
        }
        (self.area.height() / f64::from(self.tile_height)).ceil() as u32
    }
}

/// Tracking target of a camera: the name of an entity in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub target: Option<String>,
    tween: f64,
}

impl Default for Target {
    fn default() -> Self {
        Self {
            target: None,
            tween: 1.0,
        }
    }
}

impl Target {
    pub fn new(target: impl Into<String>, tween: f64) -> Result<Self, EntityError> {
        let mut t = Self {
            target: Some(target.into()),
            tween: 1.0,
        };
        t.set_tween(tween)?;
        Ok(t)
    }

    pub fn tween(&self) -> f64 {
        self.tween
    }

    /// Tween factors must lie in `(0, 1]`; NaN is rejected too.
    pub fn set_tween(&mut self, tween: f64) -> Result<(), EntityError> {
        if !(tween > 0.0 && tween <= 1.0) {
            return Err(EntityError::InvalidTween(tween));
        }
        self.tween = tween;
        Ok(())
    }
}

/// Every component an entity can hold, at most one per kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Component {
    Physical(Physical),
    Graphic(Graphic),
    Priority(Priority),
    Text(Text),
    Gauge(Gauge),
    Grid(Grid),
    Target(Target),
}

impl Component {
    pub fn kind(&self) -> ComponentKind {
        match self {
            Self::Physical(_) => ComponentKind::Physical,
            Self::Graphic(_) => ComponentKind::Graphic,
            Self::Priority(_) => ComponentKind::Priority,
            Self::Text(_) => ComponentKind::Text,
            Self::Gauge(_) => ComponentKind::Gauge,
            Self::Grid(_) => ComponentKind::Grid,
            Self::Target(_) => ComponentKind::Target,
        }
    }
}

/// Typed access to one [`Component`] variant.
pub trait ComponentType: Sized + Into<Component> {
    const KIND: ComponentKind;

    fn from_component(component: &Component) -> Option<&Self>;

    fn from_component_mut(component: &mut Component) -> Option<&mut Self>;
}

macro_rules! component_type {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Component {
                fn from(c: $variant) -> Self {
                    Component::$variant(c)
                }
            }

            impl ComponentType for $variant {
                const KIND: ComponentKind = ComponentKind::$variant;

                fn from_component(component: &Component) -> Option<&Self> {
                    match component {
                        Component::$variant(c) => Some(c),
                        _ => None,
                    }
                }

                fn from_component_mut(component: &mut Component) -> Option<&mut Self> {
                    match component {
                        Component::$variant(c) => Some(c),
                        _ => None,
                    }
                }
            }
        )*
    };
}

component_type!(Physical, Graphic, Priority, Text, Gauge, Grid, Target);
