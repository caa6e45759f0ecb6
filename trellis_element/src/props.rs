// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The core property bundle every element carries.

use kurbo::Insets;
use trellis_dirty::{Channel, ChannelSet};
use trellis_property::{Property, PropertyMetadataBuilder, PropertyRegistry};

use crate::types::{Alignment, Cursor, Visibility};

/// Marker owner type for the core element properties.
#[derive(Debug)]
pub struct Element;

/// Typed handles for the element properties the layout engine reads.
///
/// Registered once, before any tree is constructed:
///
/// ```rust
/// use trellis_element::{CoreProps, ElementTree};
/// use trellis_property::PropertyRegistry;
///
/// let mut registry = PropertyRegistry::new();
/// let props = CoreProps::register(&mut registry);
/// let tree = ElementTree::new(registry, props);
/// # let _ = tree;
/// ```
///
/// Explicit `width`/`height` default to NaN, meaning "size to content";
/// a validate callback rejects negative and infinite values while letting
/// NaN through. `opacity` is coerced into `[0, 1]`.
#[derive(Copy, Clone, Debug)]
pub struct CoreProps {
    /// Explicit width (NaN = auto).
    pub width: Property<f64>,
    /// Explicit height (NaN = auto).
    pub height: Property<f64>,
    /// Lower width bound.
    pub min_width: Property<f64>,
    /// Lower height bound.
    pub min_height: Property<f64>,
    /// Upper width bound.
    pub max_width: Property<f64>,
    /// Upper height bound.
    pub max_height: Property<f64>,
    /// Outer spacing, subtracted from constraints and added back to the
    /// desired size.
    pub margin: Property<Insets>,
    /// Horizontal placement within the arranged space.
    pub h_align: Property<Alignment>,
    /// Vertical placement within the arranged space.
    pub v_align: Property<Alignment>,
    /// Layout/render participation.
    pub visibility: Property<Visibility>,
    /// Whether the element receives input.
    pub is_enabled: Property<bool>,
    /// Whether hit testing can return the element.
    pub hit_test_visible: Property<bool>,
    /// Whether the element can take keyboard focus.
    pub focusable: Property<bool>,
    /// Uniform opacity in `[0, 1]`.
    pub opacity: Property<f64>,
    /// Pointer cursor over the element.
    pub cursor: Property<Cursor>,
}

/// Accepts NaN ("auto") and finite non-negative lengths.
fn valid_length(value: &f64) -> bool {
    value.is_nan() || (*value >= 0.0 && value.is_finite())
}

/// Accepts finite non-negative lower bounds.
fn valid_min(value: &f64) -> bool {
    *value >= 0.0 && value.is_finite()
}

/// Accepts non-negative upper bounds, including infinity.
fn valid_max(value: &f64) -> bool {
    *value >= 0.0 && !value.is_nan()
}

impl CoreProps {
    /// Registers the core properties and returns their handles.
    ///
    /// # Panics
    ///
    /// Panics if called twice against the same registry.
    pub fn register(registry: &mut PropertyRegistry) -> Self {
        let measure = Channel::MEASURE.into_set();
        let arrange = Channel::ARRANGE.into_set();
        let render = Channel::RENDER.into_set();

        Self {
            width: registry.register::<Element, f64>(
                "Width",
                PropertyMetadataBuilder::new(f64::NAN)
                    .affects(measure)
                    .validate(valid_length)
                    .build(),
            ),
            height: registry.register::<Element, f64>(
                "Height",
                PropertyMetadataBuilder::new(f64::NAN)
                    .affects(measure)
                    .validate(valid_length)
                    .build(),
            ),
            min_width: registry.register::<Element, f64>(
                "MinWidth",
                PropertyMetadataBuilder::new(0.0)
                    .affects(measure)
                    .validate(valid_min)
                    .build(),
            ),
            min_height: registry.register::<Element, f64>(
                "MinHeight",
                PropertyMetadataBuilder::new(0.0)
                    .affects(measure)
                    .validate(valid_min)
                    .build(),
            ),
            max_width: registry.register::<Element, f64>(
                "MaxWidth",
                PropertyMetadataBuilder::new(f64::INFINITY)
                    .affects(measure)
                    .validate(valid_max)
                    .build(),
            ),
            max_height: registry.register::<Element, f64>(
                "MaxHeight",
                PropertyMetadataBuilder::new(f64::INFINITY)
                    .affects(measure)
                    .validate(valid_max)
                    .build(),
            ),
            margin: registry.register::<Element, Insets>(
                "Margin",
                PropertyMetadataBuilder::new(Insets::ZERO)
                    .affects(measure)
                    .build(),
            ),
            h_align: registry.register::<Element, Alignment>(
                "HorizontalAlignment",
                PropertyMetadataBuilder::new(Alignment::Stretch)
                    .affects(arrange)
                    .build(),
            ),
            v_align: registry.register::<Element, Alignment>(
                "VerticalAlignment",
                PropertyMetadataBuilder::new(Alignment::Stretch)
                    .affects(arrange)
                    .build(),
            ),
            visibility: registry.register::<Element, Visibility>(
                "Visibility",
                PropertyMetadataBuilder::new(Visibility::Visible)
                    .affects(measure | render)
                    .build(),
            ),
            is_enabled: registry.register::<Element, bool>(
                "IsEnabled",
                PropertyMetadataBuilder::new(true).affects(render).build(),
            ),
            hit_test_visible: registry.register::<Element, bool>(
                "IsHitTestVisible",
                PropertyMetadataBuilder::new(true).build(),
            ),
            focusable: registry.register::<Element, bool>(
                "Focusable",
                PropertyMetadataBuilder::new(false).build(),
            ),
            opacity: registry.register::<Element, f64>(
                "Opacity",
                PropertyMetadataBuilder::new(1.0)
                    .affects(render)
                    .validate(|v: &f64| v.is_finite())
                    .coerce(|v: f64| v.clamp(0.0, 1.0))
                    .build(),
            ),
            cursor: registry.register::<Element, Cursor>(
                "Cursor",
                PropertyMetadataBuilder::new(Cursor::Arrow).build(),
            ),
        }
    }

    /// Channels that drive layout, for embedders registering their own
    /// layout-affecting properties.
    #[must_use]
    pub fn layout_channels() -> ChannelSet {
        ChannelSet::LAYOUT
    }
}
