//! Device parameter data model.
//!
//! A device exposes a fixed set of settings, each addressed on the wire by a
//! stable integer [`ParameterId`] and carrying a fixed [`ParameterType`].
//! Values travel as a [`ParameterValue`], a tagged union over the three wire
//! types; all conversions between them go through [`ParameterValue::coerce`]
//! so that read and write paths agree on edge cases.
//!
//! The device describes what it supports through enumeration, which yields a
//! [`ParameterDescriptor`] per parameter. The most recent enumeration is kept
//! as a [`ParameterCatalog`] keyed by name.

use std::collections::HashMap;
use std::fmt;

use serde::{Serialize, Serializer};

// =============================================================================
// Identifiers
// =============================================================================

macro_rules! parameter_ids {
    ($($variant:ident = $raw:literal => $name:literal,)+) => {
        /// Protocol identifier of a device parameter.
        ///
        /// The set is fixed per protocol major version. Identifiers reported
        /// by a device that are not listed here are skipped during
        /// enumeration.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum ParameterId {
            $(
                #[doc = concat!("`", $name, "`")]
                $variant,
            )+
        }

        impl ParameterId {
            /// Every known identifier, in wire order.
            pub const ALL: &'static [ParameterId] = &[$(ParameterId::$variant,)+];

            /// The integer sent on the wire.
            pub const fn raw(self) -> u32 {
                match self {
                    $(ParameterId::$variant => $raw,)+
                }
            }

            /// Look up a wire identifier.
            pub fn from_raw(raw: u32) -> Option<Self> {
                match raw {
                    $($raw => Some(ParameterId::$variant),)+
                    _ => None,
                }
            }

            /// The canonical parameter name.
            pub const fn name(self) -> &'static str {
                match self {
                    $(ParameterId::$variant => $name,)+
                }
            }

            /// Look up a parameter by its canonical name.
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($name => Some(ParameterId::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

parameter_ids! {
    OperationMode = 0 => "operation_mode",
    NumberOfDisparities = 1 => "number_of_disparities",
    DisparityOffset = 2 => "disparity_offset",
    SgmP1Edge = 3 => "sgm_p1_edge",
    SgmP2Edge = 4 => "sgm_p2_edge",
    SgmP1NoEdge = 5 => "sgm_p1_no_edge",
    SgmP2NoEdge = 6 => "sgm_p2_no_edge",
    SgmEdgeSensitivity = 7 => "sgm_edge_sensitivity",
    MaskBorderPixelsEnabled = 8 => "mask_border_pixels_enabled",
    ConsistencyCheckEnabled = 9 => "consistency_check_enabled",
    ConsistencyCheckSensitivity = 10 => "consistency_check_sensitivity",
    UniquenessCheckEnabled = 11 => "uniqueness_check_enabled",
    UniquenessCheckSensitivity = 12 => "uniqueness_check_sensitivity",
    TextureFilterEnabled = 13 => "texture_filter_enabled",
    TextureFilterSensitivity = 14 => "texture_filter_sensitivity",
    GapInterpolationEnabled = 15 => "gap_interpolation_enabled",
    NoiseReductionEnabled = 16 => "noise_reduction_enabled",
    SpeckleFilterIterations = 17 => "speckle_filter_iterations",
    AutoExposureMode = 18 => "auto_exposure_mode",
    AutoTargetIntensity = 19 => "auto_target_intensity",
    AutoIntensityDelta = 20 => "auto_intensity_delta",
    AutoTargetFrame = 21 => "auto_target_frame",
    AutoSkippedFrames = 22 => "auto_skipped_frames",
    AutoMaximumExposureTime = 23 => "auto_maximum_exposure_time",
    AutoMinimumExposureTime = 24 => "auto_minimum_exposure_time",
    AutoMaximumGain = 25 => "auto_maximum_gain",
    AutoMinimumGain = 26 => "auto_minimum_gain",
    ManualExposureTime = 27 => "manual_exposure_time",
    ManualGain = 28 => "manual_gain",
    AutoExposureRoiEnabled = 29 => "auto_exposure_roi_enabled",
    AutoExposureRoiX = 30 => "auto_exposure_roi_x",
    AutoExposureRoiY = 31 => "auto_exposure_roi_y",
    AutoExposureRoiWidth = 32 => "auto_exposure_roi_width",
    AutoExposureRoiHeight = 33 => "auto_exposure_roi_height",
    MaxFrameTimeDifferenceMs = 34 => "max_frame_time_difference_ms",
    TriggerFrequency = 35 => "trigger_frequency",
    Trigger0Enabled = 36 => "trigger_0_enabled",
    Trigger0PulseWidth = 37 => "trigger_0_pulse_width",
    Trigger1Enabled = 38 => "trigger_1_enabled",
    Trigger1PulseWidth = 39 => "trigger_1_pulse_width",
    Trigger1Offset = 40 => "trigger_1_offset",
    TriggerInput = 41 => "trigger_input",
    AutoRecalibrationEnabled = 42 => "auto_recalibration_enabled",
    AutoRecalibrationPermanent = 43 => "auto_recalibration_permanent",
    Reboot = 44 => "reboot",
}

impl fmt::Display for ParameterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for ParameterId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.raw())
    }
}

// =============================================================================
// Types and values
// =============================================================================

/// Wire type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    /// 32-bit signed integer, big-endian on the wire.
    Int,
    /// Boolean carried as a 32-bit integer, big-endian on the wire.
    Bool,
    /// IEEE-754 double in native byte order on the wire.
    Double,
}

impl ParameterType {
    /// Decode the type code used in enumeration records.
    pub fn from_wire(code: u32) -> Option<Self> {
        match code {
            0 => Some(ParameterType::Int),
            1 => Some(ParameterType::Bool),
            2 => Some(ParameterType::Double),
            _ => None,
        }
    }

    /// The type code used in enumeration records.
    pub fn to_wire(self) -> u32 {
        match self {
            ParameterType::Int => 0,
            ParameterType::Bool => 1,
            ParameterType::Double => 2,
        }
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ParameterType::Int => "int",
            ParameterType::Bool => "bool",
            ParameterType::Double => "double",
        };
        f.write_str(label)
    }
}

/// A parameter value tagged with its wire type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParameterValue {
    /// Integer value.
    Int(i32),
    /// Floating-point value.
    Double(f64),
    /// Boolean value.
    Bool(bool),
}

impl ParameterValue {
    /// The wire type this value carries.
    pub fn ty(&self) -> ParameterType {
        match self {
            ParameterValue::Int(_) => ParameterType::Int,
            ParameterValue::Double(_) => ParameterType::Double,
            ParameterValue::Bool(_) => ParameterType::Bool,
        }
    }

    /// Convert to `target`.
    ///
    /// Doubles become integers by truncation toward zero (saturating at the
    /// `i32` limits, NaN maps to 0). Numbers become booleans by testing
    /// against zero; booleans become 1 or 0.
    pub fn coerce(self, target: ParameterType) -> ParameterValue {
        match target {
            ParameterType::Int => ParameterValue::Int(self.as_i32()),
            ParameterType::Double => ParameterValue::Double(self.as_f64()),
            ParameterType::Bool => ParameterValue::Bool(self.as_bool()),
        }
    }

    /// Value as an integer, coercing if needed.
    pub fn as_i32(self) -> i32 {
        match self {
            ParameterValue::Int(v) => v,
            ParameterValue::Double(v) => v as i32,
            ParameterValue::Bool(v) => i32::from(v),
        }
    }

    /// Value as a double, coercing if needed.
    pub fn as_f64(self) -> f64 {
        match self {
            ParameterValue::Int(v) => f64::from(v),
            ParameterValue::Double(v) => v,
            ParameterValue::Bool(v) => {
                if v {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// Value as a boolean, coercing if needed.
    pub fn as_bool(self) -> bool {
        match self {
            ParameterValue::Int(v) => v != 0,
            ParameterValue::Double(v) => v != 0.0,
            ParameterValue::Bool(v) => v,
        }
    }

    /// Parse user input according to `ty`.
    ///
    /// Booleans accept `true`/`false`, `on`/`off` and `1`/`0`.
    pub fn parse(input: &str, ty: ParameterType) -> Result<Self, String> {
        let input = input.trim();
        match ty {
            ParameterType::Int => input
                .parse::<i32>()
                .map(ParameterValue::Int)
                .map_err(|e| format!("'{input}' is not an integer: {e}")),
            ParameterType::Double => input
                .parse::<f64>()
                .map(ParameterValue::Double)
                .map_err(|e| format!("'{input}' is not a number: {e}")),
            ParameterType::Bool => match input.to_ascii_lowercase().as_str() {
                "true" | "on" | "1" => Ok(ParameterValue::Bool(true)),
                "false" | "off" | "0" => Ok(ParameterValue::Bool(false)),
                _ => Err(format!("'{input}' is not a boolean")),
            },
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Int(v) => write!(f, "{v}"),
            ParameterValue::Double(v) => write!(f, "{v}"),
            ParameterValue::Bool(v) => write!(f, "{v}"),
        }
    }
}

/// Rust scalar types that can be read from and written to a parameter.
pub trait ParameterScalar: Sized {
    /// Wrap the scalar into a tagged value.
    fn into_value(self) -> ParameterValue;

    /// Extract the scalar from any tagged value, coercing as needed.
    fn from_value(value: ParameterValue) -> Self;
}

impl ParameterScalar for i32 {
    fn into_value(self) -> ParameterValue {
        ParameterValue::Int(self)
    }

    fn from_value(value: ParameterValue) -> Self {
        value.as_i32()
    }
}

impl ParameterScalar for f64 {
    fn into_value(self) -> ParameterValue {
        ParameterValue::Double(self)
    }

    fn from_value(value: ParameterValue) -> Self {
        value.as_f64()
    }
}

impl ParameterScalar for bool {
    fn into_value(self) -> ParameterValue {
        ParameterValue::Bool(self)
    }

    fn from_value(value: ParameterValue) -> Self {
        value.as_bool()
    }
}

// =============================================================================
// Descriptors and catalog
// =============================================================================

/// One parameter as reported by the device during enumeration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterDescriptor {
    id: ParameterId,
    name: &'static str,
    #[serde(rename = "type")]
    ty: ParameterType,
    writable: bool,
    value: ParameterValue,
    min: Option<ParameterValue>,
    max: Option<ParameterValue>,
    increment: Option<ParameterValue>,
}

impl ParameterDescriptor {
    /// Build a descriptor. Bounds are dropped for boolean parameters.
    pub fn new(
        id: ParameterId,
        ty: ParameterType,
        writable: bool,
        value: ParameterValue,
        min: ParameterValue,
        max: ParameterValue,
        increment: ParameterValue,
    ) -> Self {
        let numeric = ty != ParameterType::Bool;
        Self {
            id,
            name: id.name(),
            ty,
            writable,
            value: value.coerce(ty),
            min: numeric.then(|| min.coerce(ty)),
            max: numeric.then(|| max.coerce(ty)),
            increment: numeric.then(|| increment.coerce(ty)),
        }
    }

    /// Protocol identifier.
    pub fn id(&self) -> ParameterId {
        self.id
    }

    /// Canonical parameter name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Declared wire type.
    pub fn ty(&self) -> ParameterType {
        self.ty
    }

    /// Whether the device accepts writes.
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Value at the time of enumeration.
    pub fn value(&self) -> ParameterValue {
        self.value
    }

    /// Lower bound, `None` for booleans.
    pub fn min(&self) -> Option<ParameterValue> {
        self.min
    }

    /// Upper bound, `None` for booleans.
    pub fn max(&self) -> Option<ParameterValue> {
        self.max
    }

    /// Step size, `None` for booleans.
    pub fn increment(&self) -> Option<ParameterValue> {
        self.increment
    }

    /// Check a candidate value against the reported bounds.
    ///
    /// This is a convenience for UIs; the device remains the authority and
    /// may still reject a write that passes here.
    pub fn accepts(&self, candidate: ParameterValue) -> bool {
        if !self.writable {
            return false;
        }
        let candidate = candidate.coerce(self.ty);
        match (self.min, self.max) {
            (Some(min), Some(max)) => {
                let v = candidate.as_f64();
                if v < min.as_f64() || v > max.as_f64() {
                    return false;
                }
                match (self.ty, self.increment) {
                    (ParameterType::Int, Some(ParameterValue::Int(step))) if step > 1 => {
                        (i64::from(candidate.as_i32()) - i64::from(min.as_i32())) % i64::from(step) == 0
                    }
                    _ => true,
                }
            }
            _ => true,
        }
    }
}

/// The most recent enumeration result, keyed by parameter name.
#[derive(Debug, Clone, Default)]
pub struct ParameterCatalog {
    entries: HashMap<&'static str, ParameterDescriptor>,
}

impl ParameterCatalog {
    /// Build a catalog from decoded descriptors. A later duplicate replaces
    /// an earlier one.
    pub fn from_descriptors(descriptors: impl IntoIterator<Item = ParameterDescriptor>) -> Self {
        let entries = descriptors
            .into_iter()
            .map(|descriptor| (descriptor.name, descriptor))
            .collect();
        Self { entries }
    }

    /// Descriptor for `name`, if the device reported it.
    pub fn get(&self, name: &str) -> Option<&ParameterDescriptor> {
        self.entries.get(name)
    }

    /// Whether the device reported `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no parameters were reported.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Descriptors in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &ParameterDescriptor> {
        self.entries.values()
    }

    /// Descriptors sorted by name.
    pub fn sorted(&self) -> Vec<&ParameterDescriptor> {
        let mut descriptors: Vec<_> = self.entries.values().collect();
        descriptors.sort_by_key(|d| d.name);
        descriptors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_table_is_consistent() {
        for &id in ParameterId::ALL {
            assert_eq!(ParameterId::from_raw(id.raw()), Some(id));
            assert_eq!(ParameterId::from_name(id.name()), Some(id));
        }
        assert_eq!(ParameterId::from_raw(9999), None);
        assert_eq!(ParameterId::from_name("exposure"), None);
    }

    #[test]
    fn coercion_rules() {
        assert_eq!(
            ParameterValue::Int(3).coerce(ParameterType::Double),
            ParameterValue::Double(3.0)
        );
        assert_eq!(
            ParameterValue::Double(-2.9).coerce(ParameterType::Int),
            ParameterValue::Int(-2)
        );
        assert_eq!(
            ParameterValue::Double(f64::NAN).coerce(ParameterType::Int),
            ParameterValue::Int(0)
        );
        assert_eq!(
            ParameterValue::Int(7).coerce(ParameterType::Bool),
            ParameterValue::Bool(true)
        );
        assert_eq!(
            ParameterValue::Bool(true).coerce(ParameterType::Double),
            ParameterValue::Double(1.0)
        );
        assert_eq!(
            ParameterValue::Double(0.0).coerce(ParameterType::Bool),
            ParameterValue::Bool(false)
        );
    }

    #[test]
    fn parses_user_input() {
        assert_eq!(
            ParameterValue::parse(" 42 ", ParameterType::Int),
            Ok(ParameterValue::Int(42))
        );
        assert_eq!(
            ParameterValue::parse("off", ParameterType::Bool),
            Ok(ParameterValue::Bool(false))
        );
        assert!(ParameterValue::parse("1.5", ParameterType::Int).is_err());
        assert!(ParameterValue::parse("maybe", ParameterType::Bool).is_err());
    }

    #[test]
    fn descriptor_drops_bounds_for_bool() {
        let d = ParameterDescriptor::new(
            ParameterId::Trigger0Enabled,
            ParameterType::Bool,
            true,
            ParameterValue::Int(1),
            ParameterValue::Int(0),
            ParameterValue::Int(1),
            ParameterValue::Int(1),
        );
        assert_eq!(d.value(), ParameterValue::Bool(true));
        assert!(d.min().is_none() && d.max().is_none() && d.increment().is_none());
    }

    #[test]
    fn descriptor_accepts_within_bounds() {
        let d = ParameterDescriptor::new(
            ParameterId::DisparityOffset,
            ParameterType::Int,
            true,
            ParameterValue::Int(0),
            ParameterValue::Int(0),
            ParameterValue::Int(64),
            ParameterValue::Int(16),
        );
        assert!(d.accepts(ParameterValue::Int(32)));
        assert!(!d.accepts(ParameterValue::Int(33)));
        assert!(!d.accepts(ParameterValue::Int(80)));
        assert!(d.accepts(ParameterValue::Double(48.0)));

        let read_only = ParameterDescriptor::new(
            ParameterId::NumberOfDisparities,
            ParameterType::Int,
            false,
            ParameterValue::Int(128),
            ParameterValue::Int(128),
            ParameterValue::Int(128),
            ParameterValue::Int(1),
        );
        assert!(!read_only.accepts(ParameterValue::Int(128)));
    }

    #[test]
    fn catalog_sorted_by_name() {
        let make = |id| {
            ParameterDescriptor::new(
                id,
                ParameterType::Double,
                true,
                ParameterValue::Double(1.0),
                ParameterValue::Double(0.0),
                ParameterValue::Double(2.0),
                ParameterValue::Double(0.1),
            )
        };
        let catalog = ParameterCatalog::from_descriptors([
            make(ParameterId::TriggerFrequency),
            make(ParameterId::ManualGain),
            make(ParameterId::AutoTargetIntensity),
        ]);
        assert_eq!(catalog.len(), 3);
        let names: Vec<_> = catalog.sorted().iter().map(|d| d.name()).collect();
        assert_eq!(
            names,
            ["auto_target_intensity", "manual_gain", "trigger_frequency"]
        );
        assert!(catalog.contains("manual_gain"));
        assert!(catalog.get("manual_exposure_time").is_none());
    }
}
