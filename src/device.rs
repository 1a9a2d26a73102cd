//! Named, typed access to device settings.
//!
//! [`DeviceParameters`] wraps a [`ParameterTransfer`] session and exposes each
//! known setting as a getter/setter pair in its natural Rust type. Each
//! accessor resolves through the parameter name table, so reads and writes
//! go through the same catalog checks and coercions as name-based access on
//! the client.

use tracing::info;

use crate::client::{ClientOptions, ParameterTransfer};
use crate::error::{ParamError, ParamResult};
use crate::parameter::{ParameterCatalog, ParameterId, ParameterScalar, ParameterValue};

/// Image processing mode of the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationMode {
    /// Images are passed through unmodified.
    PassThrough = 0,
    /// Images are rectified.
    Rectify = 1,
    /// Stereo matching produces a disparity map.
    StereoMatching = 2,
}

impl TryFrom<i32> for OperationMode {
    type Error = ParamError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(OperationMode::PassThrough),
            1 => Ok(OperationMode::Rectify),
            2 => Ok(OperationMode::StereoMatching),
            other => Err(ParamError::InvalidValue {
                parameter: ParameterId::OperationMode.name(),
                value: other,
            }),
        }
    }
}

/// Automatic exposure and gain control mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoExposureMode {
    /// Exposure time and gain are both automatic.
    AutoExposureAndGain = 0,
    /// Only the exposure time is automatic.
    AutoExposure = 1,
    /// Only the gain is automatic.
    AutoGain = 2,
    /// Both are set manually.
    Manual = 3,
}

impl TryFrom<i32> for AutoExposureMode {
    type Error = ParamError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(AutoExposureMode::AutoExposureAndGain),
            1 => Ok(AutoExposureMode::AutoExposure),
            2 => Ok(AutoExposureMode::AutoGain),
            3 => Ok(AutoExposureMode::Manual),
            other => Err(ParamError::InvalidValue {
                parameter: ParameterId::AutoExposureMode.name(),
                value: other,
            }),
        }
    }
}

/// Region of interest used by automatic exposure control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExposureRoi {
    /// Left edge in pixels.
    pub x: i32,
    /// Top edge in pixels.
    pub y: i32,
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels.
    pub height: i32,
}

macro_rules! accessors {
    ($($(#[$doc:meta])* $get:ident / $set:ident : $ty:ty => $id:ident;)+) => {
        $(
            $(#[$doc])*
            pub fn $get(&mut self) -> ParamResult<$ty> {
                self.get(ParameterId::$id)
            }

            $(#[$doc])*
            pub fn $set(&mut self, value: $ty) -> ParamResult<()> {
                self.set(ParameterId::$id, value)
            }
        )+
    };
}

/// Semantically typed view of a device's parameters.
#[derive(Debug)]
pub struct DeviceParameters {
    transfer: ParameterTransfer,
}

impl DeviceParameters {
    /// Connect to the parameter service at `address`:`service`.
    pub fn connect(address: &str, service: &str) -> ParamResult<Self> {
        ParameterTransfer::connect(address, service).map(Self::from_transfer)
    }

    /// Connect with explicit options.
    pub fn connect_with(address: &str, service: &str, options: ClientOptions) -> ParamResult<Self> {
        ParameterTransfer::connect_with(address, service, options).map(Self::from_transfer)
    }

    /// Wrap an existing session.
    pub fn from_transfer(transfer: ParameterTransfer) -> Self {
        Self { transfer }
    }

    /// Underlying protocol session.
    pub fn transfer(&mut self) -> &mut ParameterTransfer {
        &mut self.transfer
    }

    /// Give back the underlying session.
    pub fn into_inner(self) -> ParameterTransfer {
        self.transfer
    }

    /// All parameters the device reports, enumerating on first use.
    pub fn parameters(&mut self) -> ParamResult<&ParameterCatalog> {
        self.transfer.catalog()
    }

    /// Re-enumerate and return the fresh catalog.
    pub fn refresh(&mut self) -> ParamResult<&ParameterCatalog> {
        self.transfer.refresh_catalog()
    }

    /// Read any parameter by name in its declared type.
    pub fn value(&mut self, name: &str) -> ParamResult<ParameterValue> {
        self.transfer.read_value(name)
    }

    /// Write any parameter by name, coercing to its declared type.
    pub fn set_value(&mut self, name: &str, value: ParameterValue) -> ParamResult<()> {
        self.transfer.write_value(name, value)
    }

    fn get<T: ParameterScalar>(&mut self, id: ParameterId) -> ParamResult<T> {
        self.transfer.read_named(id.name())
    }

    fn set<T: ParameterScalar>(&mut self, id: ParameterId, value: T) -> ParamResult<()> {
        self.transfer.write_named(id.name(), value)
    }

    /// Current image processing mode.
    pub fn operation_mode(&mut self) -> ParamResult<OperationMode> {
        OperationMode::try_from(self.get::<i32>(ParameterId::OperationMode)?)
    }

    /// Switch the image processing mode.
    pub fn set_operation_mode(&mut self, mode: OperationMode) -> ParamResult<()> {
        self.set(ParameterId::OperationMode, mode as i32)
    }

    /// Number of disparities the matcher evaluates. Read-only on devices.
    pub fn number_of_disparities(&mut self) -> ParamResult<i32> {
        self.get(ParameterId::NumberOfDisparities)
    }

    /// Current automatic exposure mode.
    pub fn auto_exposure_mode(&mut self) -> ParamResult<AutoExposureMode> {
        AutoExposureMode::try_from(self.get::<i32>(ParameterId::AutoExposureMode)?)
    }

    /// Change the automatic exposure mode.
    pub fn set_auto_exposure_mode(&mut self, mode: AutoExposureMode) -> ParamResult<()> {
        self.set(ParameterId::AutoExposureMode, mode as i32)
    }

    /// Region of interest for automatic exposure.
    pub fn auto_exposure_roi(&mut self) -> ParamResult<ExposureRoi> {
        Ok(ExposureRoi {
            x: self.get(ParameterId::AutoExposureRoiX)?,
            y: self.get(ParameterId::AutoExposureRoiY)?,
            width: self.get(ParameterId::AutoExposureRoiWidth)?,
            height: self.get(ParameterId::AutoExposureRoiHeight)?,
        })
    }

    /// Set the region of interest and enable it.
    pub fn set_auto_exposure_roi(&mut self, roi: ExposureRoi) -> ParamResult<()> {
        self.set(ParameterId::AutoExposureRoiX, roi.x)?;
        self.set(ParameterId::AutoExposureRoiY, roi.y)?;
        self.set(ParameterId::AutoExposureRoiWidth, roi.width)?;
        self.set(ParameterId::AutoExposureRoiHeight, roi.height)?;
        self.set(ParameterId::AutoExposureRoiEnabled, true)
    }

    /// Ask the device to reboot. The session will drop shortly after.
    pub fn reboot(&mut self) -> ParamResult<()> {
        info!(endpoint = %self.transfer.endpoint(), "Requesting device reboot");
        self.set(ParameterId::Reboot, true)
    }

    accessors! {
        /// Offset added to every disparity.
        disparity_offset / set_disparity_offset: i32 => DisparityOffset;
        /// Stereo matching penalty P1 at image edges.
        sgm_p1_edge / set_sgm_p1_edge: i32 => SgmP1Edge;
        /// Stereo matching penalty P2 at image edges.
        sgm_p2_edge / set_sgm_p2_edge: i32 => SgmP2Edge;
        /// Stereo matching penalty P1 away from edges.
        sgm_p1_no_edge / set_sgm_p1_no_edge: i32 => SgmP1NoEdge;
        /// Stereo matching penalty P2 away from edges.
        sgm_p2_no_edge / set_sgm_p2_no_edge: i32 => SgmP2NoEdge;
        /// Edge sensitivity of the stereo matching penalties.
        sgm_edge_sensitivity / set_sgm_edge_sensitivity: i32 => SgmEdgeSensitivity;
        /// Whether disparities near the image border are masked.
        mask_border_pixels_enabled / set_mask_border_pixels_enabled: bool => MaskBorderPixelsEnabled;
        /// Whether the left/right consistency check is applied.
        consistency_check_enabled / set_consistency_check_enabled: bool => ConsistencyCheckEnabled;
        /// Sensitivity of the consistency check.
        consistency_check_sensitivity / set_consistency_check_sensitivity: i32 => ConsistencyCheckSensitivity;
        /// Whether the uniqueness check is applied.
        uniqueness_check_enabled / set_uniqueness_check_enabled: bool => UniquenessCheckEnabled;
        /// Sensitivity of the uniqueness check.
        uniqueness_check_sensitivity / set_uniqueness_check_sensitivity: i32 => UniquenessCheckSensitivity;
        /// Whether low-texture regions are filtered.
        texture_filter_enabled / set_texture_filter_enabled: bool => TextureFilterEnabled;
        /// Sensitivity of the texture filter.
        texture_filter_sensitivity / set_texture_filter_sensitivity: i32 => TextureFilterSensitivity;
        /// Whether gaps in the disparity map are interpolated.
        gap_interpolation_enabled / set_gap_interpolation_enabled: bool => GapInterpolationEnabled;
        /// Whether noise reduction is applied to the disparity map.
        noise_reduction_enabled / set_noise_reduction_enabled: bool => NoiseReductionEnabled;
        /// Number of speckle filter passes.
        speckle_filter_iterations / set_speckle_filter_iterations: i32 => SpeckleFilterIterations;
        /// Target mean intensity for automatic exposure, 0.0 to 1.0.
        auto_target_intensity / set_auto_target_intensity: f64 => AutoTargetIntensity;
        /// Intensity deviation tolerated before exposure is adjusted.
        auto_intensity_delta / set_auto_intensity_delta: f64 => AutoIntensityDelta;
        /// Which camera frame automatic exposure measures.
        auto_target_frame / set_auto_target_frame: i32 => AutoTargetFrame;
        /// Frames skipped between automatic exposure adjustments.
        auto_skipped_frames / set_auto_skipped_frames: i32 => AutoSkippedFrames;
        /// Upper exposure time limit in microseconds.
        auto_maximum_exposure_time / set_auto_maximum_exposure_time: f64 => AutoMaximumExposureTime;
        /// Lower exposure time limit in microseconds.
        auto_minimum_exposure_time / set_auto_minimum_exposure_time: f64 => AutoMinimumExposureTime;
        /// Upper gain limit in dB.
        auto_maximum_gain / set_auto_maximum_gain: f64 => AutoMaximumGain;
        /// Lower gain limit in dB.
        auto_minimum_gain / set_auto_minimum_gain: f64 => AutoMinimumGain;
        /// Exposure time in microseconds when exposure is manual.
        manual_exposure_time / set_manual_exposure_time: f64 => ManualExposureTime;
        /// Gain in dB when gain is manual.
        manual_gain / set_manual_gain: f64 => ManualGain;
        /// Whether automatic exposure only measures its region of interest.
        auto_exposure_roi_enabled / set_auto_exposure_roi_enabled: bool => AutoExposureRoiEnabled;
        /// Largest time difference accepted between paired frames.
        max_frame_time_difference_ms / set_max_frame_time_difference_ms: i32 => MaxFrameTimeDifferenceMs;
        /// Trigger frequency in Hz.
        trigger_frequency / set_trigger_frequency: f64 => TriggerFrequency;
        /// Whether trigger output 0 is active.
        trigger_0_enabled / set_trigger_0_enabled: bool => Trigger0Enabled;
        /// Trigger 0 pulse width in milliseconds.
        trigger_0_pulse_width / set_trigger_0_pulse_width: f64 => Trigger0PulseWidth;
        /// Whether trigger output 1 is active.
        trigger_1_enabled / set_trigger_1_enabled: bool => Trigger1Enabled;
        /// Trigger 1 pulse width in milliseconds.
        trigger_1_pulse_width / set_trigger_1_pulse_width: f64 => Trigger1PulseWidth;
        /// Delay of trigger 1 relative to trigger 0 in milliseconds.
        trigger_1_offset / set_trigger_1_offset: f64 => Trigger1Offset;
        /// External trigger input mode.
        trigger_input / set_trigger_input: i32 => TriggerInput;
        /// Whether automatic recalibration runs.
        auto_recalibration_enabled / set_auto_recalibration_enabled: bool => AutoRecalibrationEnabled;
        /// Whether automatic recalibration results are stored permanently.
        auto_recalibration_permanent / set_auto_recalibration_permanent: bool => AutoRecalibrationPermanent;
    }
}
