//! Column names of the exported sensor table and the numeric fields they fill.

use super::SensorRecord;

pub const TIMESTAMP: &str = "Timestamp";
pub const RESP_NAME: &str = "Resp name";
pub const RESP_GENDER: &str = "Resp gender";
pub const RESP_AGE: &str = "Resp age";
pub const RESP_REC_DATETIME: &str = "Resp rec datetime";
pub const BLINK: &str = "Blink detected (binary)";
pub const PEAK_DETECTED: &str = "Peak detected (binary)";
pub const FIXATION_INDEX: &str = "Fixation Index";
pub const SACCADE_INDEX: &str = "Saccade Index";

pub const REQUIRED: [&str; 5] = [TIMESTAMP, RESP_NAME, RESP_GENDER, RESP_AGE, RESP_REC_DATETIME];

/// A header names a viewpoint flag when it mentions both words.
pub fn is_viewpoint_column(header: &str) -> bool {
    header.contains("Viewpoint") && header.contains("active")
}

/// First run of digits in a header, e.g. `Viewpoint 3 active` -> 3.
pub fn viewpoint_number(header: &str) -> Option<u32> {
    let digits: String = header
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Optional numeric sensor columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    GazeX,
    GazeY,
    InterpolatedGazeX,
    InterpolatedGazeY,
    Gaze3dX,
    Gaze3dY,
    Gaze3dZ,
    PupilLeft,
    PupilRight,
    FixationX,
    FixationY,
    FixationDuration,
    FixationDispersion,
    SaccadeDuration,
    SaccadeAmplitude,
    SaccadeDirection,
    SaccadePeakVelocity,
    SaccadePeakAcceleration,
    GsrRaw,
    GsrTonic,
    GsrPhasic,
    PeakAmplitude,
    GyroX,
    GyroY,
    GyroZ,
    AccX,
    AccY,
    AccZ,
    DistanceLeft,
    ValidityLeft,
}

impl Field {
    pub const ALL: [Field; 30] = [
        Field::GazeX,
        Field::GazeY,
        Field::InterpolatedGazeX,
        Field::InterpolatedGazeY,
        Field::Gaze3dX,
        Field::Gaze3dY,
        Field::Gaze3dZ,
        Field::PupilLeft,
        Field::PupilRight,
        Field::FixationX,
        Field::FixationY,
        Field::FixationDuration,
        Field::FixationDispersion,
        Field::SaccadeDuration,
        Field::SaccadeAmplitude,
        Field::SaccadeDirection,
        Field::SaccadePeakVelocity,
        Field::SaccadePeakAcceleration,
        Field::GsrRaw,
        Field::GsrTonic,
        Field::GsrPhasic,
        Field::PeakAmplitude,
        Field::GyroX,
        Field::GyroY,
        Field::GyroZ,
        Field::AccX,
        Field::AccY,
        Field::AccZ,
        Field::DistanceLeft,
        Field::ValidityLeft,
    ];

    pub fn header(self) -> &'static str {
        match self {
            Field::GazeX => "Gaze X",
            Field::GazeY => "Gaze Y",
            Field::InterpolatedGazeX => "Interpolated Gaze X",
            Field::InterpolatedGazeY => "Interpolated Gaze Y",
            Field::Gaze3dX => "ET_Gaze3DX",
            Field::Gaze3dY => "ET_Gaze3DY",
            Field::Gaze3dZ => "ET_Gaze3DZ",
            Field::PupilLeft => "ET_PupilLeft",
            Field::PupilRight => "ET_PupilRight",
            Field::FixationX => "Fixation X",
            Field::FixationY => "Fixation Y",
            Field::FixationDuration => "Fixation Duration",
            Field::FixationDispersion => "Fixation Dispersion",
            Field::SaccadeDuration => "Saccade Duration",
            Field::SaccadeAmplitude => "Saccade Amplitude",
            Field::SaccadeDirection => "Saccade Direction",
            Field::SaccadePeakVelocity => "Saccade Peak Velocity",
            Field::SaccadePeakAcceleration => "Saccade Peak Acceleration",
            Field::GsrRaw => "GSR Raw (microSiemens)",
            Field::GsrTonic => "Tonic signal (microSiemens)",
            Field::GsrPhasic => "Phasic signal (microSiemens)",
            Field::PeakAmplitude => "Peak amplitude (microSiemens)",
            Field::GyroX => "ET_GyroX",
            Field::GyroY => "ET_GyroY",
            Field::GyroZ => "ET_GyroZ",
            Field::AccX => "ET_AccX",
            Field::AccY => "ET_AccY",
            Field::AccZ => "ET_AccZ",
            Field::DistanceLeft => "ET_DistanceLeft",
            Field::ValidityLeft => "ET_ValidityLeftEye",
        }
    }

    pub fn get(self, r: &SensorRecord) -> Option<f64> {
        *self.slot(r)
    }

    pub fn set(self, r: &mut SensorRecord, value: Option<f64>) {
        *self.slot_mut(r) = value;
    }

    fn slot(self, r: &SensorRecord) -> &Option<f64> {
        match self {
            Field::GazeX => &r.gaze_x,
            Field::GazeY => &r.gaze_y,
            Field::InterpolatedGazeX => &r.interpolated_gaze_x,
            Field::InterpolatedGazeY => &r.interpolated_gaze_y,
            Field::Gaze3dX => &r.gaze_3d_x,
            Field::Gaze3dY => &r.gaze_3d_y,
            Field::Gaze3dZ => &r.gaze_3d_z,
            Field::PupilLeft => &r.pupil_left,
            Field::PupilRight => &r.pupil_right,
            Field::FixationX => &r.fixation_x,
            Field::FixationY => &r.fixation_y,
            Field::FixationDuration => &r.fixation_duration,
            Field::FixationDispersion => &r.fixation_dispersion,
            Field::SaccadeDuration => &r.saccade_duration,
            Field::SaccadeAmplitude => &r.saccade_amplitude,
            Field::SaccadeDirection => &r.saccade_direction,
            Field::SaccadePeakVelocity => &r.saccade_peak_velocity,
            Field::SaccadePeakAcceleration => &r.saccade_peak_acceleration,
            Field::GsrRaw => &r.gsr_raw,
            Field::GsrTonic => &r.gsr_tonic,
            Field::GsrPhasic => &r.gsr_phasic,
            Field::PeakAmplitude => &r.peak_amplitude,
            Field::GyroX => &r.gyro_x,
            Field::GyroY => &r.gyro_y,
            Field::GyroZ => &r.gyro_z,
            Field::AccX => &r.acc_x,
            Field::AccY => &r.acc_y,
            Field::AccZ => &r.acc_z,
            Field::DistanceLeft => &r.distance_left,
            Field::ValidityLeft => &r.validity_left,
        }
    }

    fn slot_mut(self, r: &mut SensorRecord) -> &mut Option<f64> {
        match self {
            Field::GazeX => &mut r.gaze_x,
            Field::GazeY => &mut r.gaze_y,
            Field::InterpolatedGazeX => &mut r.interpolated_gaze_x,
            Field::InterpolatedGazeY => &mut r.interpolated_gaze_y,
            Field::Gaze3dX => &mut r.gaze_3d_x,
            Field::Gaze3dY => &mut r.gaze_3d_y,
            Field::Gaze3dZ => &mut r.gaze_3d_z,
            Field::PupilLeft => &mut r.pupil_left,
            Field::PupilRight => &mut r.pupil_right,
            Field::FixationX => &mut r.fixation_x,
            Field::FixationY => &mut r.fixation_y,
            Field::FixationDuration => &mut r.fixation_duration,
            Field::FixationDispersion => &mut r.fixation_dispersion,
            Field::SaccadeDuration => &mut r.saccade_duration,
            Field::SaccadeAmplitude => &mut r.saccade_amplitude,
            Field::SaccadeDirection => &mut r.saccade_direction,
            Field::SaccadePeakVelocity => &mut r.saccade_peak_velocity,
            Field::SaccadePeakAcceleration => &mut r.saccade_peak_acceleration,
            Field::GsrRaw => &mut r.gsr_raw,
            Field::GsrTonic => &mut r.gsr_tonic,
            Field::GsrPhasic => &mut r.gsr_phasic,
            Field::PeakAmplitude => &mut r.peak_amplitude,
            Field::GyroX => &mut r.gyro_x,
            Field::GyroY => &mut r.gyro_y,
            Field::GyroZ => &mut r.gyro_z,
            Field::AccX => &mut r.acc_x,
            Field::AccY => &mut r.acc_y,
            Field::AccZ => &mut r.acc_z,
            Field::DistanceLeft => &mut r.distance_left,
            Field::ValidityLeft => &mut r.validity_left,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewpoint_headers_are_recognised() {
        assert!(is_viewpoint_column("Viewpoint 1 active"));
        assert!(is_viewpoint_column("Viewpoint_3_active"));
        assert!(!is_viewpoint_column("Viewpoint 1"));
        assert_eq!(viewpoint_number("Viewpoint 4 active"), Some(4));
        assert_eq!(viewpoint_number("Viewpoint_12_active"), Some(12));
        assert_eq!(viewpoint_number("Viewpoint active"), None);
    }

    #[test]
    fn headers_are_unique() {
        let set: std::collections::HashSet<_> = Field::ALL.iter().map(|f| f.header()).collect();
        assert_eq!(set.len(), Field::ALL.len());
    }
}
