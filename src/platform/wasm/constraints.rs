//! Conversion of track constraints into browser constraint dictionaries.

use wasm_bindgen::JsValue;
use web_sys::{
    ConstrainDomStringParameters, ConstrainDoubleRange,
    DisplayMediaStreamConstraints,
    MediaStreamConstraints as SysMediaStreamConstraints,
    MediaTrackConstraints as SysMediaTrackConstraints,
};

use crate::media::{
    AudioTrackConstraints, ConstrainNumber, ConstrainString,
    DeviceVideoTrackConstraints, DisplayMediaSettings, MediaStreamSettings,
};

impl From<&ConstrainString> for ConstrainDomStringParameters {
    fn from(from: &ConstrainString) -> Self {
        let mut params = Self::new();
        match from {
            ConstrainString::Exact(value) => {
                params.exact(&JsValue::from_str(value))
            }
            ConstrainString::Ideal(value) => {
                params.ideal(&JsValue::from_str(value))
            }
        };
        params
    }
}

impl From<ConstrainNumber> for ConstrainDoubleRange {
    fn from(from: ConstrainNumber) -> Self {
        let mut range = Self::new();
        match from {
            ConstrainNumber::Exact(value) => range.exact(f64::from(value)),
            ConstrainNumber::Ideal(value) => range.ideal(f64::from(value)),
        };
        range
    }
}

impl From<&AudioTrackConstraints> for SysMediaTrackConstraints {
    fn from(from: &AudioTrackConstraints) -> Self {
        let mut constraints = Self::new();
        if let Some(device_id) = &from.device_id {
            constraints.device_id(
                &ConstrainDomStringParameters::from(device_id).into(),
            );
        }
        constraints
    }
}

impl From<&DeviceVideoTrackConstraints> for SysMediaTrackConstraints {
    fn from(from: &DeviceVideoTrackConstraints) -> Self {
        let mut constraints = Self::new();
        if let Some(device_id) = &from.device_id {
            constraints.device_id(
                &ConstrainDomStringParameters::from(device_id).into(),
            );
        }
        if let Some(width) = from.width {
            constraints.width(&ConstrainDoubleRange::from(width).into());
        }
        if let Some(height) = from.height {
            constraints.height(&ConstrainDoubleRange::from(height).into());
        }
        if let Some(frame_rate) = from.frame_rate {
            constraints
                .frame_rate(&ConstrainDoubleRange::from(frame_rate).into());
        }
        constraints
    }
}

impl From<&MediaStreamSettings> for SysMediaStreamConstraints {
    fn from(from: &MediaStreamSettings) -> Self {
        let mut constraints = Self::new();
        if let Some(audio) = from.get_audio() {
            constraints
                .audio(&SysMediaTrackConstraints::from(audio).into());
        }
        if let Some(video) = from.get_video() {
            constraints
                .video(&SysMediaTrackConstraints::from(video).into());
        }
        constraints
    }
}

impl From<&DisplayMediaSettings> for DisplayMediaStreamConstraints {
    fn from(from: &DisplayMediaSettings) -> Self {
        let mut constraints = Self::new();
        constraints.video(&JsValue::TRUE);
        if from.is_audio_enabled() {
            constraints.audio(&JsValue::TRUE);
        }
        constraints
    }
}
