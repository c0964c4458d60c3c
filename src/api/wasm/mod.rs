//! External API for the `wasm32-unknown-unknown` target, designed to be
//! used in a web environment with JavaScript.

pub mod error;
pub mod input_device_info;
pub mod media_manager_handle;
pub mod recorder_handle;
pub mod stagehand;
pub mod uploader_handle;

pub use self::{
    error::StagehandError, input_device_info::InputDeviceInfo,
    media_manager_handle::MediaManagerHandle,
    recorder_handle::RecorderHandle, stagehand::Stagehand,
    uploader_handle::{UploadJobHandle, UploaderHandle},
};
