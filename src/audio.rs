//! Mute flag of the default capture device.

use thiserror::Error;

#[cfg(windows)]
pub use self::endpoint::{ComApartment, DefaultCaptureDevice};

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no microphone is connected")]
    NoDevice,
    #[error("{0}")]
    Com(String),
}

/// Query and change the mute flag of the current default microphone.
///
/// The OS owns the flag. Implementations read it live on every call and do
/// not cache device handles, so a change of default device between calls is
/// picked up.
pub trait MicrophoneEndpoint {
    fn is_muted(&self) -> Result<bool, AudioError>;
    fn set_muted(&self, muted: bool) -> Result<(), AudioError>;
}

#[cfg(windows)]
mod endpoint {
    use std::marker::PhantomData;

    use tracing::{debug, warn};
    use windows::Win32::Foundation::ERROR_NOT_FOUND;
    use windows::Win32::Media::Audio::Endpoints::IAudioEndpointVolume;
    use windows::Win32::Media::Audio::{
        IMMDeviceEnumerator, MMDeviceEnumerator, eCapture, eConsole,
    };
    use windows::Win32::System::Com::{
        CLSCTX_ALL, COINIT_APARTMENTTHREADED, CoCreateInstance, CoInitializeEx, CoUninitialize,
    };

    use super::{AudioError, MicrophoneEndpoint};

    impl From<windows::core::Error> for AudioError {
        fn from(e: windows::core::Error) -> Self {
            AudioError::Com(e.message().to_string())
        }
    }

    /// Keeps COM initialised (single-threaded apartment) on the current thread.
    pub struct ComApartment {
        _not_send: PhantomData<*const ()>,
    }

    impl ComApartment {
        pub fn init() -> Result<Self, AudioError> {
            unsafe { CoInitializeEx(None, COINIT_APARTMENTTHREADED) }.ok()?;
            debug!("COM apartment initialised");
            Ok(Self {
                _not_send: PhantomData,
            })
        }
    }

    impl Drop for ComApartment {
        fn drop(&mut self) {
            unsafe { CoUninitialize() };
        }
    }

    /// The console-role default capture endpoint, resolved on every call.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct DefaultCaptureDevice;

    impl DefaultCaptureDevice {
        fn endpoint_volume(&self) -> Result<IAudioEndpointVolume, AudioError> {
            unsafe {
                let enumerator: IMMDeviceEnumerator =
                    CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL)?;
                let device = enumerator
                    .GetDefaultAudioEndpoint(eCapture, eConsole)
                    .map_err(|e| {
                        if e.code() == ERROR_NOT_FOUND.to_hresult() {
                            AudioError::NoDevice
                        } else {
                            AudioError::from(e)
                        }
                    })?;
                Ok(device.Activate::<IAudioEndpointVolume>(CLSCTX_ALL, None)?)
            }
        }
    }

    impl MicrophoneEndpoint for DefaultCaptureDevice {
        fn is_muted(&self) -> Result<bool, AudioError> {
            let volume = self.endpoint_volume()?;
            let muted = unsafe { volume.GetMute() }?;
            Ok(muted.into())
        }

        fn set_muted(&self, muted: bool) -> Result<(), AudioError> {
            let volume = self.endpoint_volume()?;
            unsafe { volume.SetMute(muted, std::ptr::null()) }.inspect_err(|e| {
                warn!(muted, error = %e, "SetMute failed");
            })?;
            Ok(())
        }
    }
}
