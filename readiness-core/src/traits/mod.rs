pub mod media_devices;
pub mod network;
pub mod preview;
pub mod readiness_delegate;
pub mod session;
