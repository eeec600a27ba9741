pub mod audio_tap;
pub mod ring_buffer;
pub mod spectrum;
