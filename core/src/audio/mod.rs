// Audio post-processing for locally synthesized speech

// Shared helpers (binary lookup, temp file ids)
pub(crate) mod utils;

pub mod encode;
pub mod speed;

pub use encode::encode_mp3;
pub use speed::adjust_playback_rate;
