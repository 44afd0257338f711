//! Symmetric audio data modem
//!
//! Turns an arbitrary byte payload into a mono 16-bit WAV of multi-tone FSK
//! symbols and back. Encoder and decoder share a [`ModemConfig`]; the
//! waveform itself carries no parameters beyond the WAV sample rate.
//!
//! ```no_run
//! use ghostlink_core::{decode, encode, ModemConfig};
//!
//! let config = ModemConfig::default();
//! let wav = encode(b"secret", &config)?;
//! assert_eq!(decode(&wav, &config)?, b"secret");
//! # Ok::<(), ghostlink_core::ModemError>(())
//! ```

pub mod config;
pub mod decoder;
pub mod demodulator;
pub mod encoder;
pub mod error;
pub mod fft_correlation;
pub mod framing;
pub mod fsk;
pub mod modulator;
pub mod symbol_coder;
pub mod sync;
pub mod wav;

pub use config::{MixProfile, Mode, ModemConfig};
pub use decoder::Decoder;
pub use encoder::Encoder;
pub use error::{ModemError, Result};

// Frame configuration
pub const FRAME_HEADER_SIZE: usize = 8; // payload length (4) + CRC-32 (4)
pub const MAX_PAYLOAD_SIZE: usize = u32::MAX as usize;

/// Encode `payload` into a WAV file
pub fn encode(payload: &[u8], config: &ModemConfig) -> Result<Vec<u8>> {
    Encoder::new(config.clone())?.encode(payload)
}

/// Decode a WAV file produced by [`encode`] with a matching configuration
pub fn decode(wav: &[u8], config: &ModemConfig) -> Result<Vec<u8>> {
    Decoder::new(config.clone())?.decode(wav)
}
