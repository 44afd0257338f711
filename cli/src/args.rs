use clap::{Args, Parser, Subcommand};
use ghostlink_core::{MixProfile, Mode, ModemConfig};
use std::path::PathBuf;

/// Default ceiling for encode inputs (1 MiB)
pub const DEFAULT_MAX_BYTES: usize = 1024 * 1024;

/// Default ceiling for audio rendered by the web interface (10 minutes)
pub const DEFAULT_MAX_AUDIO_S: f32 = 600.0;

#[derive(Parser)]
#[command(name = "ghostlink")]
#[command(about = "Symmetric audio data modem: bytes to WAV and back", version)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Encode a file or a text message into a WAV file
    Encode {
        /// Input file to transmit
        #[arg(value_name = "INPUT", required_unless_present = "text", conflicts_with = "text")]
        input: Option<PathBuf>,

        /// Text message to transmit instead of a file
        #[arg(long)]
        text: Option<String>,

        /// Output WAV file (default: next to the input, or message.wav)
        #[arg(short, long, value_name = "OUTPUT.WAV")]
        output: Option<PathBuf>,

        /// Reject inputs larger than this many bytes
        #[arg(long, default_value_t = DEFAULT_MAX_BYTES)]
        max_bytes: usize,

        #[command(flatten)]
        modem: ModemArgs,
    },

    /// Decode a WAV file back into its payload
    Decode {
        /// Input WAV file
        #[arg(value_name = "INPUT.WAV")]
        input: PathBuf,

        /// Write the raw payload here instead of printing it as text
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,

        #[command(flatten)]
        modem: ModemArgs,
    },

    /// Run the web interface
    Serve {
        /// Address to bind
        #[arg(long, env = "GHOSTLINK_HOST", default_value = "0.0.0.0")]
        host: String,

        /// Port to listen on
        #[arg(long, env = "GHOSTLINK_PORT", default_value_t = 8000)]
        port: u16,

        /// Upload ceiling for /encode and /decode
        #[arg(long, default_value_t = DEFAULT_MAX_BYTES)]
        max_upload_bytes: usize,

        /// Longest waveform /encode will render, in seconds
        #[arg(long, default_value_t = DEFAULT_MAX_AUDIO_S)]
        max_audio_s: f32,
    },
}

/// Modem parameters; must match between encode and decode
#[derive(Args, Debug, Clone)]
pub struct ModemArgs {
    /// Sample rate in Hz (decode always uses the WAV header's rate)
    #[arg(long, default_value_t = 48_000)]
    pub samplerate: u32,

    /// Symbols per second
    #[arg(long, default_value_t = 90.0)]
    pub baud: f32,

    /// Peak amplitude as a fraction of full scale
    #[arg(long, default_value_t = 0.06)]
    pub amp: f32,

    /// Symbol alphabet: dense (two tones, 4 bits) or sparse (on/off, 1 bit)
    #[arg(long, default_value_t = Mode::Dense)]
    pub mode: Mode,

    /// Waveform assembly: streaming (continuous phase) or block
    #[arg(long, default_value_t = MixProfile::Streaming)]
    pub mix_profile: MixProfile,

    /// Silence between symbols in ms (sparse mode only)
    #[arg(long, default_value_t = 0.0)]
    pub gap_ms: f32,

    /// Preamble duration in seconds
    #[arg(long, default_value_t = 0.8)]
    pub preamble_s: f32,

    /// Interleaver depth
    #[arg(long, default_value_t = 4)]
    pub interleave_depth: usize,

    /// Transmissions of every symbol
    #[arg(long, default_value_t = 2)]
    pub repeats: usize,

    /// Fade length at symbol edges in ms
    #[arg(long, default_value_t = 5.0)]
    pub ramp_ms: f32,
}

impl From<&ModemArgs> for ModemConfig {
    fn from(args: &ModemArgs) -> Self {
        ModemConfig {
            sample_rate: args.samplerate,
            baud: args.baud,
            amplitude: args.amp,
            mode: args.mode,
            mix_profile: args.mix_profile,
            gap_ms: args.gap_ms,
            preamble_s: args.preamble_s,
            interleave_depth: args.interleave_depth,
            repeats: args.repeats,
            ramp_ms: args.ramp_ms,
        }
    }
}
