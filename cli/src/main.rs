mod args;
mod error;
mod server;
mod text;

use args::{Cli, Commands, ModemArgs};
use clap::Parser;
use error::CliError;
use ghostlink_core::{Decoder, Encoder, ModemConfig};
use server::ServerConfig;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, matches!(cli.command, Commands::Serve { .. }));

    let result = match cli.command {
        Commands::Encode {
            input,
            text,
            output,
            max_bytes,
            modem,
        } => encode_command(input.as_deref(), text, output, max_bytes, &modem),
        Commands::Decode { input, output, modem } => decode_command(&input, output.as_deref(), &modem),
        Commands::Serve {
            host,
            port,
            max_upload_bytes,
            max_audio_s,
        } => serve_command(
            &host,
            port,
            ServerConfig {
                max_upload_bytes,
                max_audio_s,
            },
        ),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// `RUST_LOG` wins; otherwise `-v` raises the level from warn (info for the server)
fn init_tracing(verbose: u8, serving: bool) {
    let level = match (verbose, serving) {
        (0, false) => "warn",
        (0, true) | (1, _) => "info",
        (2, _) => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn encode_command(
    input: Option<&Path>,
    text: Option<String>,
    output: Option<PathBuf>,
    max_bytes: usize,
    modem: &ModemArgs,
) -> Result<(), CliError> {
    let (data, default_output) = match (input, text) {
        (Some(path), None) => {
            let data = std::fs::read(path).map_err(|e| CliError::io(path, e))?;
            println!("Read {} bytes from {}", data.len(), path.display());
            (data, text::default_wav_path(path))
        }
        (None, Some(text)) => (text.into_bytes(), PathBuf::from("message.wav")),
        _ => return Err(CliError::Input("Provide either an input file or --text".to_string())),
    };

    if data.len() > max_bytes {
        return Err(CliError::Input(format!(
            "Input is {} bytes; the limit is {} (--max-bytes)",
            data.len(),
            max_bytes
        )));
    }

    let output = output.unwrap_or(default_output);
    let encoder = Encoder::new(ModemConfig::from(modem))?;
    let wav = encoder.encode(&data)?;
    std::fs::write(&output, &wav).map_err(|e| CliError::io(&output, e))?;

    let seconds = wav.len().saturating_sub(44) as f32 / 2.0 / encoder.config().sample_rate as f32;
    println!(
        "Encoded {} bytes to {} ({:.2} s, {} mode)",
        data.len(),
        output.display(),
        seconds,
        encoder.config().mode
    );
    Ok(())
}

fn decode_command(input: &Path, output: Option<&Path>, modem: &ModemArgs) -> Result<(), CliError> {
    let wav = std::fs::read(input).map_err(|e| CliError::io(input, e))?;
    let decoder = Decoder::new(ModemConfig::from(modem))?;
    let payload = decoder.decode(&wav)?;

    match output {
        Some(path) => {
            std::fs::write(path, &payload).map_err(|e| CliError::io(path, e))?;
            println!("Decoded {} bytes to {}", payload.len(), path.display());
        }
        None => println!("{}", text::payload_to_text(&payload)),
    }
    Ok(())
}

fn serve_command(host: &str, port: u16, config: ServerConfig) -> Result<(), CliError> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(server::serve(host, port, config))
}
