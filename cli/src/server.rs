//! Web interface: an HTML page plus multipart `/encode` and `/decode` endpoints

use crate::error::{AppError, CliError};
use crate::text::{payload_to_text, wav_file_name};
use axum::extract::multipart::Field;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::header;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use ghostlink_core::{Encoder, ModemConfig, ModemError};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

const INDEX_HTML: &str = include_str!("../static/index.html");

/// Room for multipart boundaries and the small form fields on top of an upload
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Largest accepted text, file or WAV upload in bytes
    pub max_upload_bytes: usize,
    /// Longest waveform `/encode` will render, in seconds
    pub max_audio_s: f32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: crate::args::DEFAULT_MAX_BYTES,
            max_audio_s: crate::args::DEFAULT_MAX_AUDIO_S,
        }
    }
}

#[derive(Clone)]
struct AppState {
    config: Arc<ServerConfig>,
}

pub fn router(config: ServerConfig) -> Router {
    let body_limit = config.max_upload_bytes + MULTIPART_OVERHEAD;
    let state = AppState {
        config: Arc::new(config),
    };

    Router::new()
        .route("/", get(index))
        .route("/encode", post(encode))
        .route("/decode", post(decode))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(host: &str, port: u16, config: ServerConfig) -> Result<(), CliError> {
    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    tracing::info!("GhostLink web interface listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(config)).await?;
    Ok(())
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn encode(State(state): State<AppState>, mut multipart: Multipart) -> Result<Response, AppError> {
    let limit = state.config.max_upload_bytes;
    let mut text: Option<String> = None;
    let mut file: Option<(Vec<u8>, Option<String>)> = None;
    let mut fields = HashMap::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "text" => text = Some(field.text().await?).filter(|t| !t.is_empty()),
            "file" => {
                let file_name = field.file_name().map(str::to_string);
                let data = read_limited(field, limit).await?;
                // Browsers submit an empty part when no file was chosen
                if !data.is_empty() || file_name.as_deref().is_some_and(|n| !n.is_empty()) {
                    file = Some((data, file_name));
                }
            }
            _ => {
                fields.insert(name, field.text().await?);
            }
        }
    }

    let (data, name_hint, fallback) = match (text, file) {
        (Some(_), Some(_)) => {
            return Err(AppError::BadRequest("Provide either text or file, not both".to_string()))
        }
        (None, None) => return Err(AppError::BadRequest("Provide text or file".to_string())),
        (Some(text), None) => {
            if text.len() > limit {
                return Err(AppError::PayloadTooLarge("Text too large".to_string()));
            }
            (text.into_bytes(), None, "message")
        }
        (None, Some((data, file_name))) => (data, file_name, "upload"),
    };

    let config = modem_config(&fields)?;
    let filename = wav_file_name(
        fields.get("out_name").map(String::as_str),
        name_hint.as_deref(),
        fallback,
    );

    let max_samples = (state.config.max_audio_s * config.sample_rate as f32) as usize;
    let encoder = Encoder::new(config).map_err(|e| AppError::BadRequest(e.to_string()))?;
    let samples = encoder.sample_count(data.len());
    if samples > max_samples {
        return Err(AppError::PayloadTooLarge(format!(
            "Encoded audio would exceed {} s",
            state.config.max_audio_s
        )));
    }

    let payload_len = data.len();
    let wav = tokio::task::spawn_blocking(move || encoder.encode(&data))
        .await
        .map_err(|e| AppError::Internal(format!("Encoder task failed: {}", e)))?
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    tracing::info!("Encoded {} bytes into {} ({} bytes)", payload_len, filename, wav.len());

    Ok((
        [
            (header::CONTENT_TYPE, "audio/wav".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        wav,
    )
        .into_response())
}

async fn decode(State(state): State<AppState>, mut multipart: Multipart) -> Result<String, AppError> {
    let limit = state.config.max_upload_bytes;
    let mut wav: Option<Vec<u8>> = None;
    let mut fields = HashMap::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "wav" {
            wav = Some(read_limited(field, limit).await?);
        } else {
            fields.insert(name, field.text().await?);
        }
    }

    let wav = wav
        .filter(|w| !w.is_empty())
        .ok_or_else(|| AppError::BadRequest("Provide a WAV file".to_string()))?;
    let config = modem_config(&fields)?;

    let payload = tokio::task::spawn_blocking(move || ghostlink_core::decode(&wav, &config))
        .await
        .map_err(|e| AppError::Internal(format!("Decoder task failed: {}", e)))?
        .map_err(|e| {
            tracing::debug!("Decode failed: {}", e);
            AppError::BadRequest("Invalid or unsupported WAV file".to_string())
        })?;

    tracing::info!("Decoded {} payload bytes", payload.len());
    Ok(payload_to_text(&payload))
}

/// Read a multipart field, failing once it grows past `limit` bytes
async fn read_limited(mut field: Field<'_>, limit: usize) -> Result<Vec<u8>, AppError> {
    let mut data = Vec::new();
    while let Some(chunk) = field.chunk().await? {
        if data.len() + chunk.len() > limit {
            return Err(AppError::PayloadTooLarge("File too large".to_string()));
        }
        data.extend_from_slice(&chunk);
    }
    Ok(data)
}

/// Modem parameters from form fields; absent or blank fields keep their defaults
fn modem_config(fields: &HashMap<String, String>) -> Result<ModemConfig, AppError> {
    let defaults = ModemConfig::default();
    let config = ModemConfig {
        sample_rate: form_value(fields, "samplerate", defaults.sample_rate)?,
        baud: form_value(fields, "baud", defaults.baud)?,
        amplitude: form_value(fields, "amp", defaults.amplitude)?,
        mode: form_value(fields, "mode", defaults.mode)?,
        mix_profile: form_value(fields, "mix_profile", defaults.mix_profile)?,
        gap_ms: form_value(fields, "gap_ms", defaults.gap_ms)?,
        preamble_s: form_value(fields, "preamble_s", defaults.preamble_s)?,
        interleave_depth: form_value(fields, "interleave_depth", defaults.interleave_depth)?,
        repeats: form_value(fields, "repeats", defaults.repeats)?,
        ramp_ms: form_value(fields, "ramp_ms", defaults.ramp_ms)?,
    };

    config.validate().map_err(|e| match e {
        ModemError::InvalidConfig(msg) => AppError::BadRequest(msg),
        other => AppError::BadRequest(other.to_string()),
    })?;
    Ok(config)
}

fn form_value<T: FromStr>(fields: &HashMap<String, String>, key: &str, default: T) -> Result<T, AppError> {
    match fields.get(key).map(|v| v.trim()).filter(|v| !v.is_empty()) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| AppError::BadRequest(format!("Invalid value for {}: '{}'", key, raw))),
    }
}
