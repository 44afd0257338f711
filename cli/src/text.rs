use std::path::{Path, PathBuf};

/// Payload as display text: UTF-8 when valid, otherwise Latin-1
pub fn payload_to_text(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => payload.iter().map(|&b| b as char).collect(),
    }
}

/// Download/output file name for an encoded payload
///
/// Uses `requested` if given, otherwise the stem of `hint`, falling back to
/// `fallback`. Path components and quotes are stripped and `.wav` appended
/// when missing.
pub fn wav_file_name(requested: Option<&str>, hint: Option<&str>, fallback: &str) -> String {
    let raw = requested
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .or_else(|| {
            hint.and_then(|h| Path::new(h).file_stem())
                .map(|stem| stem.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| fallback.to_string());

    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    let mut name: String = base
        .chars()
        .filter(|c| !c.is_control() && *c != '"')
        .collect();

    if name.is_empty() || name == "." || name == ".." {
        name = fallback.to_string();
    }
    if !name.to_ascii_lowercase().ends_with(".wav") {
        name.push_str(".wav");
    }
    name
}

/// Default encode output next to `input`; never the input file itself
pub fn default_wav_path(input: &Path) -> PathBuf {
    let candidate = input.with_extension("wav");
    if candidate == input {
        input.with_extension("encoded.wav")
    } else {
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_and_latin1() {
        assert_eq!(payload_to_text(b"secret"), "secret");
        assert_eq!(payload_to_text("héllo".as_bytes()), "héllo");
        assert_eq!(payload_to_text(&[0x63, 0x61, 0x66, 0xE9]), "café");
    }

    #[test]
    fn test_wav_file_name() {
        assert_eq!(wav_file_name(None, None, "message"), "message.wav");
        assert_eq!(wav_file_name(None, Some("report.pdf"), "upload"), "report.wav");
        assert_eq!(wav_file_name(Some("out"), Some("report.pdf"), "upload"), "out.wav");
        assert_eq!(wav_file_name(Some("Out.WAV"), None, "message"), "Out.WAV");
        assert_eq!(wav_file_name(Some("../../etc/x"), None, "message"), "x.wav");
        assert_eq!(wav_file_name(Some("a\"b"), None, "message"), "ab.wav");
        assert_eq!(wav_file_name(Some("  "), None, "message"), "message.wav");
    }

    #[test]
    fn test_default_wav_path_never_overwrites_input() {
        assert_eq!(default_wav_path(Path::new("dir/report.pdf")), PathBuf::from("dir/report.wav"));
        assert_eq!(default_wav_path(Path::new("notes")), PathBuf::from("notes.wav"));
        assert_eq!(default_wav_path(Path::new("dir/song.wav")), PathBuf::from("dir/song.encoded.wav"));
    }
}
