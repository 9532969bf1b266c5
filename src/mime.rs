use std::path::Path;

/// Guess an audio MIME type from a file name's extension.
pub fn audio_mime_from_file_name(file_name: &str) -> Option<&'static str> {
    let ext = extension(file_name)?;
    match ext.as_str() {
        "mp3" => Some("audio/mp3"),
        "wav" => Some("audio/wav"),
        "ogg" => Some("audio/ogg"),
        "flac" => Some("audio/flac"),
        "m4a" => Some("audio/m4a"),
        "webm" => Some("audio/webm"),
        _ => None,
    }
}

/// Guess an image MIME type from a file name's extension.
pub fn image_mime_from_file_name(file_name: &str) -> Option<&'static str> {
    let ext = extension(file_name)?;
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        _ => None,
    }
}

/// Subtype part of a MIME string ("audio/wav" -> "wav").
pub fn subtype(mime: &str) -> Option<&str> {
    mime.split_once('/')
        .map(|(_, sub)| sub.split(';').next().unwrap_or(sub).trim())
        .filter(|s| !s.is_empty())
}

fn extension(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_audio_extensions() {
        assert_eq!(audio_mime_from_file_name("clip.mp3"), Some("audio/mp3"));
        assert_eq!(audio_mime_from_file_name("a/b/voice.WAV"), Some("audio/wav"));
        assert_eq!(audio_mime_from_file_name("x.webm"), Some("audio/webm"));
    }

    #[test]
    fn unknown_or_missing_extension() {
        assert_eq!(audio_mime_from_file_name("notes.txt"), None);
        assert_eq!(audio_mime_from_file_name("README"), None);
    }

    #[test]
    fn image_and_subtype() {
        assert_eq!(image_mime_from_file_name("cat.JPEG"), Some("image/jpeg"));
        assert_eq!(subtype("audio/wav"), Some("wav"));
        assert_eq!(subtype("audio/webm;codecs=opus"), Some("webm"));
        assert_eq!(subtype("audio"), None);
    }
}
