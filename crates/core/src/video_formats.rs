//! Supported video formats and content-type guessing.

/// Extensions accepted for upload and local registration.
pub const SUPPORTED_VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "ogg", "avi", "mov"];

/// Extensions that mark a remote folder entry as a video when its mime type
/// does not.
pub const REMOTE_VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "webm"];

/// Lower-cased extension of a file name, without the dot.
pub fn extension_of(name: &str) -> Option<String> {
    std::path::Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
}

/// Returns `true` if `name` has an extension in [`SUPPORTED_VIDEO_EXTENSIONS`].
pub fn is_supported_video(name: &str) -> bool {
    extension_of(name).is_some_and(|ext| SUPPORTED_VIDEO_EXTENSIONS.contains(&ext.as_str()))
}

/// Human-readable list of supported extensions, e.g. `.mp4, .webm`.
pub fn supported_extensions_display() -> String {
    SUPPORTED_VIDEO_EXTENSIONS
        .iter()
        .map(|e| format!(".{e}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Guess a Content-Type from a file extension.
pub fn content_type_for_extension(name: &str) -> &'static str {
    match extension_of(name).as_deref() {
        Some("mp4" | "m4v") => "video/mp4",
        Some("webm") => "video/webm",
        Some("ogg" | "ogv") => "video/ogg",
        Some("mov") => "video/quicktime",
        Some("mkv") => "video/x-matroska",
        Some("avi") => "video/x-msvideo",
        Some("wav") => "audio/wav",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supported_extensions_are_case_insensitive() {
        assert!(is_supported_video("clip.MP4"));
        assert!(is_supported_video("/data/videos/a.webm"));
        assert!(!is_supported_video("notes.txt"));
        assert!(!is_supported_video("no_extension"));
        assert!(!is_supported_video("movie.mkv"));
    }

    #[test]
    fn content_types() {
        assert_eq!(content_type_for_extension("a.mp4"), "video/mp4");
        assert_eq!(content_type_for_extension("a.MOV"), "video/quicktime");
        assert_eq!(content_type_for_extension("a.bin"), "application/octet-stream");
    }

    #[test]
    fn display_list() {
        assert_eq!(supported_extensions_display(), ".mp4, .webm, .ogg, .avi, .mov");
    }
}
