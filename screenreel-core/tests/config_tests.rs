//! Integration tests for configuration system

use screenreel_core::config::{
    sample_config, ConfigFile, RecorderProfile, SessionConfig, VideoConstraints,
};
use screenreel_core::types::SourceKind;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_session_defaults() {
    let config = SessionConfig::default();

    assert_eq!(
        config.directory.kinds,
        vec![SourceKind::Window, SourceKind::Screen]
    );
    assert_eq!(config.directory.preview_size, (300, 200));
    assert!(config.audio);
    assert_eq!(config.profile.mime_type, "video/webm; codecs=vp9");
    assert_eq!(config.video.frame_rate.ideal, 30);
    assert_eq!(config.video.frame_rate.max, 60);
    assert!(config.validate().is_empty());
}

#[test]
fn test_stream_request_from_config() {
    let config = SessionConfig::default().with_audio(false);
    let request = config.stream_request("window:0x01e00003");

    assert_eq!(request.target_id, "window:0x01e00003");
    assert!(!request.audio);
    assert_eq!(request.video, config.video);
}

#[test]
fn test_fit_keeps_sources_inside_bounds() {
    let video = VideoConstraints::default();

    // Already within bounds
    assert_eq!(video.fit(1920, 1080), (1920, 1080));
    assert_eq!(video.fit(1280, 720), (1280, 720));

    // 4K screen is scaled down
    assert_eq!(video.fit(3840, 2160), (1920, 1080));

    // Small window is scaled up
    assert_eq!(video.fit(640, 360), (1280, 720));

    // Odd sizes are rounded down to even
    let (w, h) = video.fit(1601, 901);
    assert_eq!((w % 2, h % 2), (0, 0));
}

#[test]
fn test_invalid_bounds_rejected() {
    let video = VideoConstraints {
        min_width: 2000,
        ..VideoConstraints::default()
    };
    assert!(video.validate().is_err());

    let mut config = SessionConfig::default();
    config.video = video;
    config.directory.kinds.clear();
    assert_eq!(config.validate().len(), 2);
}

#[test]
fn test_profile_parsing() {
    let profile = RecorderProfile::default();
    assert_eq!(profile.container(), "webm");
    assert_eq!(profile.video_codec(), Some("vp9"));

    let profile = RecorderProfile::new("video/webm;codecs=\"vp8,opus\"");
    assert_eq!(profile.video_codec(), Some("vp8"));

    let profile = RecorderProfile::new("video/webm");
    assert_eq!(profile.video_codec(), None);
}

#[test]
fn test_config_file_to_session_config() {
    let config = ConfigFile::parse(
        r#"
[directory]
kinds = ["screen"]
preview_width = 160
preview_height = 90

[capture]
audio = false
ideal_fps = 24

[export]
directory = "/tmp/recordings"

[ffmpeg]
binary = "/opt/ffmpeg/bin/ffmpeg"
display = ":1"
"#,
    )
    .expect("config should parse");

    let session = config.to_session_config().expect("config should be valid");
    assert_eq!(session.directory.kinds, vec![SourceKind::Screen]);
    assert_eq!(session.directory.preview_size, (160, 90));
    assert!(!session.audio);
    assert_eq!(session.video.frame_rate.ideal, 24);
    assert_eq!(session.export_dir, PathBuf::from("/tmp/recordings"));
    assert_eq!(session.ffmpeg.binary, "/opt/ffmpeg/bin/ffmpeg");
    assert_eq!(session.ffmpeg.display, ":1");
    assert_eq!(session.ffmpeg.chunk_size, 64 * 1024);
}

#[test]
fn test_config_file_rejects_unknown_kind() {
    let config = ConfigFile::parse("[directory]\nkinds = [\"tab\"]\n").unwrap();
    assert!(config.to_session_config().is_err());
}

#[test]
fn test_config_file_rejects_non_webm() {
    let config = ConfigFile::parse("[recording]\nmime_type = \"video/mp4\"\n").unwrap();
    let err = config.to_session_config().unwrap_err();
    assert!(err.to_string().contains("webm"));
}

#[test]
fn test_config_file_sample_parses() {
    let sample = sample_config();
    let config: ConfigFile = toml::from_str(&sample).expect("Sample config should parse");
    assert_eq!(config.recording.mime_type, "video/webm; codecs=vp9");
    assert!(config.to_session_config().is_ok());
}

#[test]
fn test_config_file_load_from_disk() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(&config_path, "[recording]\nchunk_size_kib = 16\n").unwrap();

    let loaded = ConfigFile::load_from(&config_path).expect("Failed to load config");
    assert_eq!(loaded.recording.chunk_size_kib, 16);
    assert_eq!(loaded.to_session_config().unwrap().ffmpeg.chunk_size, 16 * 1024);
}

#[test]
fn test_config_file_load_nonexistent() {
    let result = ConfigFile::load_from("/nonexistent/path/config.toml");
    // Should return default config, not error
    assert!(result.is_ok());
}

#[test]
fn test_config_file_load_or_default_on_bad_toml() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(&config_path, "[capture\nbroken").unwrap();

    assert!(ConfigFile::load_from(&config_path).is_err());
    let config = ConfigFile::load_or_default(Some(config_path.as_path()));
    assert_eq!(config.capture.max_width, 1920);
}
