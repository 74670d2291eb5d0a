//! Integration tests for error handling

use screenreel_core::error::{ResultExt, ScreenreelError};

#[test]
fn test_error_context_chaining() {
    let base_error = ScreenreelError::recorder("libvpx-vp9 not found");
    let with_context = base_error.with_context("Failed to start recording");

    let msg = format!("{}", with_context);
    assert!(msg.contains("Failed to start recording"));
    assert!(msg.contains("libvpx-vp9 not found"));
}

#[test]
fn test_error_context_preserves_hint() {
    let base_error = ScreenreelError::acquisition("window vanished");
    let hint_before = base_error.user_hint();

    let with_context = base_error.with_context("Starting capture");
    let hint_after = with_context.user_hint();

    assert_eq!(hint_before, hint_after);
    assert!(matches!(
        with_context.root(),
        ScreenreelError::StreamAcquisition(_)
    ));
}

#[test]
fn test_result_ext_context() {
    let result: Result<(), ScreenreelError> = Err(ScreenreelError::directory("xrandr missing"));
    let with_context = result.context("Listing sources");

    let err = with_context.unwrap_err();
    assert!(format!("{}", err).contains("Listing sources"));
}

#[test]
fn test_user_hints() {
    let err = ScreenreelError::directory("test");
    assert!(err.user_hint().unwrap().contains("xrandr"));

    let err = ScreenreelError::acquisition("test");
    assert!(err.user_hint().unwrap().contains("ffmpeg"));

    let err = ScreenreelError::export("test");
    assert!(err.user_hint().unwrap().contains("writable"));

    let err = ScreenreelError::config("test");
    assert!(err.user_hint().unwrap().contains("config.toml"));

    assert!(ScreenreelError::Superseded.user_hint().is_none());
}

#[test]
fn test_user_recoverable() {
    assert!(ScreenreelError::directory("test").is_user_recoverable());
    assert!(ScreenreelError::acquisition("test").is_user_recoverable());
    assert!(ScreenreelError::export("test").is_user_recoverable());
    assert!(ScreenreelError::config("test").is_user_recoverable());
    assert!(ScreenreelError::SourceNotFound("screen:7".to_string()).is_user_recoverable());
    assert!(ScreenreelError::NoActiveSession.is_user_recoverable());

    assert!(!ScreenreelError::recorder("test").is_user_recoverable());
    assert!(!ScreenreelError::ControllerClosed.is_user_recoverable());
    assert!(!ScreenreelError::Unsupported("test".to_string()).is_user_recoverable());
}

#[test]
fn test_error_display_format() {
    let err = ScreenreelError::directory("Connection refused");
    assert_eq!(format!("{}", err), "Source directory error: Connection refused");

    let err = ScreenreelError::export("disk full");
    assert_eq!(format!("{}", err), "Export error: disk full");

    let err = ScreenreelError::NoActiveSession;
    assert_eq!(format!("{}", err), "No active capture session");

    let err = ScreenreelError::SessionAlreadyRunning;
    assert_eq!(format!("{}", err), "Capture session already running");
}

#[test]
fn test_io_error_conversion() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
    let err: ScreenreelError = io_err.into();

    let msg = format!("{}", err);
    assert!(msg.contains("I/O error"));
    assert!(msg.contains("File not found"));
}

#[test]
fn test_source_not_found_hint() {
    let err = ScreenreelError::SourceNotFound("window:0xdead".to_string());
    assert!(err.user_hint().unwrap().contains("screenreel list"));
}
