//! Transcription pipeline shared by the CLI and the web server.
//!
//! A run is a linear sequence: validate the input, convert it to normalized
//! MP3 when it isn't one already, transcribe, write the text to the output
//! path. Two failure exits (conversion, transcription), no retries.

use crate::audio::{self, Converter, FfmpegConverter};
use crate::config::Settings;
use crate::error::Result;
use crate::transcription::{ModelSize, Transcriber, WhisperTranscriber};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Append-only log sink for a single run.
///
/// Lines are timestamped `[HH:MM:SS]` and surfaced in the web log pane; with
/// `echo` enabled each line is also printed to stderr for CLI runs.
pub struct RunLog {
    lines: Mutex<Vec<String>>,
    echo: bool,
}

impl RunLog {
    /// Create a silent log (lines are only collected).
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(Vec::new()),
            echo: false,
        }
    }

    /// Create a log that also echoes each line to stderr.
    pub fn echoing() -> Self {
        Self {
            lines: Mutex::new(Vec::new()),
            echo: true,
        }
    }

    /// Append a message.
    pub fn push(&self, msg: &str) {
        let line = format!("[{}] {}", chrono::Local::now().format("%H:%M:%S"), msg);
        if self.echo {
            eprintln!("  {}", msg);
        }
        self.lines.lock().unwrap().push(line);
    }

    /// All lines appended so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl Default for RunLog {
    fn default() -> Self {
        Self::new()
    }
}

/// A single transcription request.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Path to the source media file.
    pub source: PathBuf,
    /// Model size to transcribe with.
    pub model: ModelSize,
    /// Explicit output path; derived from the source name when None.
    pub output: Option<PathBuf>,
    /// Retain the converted MP3 after the run (web download).
    pub keep_converted: bool,
    /// The source is a temp file owned by this run and must be removed in
    /// every branch (web uploads).
    pub remove_source: bool,
}

impl RunRequest {
    /// A plain CLI-style request: user-owned source, nothing retained.
    pub fn new(source: impl Into<PathBuf>, model: ModelSize) -> Self {
        Self {
            source: source.into(),
            model,
            output: None,
            keep_converted: false,
            remove_source: false,
        }
    }
}

/// Result of a successful run.
#[derive(Debug)]
pub struct RunOutcome {
    /// The transcribed text, exactly as written to the output file.
    pub text: String,
    /// Where the transcript was written.
    pub output_path: PathBuf,
    /// The retained converted MP3, when conversion occurred and the request
    /// asked to keep it.
    pub converted_path: Option<PathBuf>,
}

/// The transcription pipeline.
pub struct Pipeline {
    converter: Arc<dyn Converter>,
    transcriber: Arc<dyn Transcriber>,
    temp_dir: PathBuf,
    output_dir: PathBuf,
}

impl Pipeline {
    /// Create a pipeline from settings, with the production components.
    pub fn new(settings: &Settings) -> Result<Self> {
        let transcriber = WhisperTranscriber::new(
            settings.models_dir(),
            &settings.transcription.language,
            settings.transcription.threads,
        );

        Self::with_components(
            Arc::new(FfmpegConverter),
            Arc::new(transcriber),
            settings.temp_dir(),
            settings.output_dir(),
        )
    }

    /// Create a pipeline with custom components.
    pub fn with_components(
        converter: Arc<dyn Converter>,
        transcriber: Arc<dyn Transcriber>,
        temp_dir: PathBuf,
        output_dir: PathBuf,
    ) -> Result<Self> {
        std::fs::create_dir_all(&temp_dir)?;

        Ok(Self {
            converter,
            transcriber,
            temp_dir,
            output_dir,
        })
    }

    /// The configured transcript output directory.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Default output path for a source file: `<output_dir>/<stem>_transcription.txt`.
    pub fn default_output_path(&self, source: &Path) -> PathBuf {
        let stem = source
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("transcript");
        self.output_dir.join(format!("{}_transcription.txt", stem))
    }

    /// Run the pipeline for a single request.
    #[instrument(skip(self, log), fields(source = %request.source.display(), model = %request.model))]
    pub async fn run(&self, request: &RunRequest, log: &RunLog) -> Result<RunOutcome> {
        if let Err(e) = audio::validate_input(&request.source) {
            self.remove_owned_source(request);
            return Err(e);
        }

        // Conversion gate: only non-MP3 inputs go through ffmpeg.
        let (work_path, converted) = if audio::needs_conversion(&request.source) {
            let dest = self.temp_dir.join(format!("{}.mp3", Uuid::new_v4()));
            log.push(&format!(
                "Converting {} to mp3: {}",
                request.source.display(),
                dest.display()
            ));

            if let Err(e) = self.converter.convert(&request.source, &dest).await {
                log.push(&format!("ffmpeg conversion error: {}", e));
                remove_quietly(&dest);
                self.remove_owned_source(request);
                return Err(e);
            }

            log.push(&format!("Conversion complete: {}", dest.display()));

            // The owned source temp is consumed once the MP3 exists.
            self.remove_owned_source(request);
            (dest.clone(), Some(dest))
        } else {
            (request.source.clone(), None)
        };

        log.push(&format!("Loading Whisper model: {}", request.model));
        log.push(&format!("Transcribing file: {}", work_path.display()));

        let transcript = match self.transcriber.transcribe(&work_path, request.model).await {
            Ok(t) => t,
            Err(e) => {
                log.push(&format!("Error during transcription: {}", e));
                if let Some(path) = &converted {
                    remove_quietly(path);
                }
                self.remove_owned_source(request);
                return Err(e);
            }
        };

        // Persist the text exactly as returned.
        let output_path = match &request.output {
            Some(p) => p.clone(),
            None => self.default_output_path(&request.source),
        };
        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&output_path, transcript.text.as_bytes())?;
        log.push(&format!("Transcription saved to: {}", output_path.display()));

        let converted_path = match converted {
            Some(path) if request.keep_converted => Some(path),
            Some(path) => {
                remove_quietly(&path);
                None
            }
            None => None,
        };

        self.remove_owned_source(request);

        info!(
            "Run complete: {} characters written to {}",
            transcript.text.len(),
            output_path.display()
        );

        Ok(RunOutcome {
            text: transcript.text,
            output_path,
            converted_path,
        })
    }

    /// Remove the source temp when the run owns it.
    fn remove_owned_source(&self, request: &RunRequest) {
        if request.remove_source && request.source.exists() {
            remove_quietly(&request.source);
        }
    }
}

/// Remove a file, logging instead of failing when it can't be removed.
fn remove_quietly(path: &Path) {
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            warn!("Failed to remove temp file {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SkrivError;
    use crate::transcription::{Transcript, TranscriptSegment};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Converter double that counts invocations and writes a marker file.
    struct MockConverter {
        calls: AtomicUsize,
        fail: bool,
    }

    impl MockConverter {
        fn ok() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: true,
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Converter for MockConverter {
        async fn convert(&self, _source: &Path, dest: &Path) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(SkrivError::Conversion("mock failure".into()));
            }
            std::fs::write(dest, b"mp3-bytes").unwrap();
            Ok(())
        }
    }

    /// Transcriber double that records the path it was handed.
    struct MockTranscriber {
        calls: AtomicUsize,
        seen_path: Mutex<Option<PathBuf>>,
        response: std::result::Result<String, String>,
    }

    impl MockTranscriber {
        fn ok(text: &str) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                seen_path: Mutex::new(None),
                response: Ok(text.to_string()),
            }
        }

        fn failing() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                seen_path: Mutex::new(None),
                response: Err("mock inference error".to_string()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn seen_path(&self) -> Option<PathBuf> {
            self.seen_path.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transcriber for MockTranscriber {
        async fn transcribe(&self, audio_path: &Path, _model: ModelSize) -> Result<Transcript> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.seen_path.lock().unwrap() = Some(audio_path.to_path_buf());
            match &self.response {
                Ok(text) => Ok(Transcript::new(vec![TranscriptSegment::new(
                    0.0,
                    1.0,
                    text.clone(),
                )])),
                Err(msg) => Err(SkrivError::Transcription(msg.clone())),
            }
        }
    }

    struct Harness {
        _root: tempfile::TempDir,
        pipeline: Pipeline,
        converter: Arc<MockConverter>,
        transcriber: Arc<MockTranscriber>,
        media_dir: PathBuf,
        output_dir: PathBuf,
    }

    fn harness(converter: MockConverter, transcriber: MockTranscriber) -> Harness {
        let root = tempfile::tempdir().unwrap();
        let media_dir = root.path().join("media");
        let output_dir = root.path().join("output");
        std::fs::create_dir_all(&media_dir).unwrap();

        let converter = Arc::new(converter);
        let transcriber = Arc::new(transcriber);

        let pipeline = Pipeline::with_components(
            converter.clone(),
            transcriber.clone(),
            root.path().join("tmp"),
            output_dir.clone(),
        )
        .unwrap();

        Harness {
            _root: root,
            pipeline,
            converter,
            transcriber,
            media_dir,
            output_dir,
        }
    }

    fn write_media(h: &Harness, name: &str) -> PathBuf {
        let path = h.media_dir.join(name);
        std::fs::write(&path, b"media-bytes").unwrap();
        path
    }

    #[tokio::test]
    async fn test_mp3_input_skips_conversion() {
        let h = harness(MockConverter::ok(), MockTranscriber::ok("hello"));
        let source = write_media(&h, "talk.mp3");

        let outcome = h
            .pipeline
            .run(&RunRequest::new(&source, ModelSize::Base), &RunLog::new())
            .await
            .unwrap();

        assert_eq!(h.converter.call_count(), 0);
        assert_eq!(h.transcriber.call_count(), 1);
        assert_eq!(h.transcriber.seen_path().unwrap(), source);
        assert!(outcome.converted_path.is_none());
    }

    #[tokio::test]
    async fn test_non_mp3_converts_exactly_once_before_transcription() {
        let h = harness(MockConverter::ok(), MockTranscriber::ok("hello"));
        let source = write_media(&h, "talk.wav");

        h.pipeline
            .run(&RunRequest::new(&source, ModelSize::Base), &RunLog::new())
            .await
            .unwrap();

        assert_eq!(h.converter.call_count(), 1);
        assert_eq!(h.transcriber.call_count(), 1);

        let seen = h.transcriber.seen_path().unwrap();
        assert_ne!(seen, source);
        assert_eq!(seen.extension().unwrap(), "mp3");
    }

    #[tokio::test]
    async fn test_conversion_failure_skips_transcription_and_removes_owned_source() {
        let h = harness(MockConverter::failing(), MockTranscriber::ok("hello"));
        let source = write_media(&h, "upload.webm");

        let mut request = RunRequest::new(&source, ModelSize::Tiny);
        request.remove_source = true;

        let err = h.pipeline.run(&request, &RunLog::new()).await.unwrap_err();

        assert!(matches!(err, SkrivError::Conversion(_)));
        assert_eq!(h.transcriber.call_count(), 0);
        assert!(!source.exists());
    }

    #[tokio::test]
    async fn test_transcription_failure_creates_no_output() {
        let h = harness(MockConverter::ok(), MockTranscriber::failing());
        let source = write_media(&h, "talk.mp3");

        let err = h
            .pipeline
            .run(&RunRequest::new(&source, ModelSize::Small), &RunLog::new())
            .await
            .unwrap_err();

        assert!(matches!(err, SkrivError::Transcription(_)));
        assert!(!h.pipeline.default_output_path(&source).exists());
    }

    #[tokio::test]
    async fn test_transcription_failure_does_not_overwrite_existing_output() {
        let h = harness(MockConverter::ok(), MockTranscriber::failing());
        let source = write_media(&h, "talk.mp3");

        std::fs::create_dir_all(&h.output_dir).unwrap();
        let existing = h.output_dir.join("kept.txt");
        std::fs::write(&existing, "previous run").unwrap();

        let mut request = RunRequest::new(&source, ModelSize::Small);
        request.output = Some(existing.clone());

        h.pipeline.run(&request, &RunLog::new()).await.unwrap_err();

        assert_eq!(std::fs::read_to_string(&existing).unwrap(), "previous run");
    }

    #[tokio::test]
    async fn test_output_equals_returned_text_byte_for_byte() {
        let text = "Hei verden — æøå, 你好";
        let h = harness(MockConverter::ok(), MockTranscriber::ok(text));
        let source = write_media(&h, "talk.mp3");

        let outcome = h
            .pipeline
            .run(&RunRequest::new(&source, ModelSize::Medium), &RunLog::new())
            .await
            .unwrap();

        let written = std::fs::read(&outcome.output_path).unwrap();
        assert_eq!(written, text.as_bytes());
        assert_eq!(outcome.text, text);
    }

    #[tokio::test]
    async fn test_default_output_path_derivation() {
        let h = harness(MockConverter::ok(), MockTranscriber::ok("hi"));
        let source = write_media(&h, "foo.wav");

        let outcome = h
            .pipeline
            .run(&RunRequest::new(&source, ModelSize::Base), &RunLog::new())
            .await
            .unwrap();

        assert_eq!(
            outcome.output_path,
            h.output_dir.join("foo_transcription.txt")
        );
        assert!(outcome.output_path.exists());
    }

    #[tokio::test]
    async fn test_end_to_end_mp4_with_tiny_model() {
        let text = "the quick brown fox";
        let h = harness(MockConverter::ok(), MockTranscriber::ok(text));
        let source = write_media(&h, "sample.mp4");

        let outcome = h
            .pipeline
            .run(&RunRequest::new(&source, ModelSize::Tiny), &RunLog::new())
            .await
            .unwrap();

        assert_eq!(h.converter.call_count(), 1);
        let seen = h.transcriber.seen_path().unwrap();
        assert_eq!(seen.extension().unwrap(), "mp3");

        assert_eq!(
            outcome.output_path,
            h.output_dir.join("sample_transcription.txt")
        );
        assert_eq!(
            std::fs::read_to_string(&outcome.output_path).unwrap(),
            text
        );
    }

    #[tokio::test]
    async fn test_converted_temp_removed_unless_retained() {
        let h = harness(MockConverter::ok(), MockTranscriber::ok("hi"));
        let source = write_media(&h, "a.wav");

        let outcome = h
            .pipeline
            .run(&RunRequest::new(&source, ModelSize::Base), &RunLog::new())
            .await
            .unwrap();
        assert!(outcome.converted_path.is_none());
        // The temp MP3 the transcriber saw is gone after the run.
        assert!(!h.transcriber.seen_path().unwrap().exists());

        let source2 = write_media(&h, "b.wav");
        let mut request = RunRequest::new(&source2, ModelSize::Base);
        request.keep_converted = true;

        let outcome = h.pipeline.run(&request, &RunLog::new()).await.unwrap();
        let kept = outcome.converted_path.unwrap();
        assert!(kept.exists());
    }

    #[tokio::test]
    async fn test_missing_input_reported_before_any_work() {
        let h = harness(MockConverter::ok(), MockTranscriber::ok("hi"));

        let err = h
            .pipeline
            .run(
                &RunRequest::new("/nonexistent/x.mp3", ModelSize::Base),
                &RunLog::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, SkrivError::MediaNotFound(_)));
        assert_eq!(h.converter.call_count(), 0);
        assert_eq!(h.transcriber.call_count(), 0);
    }

    #[test]
    fn test_run_log_collects_timestamped_lines() {
        let log = RunLog::new();
        log.push("first");
        log.push("second");

        let lines = log.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with('['));
        assert!(lines[0].ends_with("first"));
        assert!(lines[1].ends_with("second"));
    }
}
