//! The text-extraction collaborator boundary.
//!
//! Extraction is the only stage that talks to the outside world: it reads a
//! text file or runs an external tool (`pdftotext`, an OCR command) and hands
//! back a [`LineStream`] with page boundaries plus any images found next to
//! the source. External tools may hang, so every call is bounded.
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use std::time::Duration;
//! use wcagify::extract::{PlainTextExtractor, extract_with_timeout};
//!
//! let extractor = Arc::new(PlainTextExtractor::new());
//! let extraction = extract_with_timeout(extractor, Path::new("paper.txt"), Duration::from_secs(30))?;
//! println!("{} pages", extraction.page_count);
//! # Ok::<(), wcagify::Error>(())
//! ```

use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, LazyLock};
use std::thread;
use std::time::{Duration, Instant};

use regex::Regex;
use tracing::{debug, info, warn};

use crate::config::ExtractionConfig;
use crate::error::{Error, Result};
use crate::model::{ImageAsset, ImageSource, LineStream, TableAsset};
use crate::util::{decode_text, detect_mime_type, extract_image_dimensions};

/// Placeholder replaced with the source path in command arguments.
pub const INPUT_PLACEHOLDER: &str = "{input}";

/// How often a running command is checked for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Images smaller than this on either side are decoration, not figures.
const MIN_IMAGE_SIDE: u32 = 50;

/// "image_3_page_12.png" style names carry the source page.
static PAGE_IN_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:^|[_-])(?:page|p)[_-]?(\d{1,5})(?:[_.-]|$)").unwrap());

/// What the collaborator hands back for one source document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub lines: LineStream,
    pub images: Vec<ImageAsset>,
    pub tables: Vec<TableAsset>,
    pub page_count: usize,
}

impl Extraction {
    pub fn from_text(text: &str) -> Self {
        let lines = LineStream::from_text(text);
        let page_count = lines.page_count();
        Self {
            lines,
            images: Vec::new(),
            tables: Vec::new(),
            page_count,
        }
    }

    /// Non-whitespace characters of extracted text.
    pub fn text_len(&self) -> usize {
        self.lines.text_len()
    }
}

/// A source of text for one document.
pub trait TextExtractor: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    fn extract(&self, source: &Path) -> Result<Extraction>;

    /// Longest a single `extract` call may take, when the extractor bounds it.
    fn time_budget(&self) -> Option<Duration> {
        None
    }
}

/// Reads a text file that has already been extracted.
#[derive(Debug, Clone, Default)]
pub struct PlainTextExtractor {
    image_dir: Option<PathBuf>,
}

impl PlainTextExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also embed the images in `dir`.
    pub fn with_image_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.image_dir = Some(dir.into());
        self
    }
}

impl TextExtractor for PlainTextExtractor {
    fn name(&self) -> &str {
        "text"
    }

    fn extract(&self, source: &Path) -> Result<Extraction> {
        let bytes = std::fs::read(source)?;
        let mut extraction = Extraction::from_text(&decode_text(&bytes));
        if let Some(dir) = &self.image_dir {
            extraction.images = scan_image_dir(dir)?;
        }
        Ok(extraction)
    }
}

/// Runs an external program and reads the text it writes to stdout.
#[derive(Debug, Clone)]
pub struct CommandExtractor {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    image_dir: Option<PathBuf>,
}

impl CommandExtractor {
    /// `command[0]` is the program; `{input}` in any argument is replaced with
    /// the source path, which is appended when no argument mentions it.
    pub fn new(command: &[String], timeout: Duration) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| Error::Config("extraction command is empty".to_string()))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            timeout,
            image_dir: None,
        })
    }

    pub fn with_image_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.image_dir = Some(dir.into());
        self
    }

    fn arguments(&self, source: &Path) -> Vec<String> {
        let input = source.to_string_lossy();
        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|a| a.replace(INPUT_PLACEHOLDER, &input))
            .collect();
        if !self.args.iter().any(|a| a.contains(INPUT_PLACEHOLDER)) {
            args.push(input.into_owned());
        }
        args
    }

    fn run(&self, source: &Path) -> Result<Vec<u8>> {
        let mut child = Command::new(&self.program)
            .args(self.arguments(source))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => {
                    Error::Extraction(format!("'{}' not found; is it installed?", self.program))
                }
                _ => Error::Extraction(format!("failed to start '{}': {e}", self.program)),
            })?;

        // Drain both pipes while polling so a chatty child cannot block on a
        // full pipe buffer.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                warn!(program = %self.program, "Extraction command timed out; killed");
                return Err(Error::ExtractionTimeout {
                    seconds: self.timeout.as_secs(),
                });
            }
            thread::sleep(POLL_INTERVAL);
        };

        let stdout = stdout.join().unwrap_or_default();
        let stderr = stderr.join().unwrap_or_default();
        if !status.success() {
            let message = String::from_utf8_lossy(&stderr);
            return Err(Error::Extraction(format!(
                "'{}' exited with {status}: {}",
                self.program,
                message.trim()
            )));
        }
        Ok(stdout)
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

impl TextExtractor for CommandExtractor {
    fn name(&self) -> &str {
        &self.program
    }

    fn time_budget(&self) -> Option<Duration> {
        Some(self.timeout)
    }

    fn extract(&self, source: &Path) -> Result<Extraction> {
        debug!(program = %self.program, source = %source.display(), "Running extraction command");
        let stdout = self.run(source)?;
        let mut extraction = Extraction::from_text(&decode_text(&stdout));
        if let Some(dir) = &self.image_dir {
            extraction.images = scan_image_dir(dir)?;
        }
        Ok(extraction)
    }
}

/// Tries a primary extractor and switches to a fallback (typically OCR) when
/// the primary fails or yields fewer than `min_text_len` characters.
pub struct FallbackExtractor {
    primary: Box<dyn TextExtractor>,
    fallback: Box<dyn TextExtractor>,
    min_text_len: usize,
}

impl FallbackExtractor {
    pub fn new(
        primary: Box<dyn TextExtractor>,
        fallback: Box<dyn TextExtractor>,
        min_text_len: usize,
    ) -> Self {
        Self {
            primary,
            fallback,
            min_text_len,
        }
    }
}

impl TextExtractor for FallbackExtractor {
    fn name(&self) -> &str {
        self.primary.name()
    }

    /// The fallback may run after the primary used its whole budget.
    fn time_budget(&self) -> Option<Duration> {
        Some(self.primary.time_budget()? + self.fallback.time_budget()?)
    }

    fn extract(&self, source: &Path) -> Result<Extraction> {
        let primary = match self.primary.extract(source) {
            Ok(extraction) if extraction.text_len() >= self.min_text_len => return Ok(extraction),
            Ok(extraction) => {
                warn!(
                    extractor = self.primary.name(),
                    chars = extraction.text_len(),
                    "Extraction yielded little text, trying {}",
                    self.fallback.name()
                );
                extraction
            }
            Err(err) => {
                warn!(extractor = self.primary.name(), %err, "Extraction failed, trying {}", self.fallback.name());
                return self.fallback.extract(source);
            }
        };

        match self.fallback.extract(source) {
            Ok(fallback) if fallback.text_len() > primary.text_len() => Ok(fallback),
            Ok(_) => Ok(primary),
            Err(err) => {
                warn!(extractor = self.fallback.name(), %err, "Fallback extraction failed");
                Ok(primary)
            }
        }
    }
}

/// Build the extractor a configuration describes. `.txt` sources are read
/// directly; anything else goes through the configured command.
pub fn extractor_for(source: &Path, config: &ExtractionConfig) -> Result<Arc<dyn TextExtractor>> {
    let is_text = source
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("txt"));
    if is_text {
        let mut extractor = PlainTextExtractor::new();
        if let Some(dir) = &config.image_dir {
            extractor = extractor.with_image_dir(dir);
        }
        return Ok(Arc::new(extractor));
    }

    let timeout = Duration::from_secs(config.timeout_secs);
    let mut primary = CommandExtractor::new(&config.command, timeout)?;
    if let Some(dir) = &config.image_dir {
        primary = primary.with_image_dir(dir);
    }
    match &config.fallback_command {
        Some(command) => {
            let mut fallback = CommandExtractor::new(command, timeout)?;
            if let Some(dir) = &config.image_dir {
                fallback = fallback.with_image_dir(dir);
            }
            Ok(Arc::new(FallbackExtractor::new(
                Box::new(primary),
                Box::new(fallback),
                config.min_text_len,
            )))
        }
        None => Ok(Arc::new(primary)),
    }
}

/// Run an extractor on a worker thread and give up after `timeout`.
///
/// A timed-out worker is abandoned, not interrupted; command extractors
/// enforce their own deadline and kill the child.
pub fn extract_with_timeout(
    extractor: Arc<dyn TextExtractor>,
    source: &Path,
    timeout: Duration,
) -> Result<Extraction> {
    let (tx, rx) = mpsc::channel();
    let path = source.to_path_buf();
    let name = extractor.name().to_string();
    thread::spawn(move || {
        let _ = tx.send(extractor.extract(&path));
    });

    let started = Instant::now();
    match rx.recv_timeout(timeout) {
        Ok(result) => {
            let extraction = result?;
            info!(
                extractor = %name,
                pages = extraction.page_count,
                lines = extraction.lines.len(),
                images = extraction.images.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Extracted text"
            );
            Ok(extraction)
        }
        Err(RecvTimeoutError::Timeout) => {
            warn!(extractor = %name, "Extraction timed out");
            Err(Error::ExtractionTimeout {
                seconds: timeout.as_secs(),
            })
        }
        Err(RecvTimeoutError::Disconnected) => Err(Error::Extraction(format!(
            "{name} stopped without producing a result"
        ))),
    }
}

/// Embed every image in `dir`, in file-name order. The page comes from a
/// `page_N` or `pN` marker in the name, defaulting to the first page.
pub fn scan_image_dir(dir: &Path) -> Result<Vec<ImageAsset>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .collect();
    paths.sort();

    let mut images = Vec::new();
    for path in paths {
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        let bytes = std::fs::read(&path)?;
        let Some(mime) = detect_mime_type(&name, &bytes) else {
            continue;
        };
        let dimensions = extract_image_dimensions(&bytes);
        if dimensions.is_some_and(|(w, h)| w < MIN_IMAGE_SIDE || h < MIN_IMAGE_SIDE) {
            debug!(image = %name, "Skipping decorative image");
            continue;
        }

        let page = PAGE_IN_NAME_RE
            .captures(&name)
            .and_then(|c| c[1].parse::<usize>().ok())
            .map_or(1, |p| p.max(1));
        let mut image = ImageAsset::new(
            name,
            page,
            ImageSource::Data {
                mime: mime.to_string(),
                bytes,
            },
        );
        if let Some((width, height)) = dimensions {
            image.width = Some(width);
            image.height = Some(height);
        }
        images.push(image);
    }
    debug!(dir = %dir.display(), count = images.len(), "Scanned image directory");
    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str);

    impl TextExtractor for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn extract(&self, _source: &Path) -> Result<Extraction> {
            Ok(Extraction::from_text(self.0))
        }
    }

    struct Failing;

    impl TextExtractor for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn extract(&self, _source: &Path) -> Result<Extraction> {
            Err(Error::Extraction("no tool".to_string()))
        }
    }

    struct Slow;

    impl TextExtractor for Slow {
        fn name(&self) -> &str {
            "slow"
        }

        fn extract(&self, _source: &Path) -> Result<Extraction> {
            thread::sleep(Duration::from_secs(2));
            Ok(Extraction::default())
        }
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut data = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];
        data.extend_from_slice(b"IHDR");
        data.extend_from_slice(&width.to_be_bytes());
        data.extend_from_slice(&height.to_be_bytes());
        data
    }

    #[test]
    fn plain_text_pages_and_encoding() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paper.txt");
        std::fs::write(&path, b"Caf\xE9\nline two\n\x0cpage two\n").unwrap();
        let extraction = PlainTextExtractor::new().extract(&path).unwrap();
        assert_eq!(extraction.lines.lines[0], "Café");
        assert_eq!(extraction.page_count, 2);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = PlainTextExtractor::new()
            .extract(Path::new("/nonexistent/paper.txt"))
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn command_arguments_substitute_input() {
        let command = ["pdftotext", "-layout", "{input}", "-"].map(String::from);
        let extractor = CommandExtractor::new(&command, Duration::from_secs(1)).unwrap();
        assert_eq!(
            extractor.arguments(Path::new("a b.pdf")),
            vec!["-layout", "a b.pdf", "-"]
        );

        let bare = CommandExtractor::new(&["ocr".to_string()], Duration::from_secs(1)).unwrap();
        assert_eq!(bare.arguments(Path::new("x.pdf")), vec!["x.pdf"]);
        assert!(CommandExtractor::new(&[], Duration::from_secs(1)).is_err());
    }

    #[test]
    fn unknown_program_is_an_extraction_error() {
        let command = ["wcagify-no-such-tool".to_string()];
        let extractor = CommandExtractor::new(&command, Duration::from_secs(1)).unwrap();
        let err = extractor.extract(Path::new("x.pdf")).unwrap_err();
        assert!(matches!(err, Error::Extraction(ref m) if m.contains("not found")));
    }

    #[cfg(unix)]
    #[test]
    fn command_output_and_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        std::fs::write(&path, "Title\nBody text\n").unwrap();

        let cat = ["cat".to_string(), INPUT_PLACEHOLDER.to_string()];
        let extraction = CommandExtractor::new(&cat, Duration::from_secs(10))
            .unwrap()
            .extract(&path)
            .unwrap();
        assert_eq!(extraction.lines.lines, vec!["Title", "Body text"]);

        let sleep = ["sleep".to_string(), "5".to_string()];
        let started = Instant::now();
        let err = CommandExtractor::new(&sleep, Duration::from_millis(200))
            .unwrap()
            .run(&path)
            .unwrap_err();
        assert!(matches!(err, Error::ExtractionTimeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn fallback_on_failure_or_thin_text() {
        let source = Path::new("scan.pdf");
        let chain = FallbackExtractor::new(Box::new(Failing), Box::new(Fixed("ocr text here")), 5);
        assert_eq!(chain.extract(source).unwrap().lines.lines, vec!["ocr text here"]);

        let chain = FallbackExtractor::new(Box::new(Fixed("ab")), Box::new(Fixed("recognised page")), 5);
        assert_eq!(chain.extract(source).unwrap().lines.lines, vec!["recognised page"]);

        let chain = FallbackExtractor::new(Box::new(Fixed("enough text")), Box::new(Failing), 5);
        assert_eq!(chain.extract(source).unwrap().lines.lines, vec!["enough text"]);

        let chain = FallbackExtractor::new(Box::new(Fixed("ab")), Box::new(Failing), 5);
        assert_eq!(chain.extract(source).unwrap().lines.lines, vec!["ab"]);
    }

    #[test]
    fn fallback_chain_budget_covers_both_commands() {
        let config = ExtractionConfig {
            timeout_secs: 30,
            fallback_command: Some(vec!["tesseract".to_string(), INPUT_PLACEHOLDER.to_string()]),
            ..ExtractionConfig::default()
        };
        let chain = extractor_for(Path::new("scan.pdf"), &config).unwrap();
        assert_eq!(chain.time_budget(), Some(Duration::from_secs(60)));

        let single = extractor_for(Path::new("scan.pdf"), &ExtractionConfig::default()).unwrap();
        assert_eq!(single.time_budget(), Some(Duration::from_secs(120)));

        let scripted = FallbackExtractor::new(Box::new(Failing), Box::new(Fixed("text")), 5);
        assert_eq!(scripted.time_budget(), None);
    }

    #[test]
    fn worker_timeout() {
        let err = extract_with_timeout(Arc::new(Slow), Path::new("x"), Duration::from_millis(50))
            .unwrap_err();
        assert!(matches!(err, Error::ExtractionTimeout { .. }));

        let ok = extract_with_timeout(Arc::new(Fixed("a\nb")), Path::new("x"), Duration::from_secs(5))
            .unwrap();
        assert_eq!(ok.lines.len(), 2);
    }

    #[test]
    fn image_directory_scan() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("image_2_page_7.png"), png(120, 80)).unwrap();
        std::fs::write(dir.path().join("image_1_page_3.png"), png(300, 200)).unwrap();
        std::fs::write(dir.path().join("bullet.png"), png(8, 8)).unwrap();
        std::fs::write(dir.path().join("images_metadata.json"), "[]").unwrap();

        let images = scan_image_dir(dir.path()).unwrap();
        let summary: Vec<(&str, usize, Option<u32>)> = images
            .iter()
            .map(|i| (i.id.as_str(), i.page, i.width))
            .collect();
        assert_eq!(
            summary,
            vec![("image_1_page_3.png", 3, Some(300)), ("image_2_page_7.png", 7, Some(120))]
        );
        assert!(matches!(&images[0].source, ImageSource::Data { mime, .. } if mime == "image/png"));
    }

    #[test]
    fn text_sources_skip_the_command() {
        let config = ExtractionConfig::default();
        let extractor = extractor_for(Path::new("notes.TXT"), &config).unwrap();
        assert_eq!(extractor.name(), "text");
        let extractor = extractor_for(Path::new("paper.pdf"), &config).unwrap();
        assert_eq!(extractor.name(), "pdftotext");
    }
}
