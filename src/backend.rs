//! Conversion backends.
//!
//! A backend turns (already placeholder-masked) Markdown into blocks. The
//! built-in backend is always available and never fails; the bridge backend
//! hands the document to an external process and can fail in many ways, all
//! of which the converter treats as "fall back to the built-in one".

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use tracing::{debug, instrument};

use crate::block::Block;
use crate::classifier::Classifier;
use crate::config::{BridgeConfig, Config};
use crate::error::{ConvertError, Result};
use crate::links::link_bare_urls_in_tables;
use crate::notion::from_notion_json;

/// How often a running bridge process is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Something that turns Markdown into blocks.
pub trait Backend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    fn convert(&self, markdown: &str) -> Result<Vec<Block>>;
}

/// Markdown → HTML → DOM → blocks, entirely in process.
#[derive(Debug, Clone, Default)]
pub struct BuiltinBackend {
    classifier: Classifier,
}

impl BuiltinBackend {
    pub fn new(config: &Config) -> Self {
        Self {
            classifier: Classifier::from_config(config),
        }
    }

    /// Infallible form of [`Backend::convert`].
    pub fn render(&self, markdown: &str) -> Vec<Block> {
        self.classifier.render(markdown)
    }
}

impl Backend for BuiltinBackend {
    fn name(&self) -> &str {
        "builtin"
    }

    fn convert(&self, markdown: &str) -> Result<Vec<Block>> {
        Ok(self.render(markdown))
    }
}

/// Runs an external converter on a scratch copy of the document.
///
/// The program is invoked as `<program> <args...> --file=<scratch.md>` and must
/// print a JSON array of Notion blocks on stdout.
#[derive(Debug, Clone)]
pub struct BridgeBackend {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl BridgeBackend {
    pub fn new(config: &BridgeConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    fn spawn(&self, input: &std::path::Path, stdout: &File, stderr: &File) -> Result<Child> {
        let result = Command::new(&self.program)
            .args(&self.args)
            .arg(format!("--file={}", input.display()))
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout.try_clone()?))
            .stderr(Stdio::from(stderr.try_clone()?))
            .spawn();

        match result {
            Ok(child) => Ok(child),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ConvertError::BridgeNotFound(self.program.clone()))
            }
            Err(e) => Err(ConvertError::BridgeFailed(format!("{} could not start: {e}", self.program))),
        }
    }
}

impl Backend for BridgeBackend {
    fn name(&self) -> &str {
        "bridge"
    }

    #[instrument(skip_all, fields(program = %self.program))]
    fn convert(&self, markdown: &str) -> Result<Vec<Block>> {
        // Dropping these removes them, whichever way we leave
        let mut input = tempfile::Builder::new()
            .prefix("notion-markdown-")
            .suffix(".md")
            .tempfile()?;
        input.write_all(markdown.as_bytes())?;
        input.flush()?;

        let mut stdout = tempfile::tempfile()?;
        let mut stderr = tempfile::tempfile()?;

        let mut child = self.spawn(input.path(), &stdout, &stderr)?;
        let status = wait_with_timeout(&mut child, self.timeout)?;

        if !status.success() {
            let message = read_all(&mut stderr).unwrap_or_default();
            return Err(ConvertError::BridgeFailed(format!(
                "exited with {}: {}",
                status,
                message.trim()
            )));
        }

        let output = read_all(&mut stdout)?;
        let mut blocks = from_notion_json(output.trim())?;
        if blocks.is_empty() {
            return Err(ConvertError::BridgeFailed("produced no blocks".to_string()));
        }
        link_bare_urls_in_tables(&mut blocks);
        debug!(blocks = blocks.len(), "Bridge conversion finished");
        Ok(blocks)
    }
}

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<ExitStatus> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(ConvertError::BridgeTimeout(timeout.as_secs()));
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

fn read_all(file: &mut File) -> Result<String> {
    file.seek(SeekFrom::Start(0))?;
    let mut content = String::new();
    file.read_to_string(&mut content)?;
    Ok(content)
}
