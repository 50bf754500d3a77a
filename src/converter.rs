use tracing::{debug, instrument, warn};

use crate::backend::{Backend, BridgeBackend, BuiltinBackend};
use crate::block::Block;
use crate::config::{BackendKind, Config};
use crate::input::MarkdownInput;
use crate::links;

/// Markdown to blocks, with link preservation and backend fallback.
///
/// Holds no per-call state, so one converter can serve many threads.
pub struct Converter {
    primary: Box<dyn Backend>,
    fallback: BuiltinBackend,
    preserve_links: bool,
    debug: bool,
}

impl Default for Converter {
    fn default() -> Self {
        Self::new(&Config::compiled_default())
    }
}

impl Converter {
    /// Build a converter; the backend is chosen here, once.
    pub fn new(config: &Config) -> Self {
        let primary: Box<dyn Backend> = match config.backend.kind {
            BackendKind::Builtin => Box::new(BuiltinBackend::new(config)),
            BackendKind::Bridge => Box::new(BridgeBackend::new(&config.bridge)),
        };
        Self::with_backend(primary, config)
    }

    /// Use a caller-supplied primary backend; the built-in one stays the fallback.
    pub fn with_backend(primary: Box<dyn Backend>, config: &Config) -> Self {
        if let Err(e) = config.validate() {
            warn!("Converter built from an unusable config, defaults apply where needed: {}", e);
        }
        Self {
            primary,
            fallback: BuiltinBackend::new(config),
            preserve_links: config.links.preserve,
            debug: config.debug,
        }
    }

    pub fn backend_name(&self) -> &str {
        self.primary.name()
    }

    /// Convert a document. Never fails: unusable input gives no blocks.
    pub fn convert(&self, input: impl Into<MarkdownInput>) -> Vec<Block> {
        let Some(markdown) = input.into().normalize() else {
            warn!("Input could not be turned into text; producing no blocks");
            return Vec::new();
        };

        let blocks = self.convert_text(&markdown);
        if self.debug {
            LinkReport::build(&markdown, blocks.clone()).log();
        }
        blocks
    }

    /// Convert and report which source URLs did not come out as links.
    pub fn debug_report(&self, input: impl Into<MarkdownInput>) -> LinkReport {
        let markdown = input.into().normalize().unwrap_or_default();
        let blocks = self.convert_text(&markdown);
        LinkReport::build(&markdown, blocks)
    }

    #[instrument(skip_all, fields(backend = self.primary.name(), len = markdown.len()))]
    fn convert_text(&self, markdown: &str) -> Vec<Block> {
        if markdown.is_empty() {
            return Vec::new();
        }
        if !self.preserve_links {
            return self.run_backend(markdown);
        }

        let (masked, table) = links::preprocess(markdown);
        debug!(placeholders = table.len(), "Masked links");
        let blocks = self.run_backend(&masked);
        links::postprocess(blocks, &table)
    }

    fn run_backend(&self, markdown: &str) -> Vec<Block> {
        match self.primary.convert(markdown) {
            Ok(blocks) => blocks,
            Err(e) => {
                warn!(
                    "{} backend failed, falling back to built-in conversion: {}",
                    self.primary.name(),
                    e
                );
                self.fallback.render(markdown)
            }
        }
    }
}

/// Which URLs in a document survived conversion as links or images.
#[derive(Debug, Clone)]
pub struct LinkReport {
    pub markdown: String,
    pub urls_in_markdown: Vec<String>,
    pub urls_in_blocks: Vec<String>,
    pub missing_urls: Vec<String>,
    pub blocks: Vec<Block>,
}

impl LinkReport {
    fn build(markdown: &str, blocks: Vec<Block>) -> Self {
        let urls_in_markdown = links::find_urls(markdown);
        let urls_in_blocks: Vec<String> = blocks
            .iter()
            .flat_map(|block| block.urls())
            .map(str::to_string)
            .collect();
        let missing_urls = urls_in_markdown
            .iter()
            .filter(|url| !urls_in_blocks.contains(*url))
            .cloned()
            .collect();
        Self {
            markdown: markdown.to_string(),
            urls_in_markdown,
            urls_in_blocks,
            missing_urls,
            blocks,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.missing_urls.is_empty()
    }

    fn log(&self) {
        debug!(urls = ?self.urls_in_markdown, "URLs in markdown");
        debug!(urls = ?self.urls_in_blocks, "URLs in blocks");
        if !self.is_complete() {
            warn!(urls = ?self.missing_urls, "URLs missing from converted blocks");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::TextRun;
    use crate::error::{ConvertError, Result};
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Mutex};

    struct Failing;

    impl Backend for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn convert(&self, _markdown: &str) -> Result<Vec<Block>> {
            Err(ConvertError::BridgeTimeout(30))
        }
    }

    /// Echoes its input back as one paragraph and remembers what it saw.
    struct Recording(Arc<Mutex<Vec<String>>>);

    impl Backend for Recording {
        fn name(&self) -> &str {
            "recording"
        }

        fn convert(&self, markdown: &str) -> Result<Vec<Block>> {
            if let Ok(mut seen) = self.0.lock() {
                seen.push(markdown.to_string());
            }
            Ok(vec![Block::Paragraph {
                runs: vec![TextRun::plain(markdown)],
            }])
        }
    }

    #[test]
    fn failing_backend_falls_back() {
        let converter = Converter::with_backend(Box::new(Failing), &Config::default());
        assert_eq!(
            converter.convert("# Hi"),
            vec![Block::Heading {
                level: 1,
                runs: vec![TextRun::plain("Hi")],
            }]
        );
    }

    #[test]
    fn backend_sees_masked_text_and_links_come_back() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let converter = Converter::with_backend(Box::new(Recording(seen.clone())), &Config::default());
        let blocks = converter.convert("see https://x.com");
        assert_eq!(seen.lock().unwrap().as_slice(), ["see URLPLACEHOLDER0END"]);
        assert_eq!(
            blocks,
            vec![Block::Paragraph {
                runs: vec![TextRun::plain("see "), TextRun::linked("https://x.com", "https://x.com")],
            }]
        );
    }

    #[test]
    fn links_can_be_left_alone() {
        let mut config = Config::default();
        config.links.preserve = false;
        let seen = Arc::new(Mutex::new(Vec::new()));
        let converter = Converter::with_backend(Box::new(Recording(seen.clone())), &config);
        converter.convert("see https://x.com");
        assert_eq!(seen.lock().unwrap().as_slice(), ["see https://x.com"]);
    }

    #[test]
    fn null_and_empty_inputs() {
        let converter = Converter::default();
        assert!(converter.convert(serde_json::Value::Null).is_empty());
        assert!(converter.convert("").is_empty());
        assert!(converter.convert("   \n\n ").is_empty());
    }

    #[test]
    fn debug_mode_does_not_change_blocks() {
        let mut config = Config::default();
        config.debug = true;
        let md = "Visit https://a.com\n\n```\nhttps://b.com\n```";
        assert_eq!(Converter::new(&config).convert(md), Converter::default().convert(md));
    }

    #[test]
    fn zero_column_limit_keeps_tables() {
        let mut config = Config::default();
        config.tables.max_columns = 0;
        let blocks = Converter::new(&config).convert("| a | b |\n|---|---|\n| 1 | 2 |");
        assert!(matches!(blocks.as_slice(), [Block::Table { width: 2, .. }]));
    }

    #[test]
    fn report_lists_missing_urls() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut config = Config::default();
        config.links.preserve = false;
        let converter = Converter::with_backend(Box::new(Recording(seen)), &config);
        let report = converter.debug_report("see https://x.com");
        assert_eq!(report.urls_in_markdown, vec!["https://x.com"]);
        assert!(report.urls_in_blocks.is_empty());
        assert_eq!(report.missing_urls, vec!["https://x.com"]);
        assert!(!report.is_complete());

        let report = Converter::default().debug_report("see https://x.com and [y](https://y.com)");
        assert!(report.is_complete());
        assert_eq!(report.urls_in_blocks, vec!["https://x.com", "https://y.com"]);
    }
}
