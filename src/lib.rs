//! Markdown to Notion blocks.
//!
//! Parses Markdown into typed blocks (headings, paragraphs, list items,
//! quotes, code, dividers, images, tables) whose rich text carries formatting
//! annotations and links, ready to be sent as Notion page children.
//!
//! ```
//! let blocks = notion_markdown::markdown_to_blocks("Visit [Docs](https://docs.example.com)");
//! assert_eq!(blocks[0].urls(), vec!["https://docs.example.com"]);
//! ```

mod backend;
mod block;
mod classifier;
mod config;
mod converter;
mod error;
mod inline;
mod input;
mod links;
mod notion;
mod page;
mod table;

pub use backend::{Backend, BridgeBackend, BuiltinBackend};
pub use block::{Annotations, Block, TableRow, TextRun};
pub use classifier::{Classifier, markdown_to_html};
pub use config::{BackendConfig, BackendKind, BridgeConfig, CodeConfig, Config, LinksConfig, TablesConfig};
pub use converter::{Converter, LinkReport};
pub use error::{ConvertError, Result};
pub use input::MarkdownInput;
pub use links::{LinkKind, LinkPlaceholder, LinkTable, find_urls, postprocess, preprocess};
pub use notion::{NotionBlock, from_notion_json, to_notion_json};
pub use page::{NOTION_MAX_CHILDREN, batch_blocks, extract_title};

/// Parse markdown text into a vector of blocks using the default config.
pub fn markdown_to_blocks(markdown: &str) -> Vec<Block> {
    Converter::default().convert(markdown)
}

/// Convert markdown with a custom config.
pub fn markdown_to_blocks_with_config(markdown: &str, config: &Config) -> Vec<Block> {
    Converter::new(config).convert(markdown)
}

/// Convert markdown straight to a Notion `children` JSON array.
pub fn markdown_to_notion_json(markdown: &str) -> serde_json::Value {
    to_notion_json(&markdown_to_blocks(markdown))
}
