use std::sync::LazyLock;

use pulldown_cmark::{Options, Parser, html};
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::block::{Block, TextRun};
use crate::config::{Config, TablesConfig};
use crate::inline::{flattened_text, runs_for};
use crate::table::table_blocks;

static CODE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("code").expect("BUG: hardcoded selector 'code' is valid"));

static IMG_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img[src]").expect("BUG: hardcoded selector 'img[src]' is valid"));

/// Markdown extensions the classifier understands.
pub(crate) fn parser_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_YAML_STYLE_METADATA_BLOCKS);
    options
}

/// Render Markdown to HTML.
pub fn markdown_to_html(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, parser_options());

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

/// Turns top-level HTML nodes into blocks, one node at a time.
#[derive(Debug, Clone)]
pub struct Classifier {
    default_language: String,
    max_columns: usize,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl Classifier {
    pub fn from_config(config: &Config) -> Self {
        Self {
            default_language: config.code.default_language.clone(),
            max_columns: match config.tables.max_columns {
                0 => TablesConfig::default().max_columns,
                limit => limit,
            },
        }
    }

    /// Markdown straight to blocks.
    pub fn render(&self, markdown: &str) -> Vec<Block> {
        self.classify_html(&markdown_to_html(markdown))
    }

    pub fn classify_html(&self, html: &str) -> Vec<Block> {
        let fragment = Html::parse_fragment(html);
        let mut blocks = Vec::new();
        for element in fragment.root_element().children().filter_map(ElementRef::wrap) {
            self.classify(element, &mut blocks);
        }
        debug!(blocks = blocks.len(), "Classified HTML");
        blocks
    }

    fn classify(&self, element: ElementRef, blocks: &mut Vec<Block>) {
        match element.value().name() {
            "h1" => blocks.push(heading(1, element)),
            "h2" => blocks.push(heading(2, element)),
            "h3" => blocks.push(heading(3, element)),
            "p" => self.paragraph(element, blocks),
            "ul" => blocks.extend(list_items(element).map(|runs| Block::BulletItem { runs })),
            "ol" => blocks.extend(list_items(element).map(|runs| Block::NumberedItem { runs })),
            "blockquote" => blocks.push(Block::Quote {
                runs: runs_for(element),
            }),
            "pre" => blocks.push(self.code_block(element)),
            "hr" => blocks.push(Block::Divider),
            "table" => blocks.extend(table_blocks(element, self.max_columns)),
            "img" => blocks.extend(image(element)),
            "div" | "span" => self.container(element, blocks),
            _ => {
                let text = flattened_text(element);
                let text = text.trim();
                if !text.is_empty() {
                    blocks.push(Block::Paragraph {
                        runs: vec![TextRun::plain(text)],
                    });
                }
            }
        }
    }

    fn paragraph(&self, element: ElementRef, blocks: &mut Vec<Block>) {
        if !flattened_text(element).trim().is_empty() {
            blocks.push(Block::Paragraph {
                runs: runs_for(element),
            });
        }
        // `![alt](src)` renders as an image inside a paragraph
        blocks.extend(element.select(&IMG_SELECTOR).filter_map(image));
    }

    fn code_block(&self, element: ElementRef) -> Block {
        let language = element
            .select(&CODE_SELECTOR)
            .next()
            .and_then(|code| {
                code.value()
                    .classes()
                    .find_map(|class| class.strip_prefix("language-"))
                    .map(str::to_string)
            })
            .unwrap_or_else(|| self.default_language.clone());

        let mut text = flattened_text(element);
        if text.ends_with('\n') {
            text.pop();
        }
        Block::CodeBlock { text, language }
    }

    fn container(&self, element: ElementRef, blocks: &mut Vec<Block>) {
        let paragraphs: Vec<ElementRef> = element
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|child| child.value().name() == "p")
            .collect();

        if paragraphs.is_empty() {
            let runs = runs_for(element);
            if !runs.is_empty() {
                blocks.push(Block::Paragraph { runs });
            }
            return;
        }
        for paragraph in paragraphs {
            self.paragraph(paragraph, blocks);
        }
    }
}

fn heading(level: u8, element: ElementRef) -> Block {
    Block::Heading {
        level,
        runs: runs_for(element),
    }
}

fn list_items<'a>(list: ElementRef<'a>) -> impl Iterator<Item = Vec<TextRun>> + 'a {
    list.children()
        .filter_map(ElementRef::wrap)
        .filter(|child| child.value().name() == "li")
        .map(runs_for)
}

fn image(element: ElementRef) -> Option<Block> {
    let src = element.value().attr("src")?;
    if src.starts_with("http://") || src.starts_with("https://") {
        Some(Block::Image {
            url: src.to_string(),
        })
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn render(markdown: &str) -> Vec<Block> {
        Classifier::default().render(markdown)
    }

    #[test]
    fn heading_levels() {
        assert_eq!(
            render("# One\n\n## Two\n\n### Three"),
            vec![
                Block::Heading {
                    level: 1,
                    runs: vec![TextRun::plain("One")],
                },
                Block::Heading {
                    level: 2,
                    runs: vec![TextRun::plain("Two")],
                },
                Block::Heading {
                    level: 3,
                    runs: vec![TextRun::plain("Three")],
                },
            ]
        );
    }

    #[test]
    fn deep_heading_falls_back_to_paragraph() {
        assert_eq!(
            render("#### Deep"),
            vec![Block::Paragraph {
                runs: vec![TextRun::plain("Deep")],
            }]
        );
    }

    #[test]
    fn list_items_are_separate_blocks() {
        assert_eq!(
            render("- one\n- two\n\n1. first"),
            vec![
                Block::BulletItem {
                    runs: vec![TextRun::plain("one")],
                },
                Block::BulletItem {
                    runs: vec![TextRun::plain("two")],
                },
                Block::NumberedItem {
                    runs: vec![TextRun::plain("first")],
                },
            ]
        );
    }

    #[test]
    fn code_fence_language() {
        assert_eq!(
            render("```rust\nlet x = 1;\n```\n\n```\nplain\n```"),
            vec![
                Block::CodeBlock {
                    text: "let x = 1;".to_string(),
                    language: "rust".to_string(),
                },
                Block::CodeBlock {
                    text: "plain".to_string(),
                    language: "plain text".to_string(),
                },
            ]
        );
    }

    #[test]
    fn quote_and_divider() {
        assert_eq!(
            render("> quoted\n\n---"),
            vec![
                Block::Quote {
                    runs: vec![TextRun::plain("quoted")],
                },
                Block::Divider,
            ]
        );
    }

    #[test]
    fn markdown_image_inside_paragraph() {
        assert_eq!(
            render("![logo](https://img.example.com/logo.png)\n\n![local](logo.png)"),
            vec![Block::Image {
                url: "https://img.example.com/logo.png".to_string(),
            }]
        );
    }

    #[test]
    fn raw_html_image_needs_absolute_url() {
        let classifier = Classifier::default();
        assert_eq!(
            classifier.classify_html(r#"<img src="https://x.com/a.png"><img src="/a.png">"#),
            vec![Block::Image {
                url: "https://x.com/a.png".to_string(),
            }]
        );
    }

    #[test]
    fn whitespace_paragraph_is_dropped() {
        let classifier = Classifier::default();
        assert!(classifier.classify_html("<p>   \n </p>").is_empty());
    }

    #[test]
    fn container_with_paragraphs() {
        let classifier = Classifier::default();
        assert_eq!(
            classifier.classify_html("<div><p>a</p><p> </p><p><b>b</b></p></div>"),
            vec![
                Block::Paragraph {
                    runs: vec![TextRun::plain("a")],
                },
                Block::Paragraph {
                    runs: vec![TextRun::plain("b").with_annotations(crate::block::Annotations {
                        bold: true,
                        ..Default::default()
                    })],
                },
            ]
        );
    }

    #[test]
    fn container_without_paragraphs() {
        let classifier = Classifier::default();
        assert_eq!(
            classifier.classify_html("<div>loose <em>text</em></div>"),
            vec![Block::Paragraph {
                runs: vec![
                    TextRun::plain("loose "),
                    TextRun::plain("text").with_annotations(crate::block::Annotations {
                        italic: true,
                        ..Default::default()
                    }),
                ],
            }]
        );
    }

    #[test]
    fn unknown_element_becomes_plain_paragraph() {
        let classifier = Classifier::default();
        assert_eq!(
            classifier.classify_html("<dl><dt>term</dt></dl><section>  </section>"),
            vec![Block::Paragraph {
                runs: vec![TextRun::plain("term")],
            }]
        );
    }

    #[test]
    fn strikethrough_extension() {
        let blocks = render("~~gone~~");
        let runs = blocks[0].runs().unwrap();
        assert!(runs[0].annotations.strikethrough);
    }

    #[test]
    fn front_matter_is_ignored() {
        assert_eq!(
            render("---\ntitle: x\n---\n\nBody"),
            vec![Block::Paragraph {
                runs: vec![TextRun::plain("Body")],
            }]
        );
    }
}
