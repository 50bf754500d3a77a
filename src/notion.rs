//! Notion block JSON.
//!
//! Wire types mirror the shape the Notion API accepts for page children. They
//! are used in both directions: blocks are serialized for the caller, and the
//! bridge backend's stdout is deserialized back into [`Block`]s.

use serde::{Deserialize, Serialize};

use crate::block::{Annotations, Block, TableRow, TextRun};
use crate::error::{ConvertError, Result};
use crate::table::normalize_rows;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotionBlock {
    #[serde(default = "block_object")]
    pub object: String,
    #[serde(flatten)]
    pub body: BlockBody,
}

fn block_object() -> String {
    "block".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockBody {
    Paragraph {
        paragraph: RichTextBody,
    },
    #[serde(rename = "heading_1")]
    Heading1 {
        heading_1: RichTextBody,
    },
    #[serde(rename = "heading_2")]
    Heading2 {
        heading_2: RichTextBody,
    },
    #[serde(rename = "heading_3")]
    Heading3 {
        heading_3: RichTextBody,
    },
    BulletedListItem {
        bulleted_list_item: RichTextBody,
    },
    NumberedListItem {
        numbered_list_item: RichTextBody,
    },
    Quote {
        quote: RichTextBody,
    },
    Code {
        code: CodeBody,
    },
    Divider {
        #[serde(default)]
        divider: EmptyBody,
    },
    Image {
        image: ImageBody,
    },
    Table {
        table: TableBody,
    },
    TableRow {
        table_row: TableRowBody,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RichTextBody {
    #[serde(default)]
    pub rich_text: Vec<RichText>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodeBody {
    #[serde(default)]
    pub rich_text: Vec<RichText>,
    #[serde(default = "plain_text_language")]
    pub language: String,
}

fn plain_text_language() -> String {
    "plain text".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EmptyBody {}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageBody {
    #[serde(rename = "type", default = "external_kind")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external: Option<FileUrl>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileUrl>,
}

fn external_kind() -> String {
    "external".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileUrl {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableBody {
    pub table_width: usize,
    #[serde(default)]
    pub has_column_header: bool,
    #[serde(default)]
    pub has_row_header: bool,
    #[serde(default)]
    pub children: Vec<NotionBlock>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TableRowBody {
    #[serde(default)]
    pub cells: Vec<Vec<RichText>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RichText {
    #[serde(rename = "type", default = "text_kind")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<TextContent>,
    #[serde(default, skip_serializing_if = "is_plain")]
    pub annotations: WireAnnotations,
    /// Present on API responses and some bridge output; used when `text` is absent.
    #[serde(default, skip_serializing)]
    pub plain_text: Option<String>,
}

fn text_kind() -> String {
    "text".to_string()
}

fn is_plain(annotations: &WireAnnotations) -> bool {
    Annotations::from(annotations).is_plain()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextContent {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<FileUrl>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WireAnnotations {
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub underline: bool,
    pub code: bool,
}

impl From<&WireAnnotations> for Annotations {
    fn from(wire: &WireAnnotations) -> Self {
        Self {
            bold: wire.bold,
            italic: wire.italic,
            underline: wire.underline,
            strikethrough: wire.strikethrough,
            code: wire.code,
        }
    }
}

impl From<Annotations> for WireAnnotations {
    fn from(annotations: Annotations) -> Self {
        Self {
            bold: annotations.bold,
            italic: annotations.italic,
            strikethrough: annotations.strikethrough,
            underline: annotations.underline,
            code: annotations.code,
        }
    }
}

impl From<&TextRun> for RichText {
    fn from(run: &TextRun) -> Self {
        Self {
            kind: text_kind(),
            text: Some(TextContent {
                content: run.content.clone(),
                link: run.link.clone().map(|url| FileUrl { url }),
            }),
            annotations: run.annotations.into(),
            plain_text: None,
        }
    }
}

impl RichText {
    /// The run this item stands for; `None` when it carries no text.
    fn into_run(self) -> Option<TextRun> {
        let annotations = Annotations::from(&self.annotations);
        let (content, link) = match self.text {
            Some(text) => (text.content, text.link.map(|link| link.url)),
            None => (self.plain_text?, None),
        };
        if content.is_empty() {
            return None;
        }
        Some(TextRun {
            content,
            annotations,
            link,
        })
    }
}

fn rich_text(runs: &[TextRun]) -> RichTextBody {
    RichTextBody {
        rich_text: runs.iter().map(RichText::from).collect(),
    }
}

fn runs(body: RichTextBody) -> Vec<TextRun> {
    body.rich_text.into_iter().filter_map(RichText::into_run).collect()
}

impl From<&Block> for NotionBlock {
    fn from(block: &Block) -> Self {
        let body = match block {
            Block::Heading { level, runs } => match *level {
                1 => BlockBody::Heading1 {
                    heading_1: rich_text(runs),
                },
                2 => BlockBody::Heading2 {
                    heading_2: rich_text(runs),
                },
                _ => BlockBody::Heading3 {
                    heading_3: rich_text(runs),
                },
            },
            Block::Paragraph { runs } => BlockBody::Paragraph {
                paragraph: rich_text(runs),
            },
            Block::BulletItem { runs } => BlockBody::BulletedListItem {
                bulleted_list_item: rich_text(runs),
            },
            Block::NumberedItem { runs } => BlockBody::NumberedListItem {
                numbered_list_item: rich_text(runs),
            },
            Block::Quote { runs } => BlockBody::Quote {
                quote: rich_text(runs),
            },
            Block::CodeBlock { text, language } => BlockBody::Code {
                code: CodeBody {
                    rich_text: vec![RichText::from(&TextRun::plain(text.as_str()))],
                    language: language.clone(),
                },
            },
            Block::Divider => BlockBody::Divider {
                divider: EmptyBody {},
            },
            Block::Image { url } => BlockBody::Image {
                image: ImageBody {
                    kind: external_kind(),
                    external: Some(FileUrl { url: url.clone() }),
                    file: None,
                },
            },
            Block::Table {
                width,
                has_header,
                rows,
            } => BlockBody::Table {
                table: TableBody {
                    table_width: *width,
                    has_column_header: *has_header,
                    has_row_header: false,
                    children: rows.iter().map(table_row).collect(),
                },
            },
        };
        NotionBlock {
            object: block_object(),
            body,
        }
    }
}

fn table_row(row: &TableRow) -> NotionBlock {
    NotionBlock {
        object: block_object(),
        body: BlockBody::TableRow {
            table_row: TableRowBody {
                cells: row
                    .cells
                    .iter()
                    .map(|cell| cell.iter().map(RichText::from).collect())
                    .collect(),
            },
        },
    }
}

impl TryFrom<NotionBlock> for Block {
    type Error = ConvertError;

    fn try_from(block: NotionBlock) -> Result<Self> {
        let block = match block.body {
            BlockBody::Heading1 { heading_1 } => Block::Heading {
                level: 1,
                runs: runs(heading_1),
            },
            BlockBody::Heading2 { heading_2 } => Block::Heading {
                level: 2,
                runs: runs(heading_2),
            },
            BlockBody::Heading3 { heading_3 } => Block::Heading {
                level: 3,
                runs: runs(heading_3),
            },
            BlockBody::Paragraph { paragraph } => Block::Paragraph {
                runs: runs(paragraph),
            },
            BlockBody::BulletedListItem { bulleted_list_item } => Block::BulletItem {
                runs: runs(bulleted_list_item),
            },
            BlockBody::NumberedListItem { numbered_list_item } => Block::NumberedItem {
                runs: runs(numbered_list_item),
            },
            BlockBody::Quote { quote } => Block::Quote { runs: runs(quote) },
            BlockBody::Code { code } => Block::CodeBlock {
                text: code
                    .rich_text
                    .into_iter()
                    .filter_map(RichText::into_run)
                    .map(|run| run.content)
                    .collect(),
                language: code.language,
            },
            BlockBody::Divider { .. } => Block::Divider,
            BlockBody::Image { image } => {
                let url = image
                    .external
                    .or(image.file)
                    .map(|file| file.url)
                    .ok_or_else(|| ConvertError::InvalidBlock("image without a URL".to_string()))?;
                Block::Image { url }
            }
            BlockBody::Table { table } => {
                if table.table_width == 0 {
                    return Err(ConvertError::InvalidBlock("table with zero width".to_string()));
                }
                let cells = table
                    .children
                    .into_iter()
                    .map(|child| match child.body {
                        BlockBody::TableRow { table_row } => Ok(table_row
                            .cells
                            .into_iter()
                            .map(|cell| cell.into_iter().filter_map(RichText::into_run).collect())
                            .collect()),
                        _ => Err(ConvertError::InvalidBlock(
                            "table child is not a table_row".to_string(),
                        )),
                    })
                    .collect::<Result<Vec<Vec<Vec<TextRun>>>>>()?;
                Block::Table {
                    width: table.table_width,
                    has_header: table.has_column_header,
                    rows: normalize_rows(cells, table.table_width),
                }
            }
            BlockBody::TableRow { .. } => {
                return Err(ConvertError::UnsupportedBlock("table_row outside a table".to_string()));
            }
        };
        Ok(block)
    }
}

/// Serialize blocks as a Notion `children` array.
pub fn to_notion_json(blocks: &[Block]) -> serde_json::Value {
    let wire: Vec<NotionBlock> = blocks.iter().map(NotionBlock::from).collect();
    serde_json::to_value(wire).unwrap_or_else(|_| serde_json::Value::Array(Vec::new()))
}

/// Parse a Notion `children` array back into blocks.
pub fn from_notion_json(json: &str) -> Result<Vec<Block>> {
    let wire: Vec<NotionBlock> = serde_json::from_str(json)?;
    wire.into_iter().map(Block::try_from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn paragraph_shape() {
        let blocks = vec![Block::Paragraph {
            runs: vec![
                TextRun::plain("Visit "),
                TextRun::linked("Docs", "https://docs.example.com"),
            ],
        }];
        assert_eq!(
            to_notion_json(&blocks),
            json!([{
                "object": "block",
                "type": "paragraph",
                "paragraph": {
                    "rich_text": [
                        {"type": "text", "text": {"content": "Visit "}},
                        {"type": "text", "text": {"content": "Docs", "link": {"url": "https://docs.example.com"}}}
                    ]
                }
            }])
        );
    }

    #[test]
    fn annotations_only_when_set() {
        let bold = Annotations {
            bold: true,
            ..Annotations::default()
        };
        let blocks = vec![Block::Heading {
            level: 2,
            runs: vec![TextRun::plain("b").with_annotations(bold)],
        }];
        let value = to_notion_json(&blocks);
        assert_eq!(value[0]["type"], "heading_2");
        assert_eq!(value[0]["heading_2"]["rich_text"][0]["annotations"]["bold"], true);
    }

    #[test]
    fn table_shape() {
        let blocks = vec![Block::Table {
            width: 1,
            has_header: true,
            rows: vec![TableRow {
                cells: vec![vec![TextRun::plain("A")]],
            }],
        }];
        assert_eq!(
            to_notion_json(&blocks),
            json!([{
                "object": "block",
                "type": "table",
                "table": {
                    "table_width": 1,
                    "has_column_header": true,
                    "has_row_header": false,
                    "children": [{
                        "object": "block",
                        "type": "table_row",
                        "table_row": {"cells": [[{"type": "text", "text": {"content": "A"}}]]}
                    }]
                }
            }])
        );
    }

    #[test]
    fn code_image_divider_shapes() {
        let blocks = vec![
            Block::CodeBlock {
                text: "x".to_string(),
                language: "rust".to_string(),
            },
            Block::Image {
                url: "https://x.com/a.png".to_string(),
            },
            Block::Divider,
        ];
        let value = to_notion_json(&blocks);
        assert_eq!(value[0]["code"]["language"], "rust");
        assert_eq!(value[0]["code"]["rich_text"][0]["text"]["content"], "x");
        assert_eq!(value[1]["image"], json!({"type": "external", "external": {"url": "https://x.com/a.png"}}));
        assert_eq!(value[2]["divider"], json!({}));
    }

    #[test]
    fn parses_bridge_output() {
        let json = r#"[
            {"object": "block", "type": "heading_1", "heading_1": {"rich_text": [
                {"type": "text", "text": {"content": "Title"}, "annotations": {"bold": false, "color": "default"}}
            ]}},
            {"type": "bulleted_list_item", "bulleted_list_item": {"rich_text": [
                {"type": "text", "text": {"content": ""}},
                {"type": "text", "text": {"content": "x", "link": {"url": "https://x.com"}}, "annotations": {"italic": true}}
            ]}},
            {"type": "table", "table": {"table_width": 2, "has_column_header": false, "children": [
                {"type": "table_row", "table_row": {"cells": [[{"type": "text", "text": {"content": "a"}}]]}}
            ]}}
        ]"#;
        let blocks = from_notion_json(json).unwrap();
        assert_eq!(
            blocks[0],
            Block::Heading {
                level: 1,
                runs: vec![TextRun::plain("Title")],
            }
        );
        assert_eq!(
            blocks[1],
            Block::BulletItem {
                runs: vec![TextRun::linked("x", "https://x.com").with_annotations(Annotations {
                    italic: true,
                    ..Annotations::default()
                })],
            }
        );
        let Block::Table { rows, .. } = &blocks[2] else {
            panic!("expected a table");
        };
        assert_eq!(rows[0].cells.len(), 2);
    }

    #[test]
    fn rejects_unknown_block_types() {
        assert!(from_notion_json(r#"[{"type": "to_do", "to_do": {}}]"#).is_err());
        assert!(from_notion_json(r#"{"type": "paragraph"}"#).is_err());
        assert!(matches!(
            from_notion_json(r#"[{"type": "table_row", "table_row": {"cells": []}}]"#),
            Err(ConvertError::UnsupportedBlock(_))
        ));
    }
}
