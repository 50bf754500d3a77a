/// Formatting flags carried by a text run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Annotations {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    pub code: bool,
}

impl Annotations {
    pub fn is_plain(&self) -> bool {
        *self == Self::default()
    }
}

/// A contiguous span of text sharing one formatting state and at most one link
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextRun {
    pub content: String,
    pub annotations: Annotations,
    pub link: Option<String>,
}

impl TextRun {
    pub fn plain(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn linked(content: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            link: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn with_annotations(mut self, annotations: Annotations) -> Self {
        self.annotations = annotations;
        self
    }
}

/// One row of a table; always exactly `width` cells long
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableRow {
    pub cells: Vec<Vec<TextRun>>,
}

/// Block-level elements produced from Markdown
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading {
        level: u8,
        runs: Vec<TextRun>,
    },
    Paragraph {
        runs: Vec<TextRun>,
    },
    BulletItem {
        runs: Vec<TextRun>,
    },
    NumberedItem {
        runs: Vec<TextRun>,
    },
    Quote {
        runs: Vec<TextRun>,
    },
    CodeBlock {
        text: String,
        language: String,
    },
    Divider,
    Image {
        url: String,
    },
    Table {
        width: usize,
        has_header: bool,
        rows: Vec<TableRow>,
    },
}

impl Block {
    /// Rich text of the block, if it carries any directly.
    pub fn runs(&self) -> Option<&[TextRun]> {
        match self {
            Block::Heading { runs, .. }
            | Block::Paragraph { runs }
            | Block::BulletItem { runs }
            | Block::NumberedItem { runs }
            | Block::Quote { runs } => Some(runs),
            _ => None,
        }
    }

    /// Mutable access to every rich-text sequence in the block, table cells included.
    pub fn run_lists_mut(&mut self) -> Vec<&mut Vec<TextRun>> {
        match self {
            Block::Heading { runs, .. }
            | Block::Paragraph { runs }
            | Block::BulletItem { runs }
            | Block::NumberedItem { runs }
            | Block::Quote { runs } => vec![runs],
            Block::Table { rows, .. } => rows.iter_mut().flat_map(|row| row.cells.iter_mut()).collect(),
            Block::CodeBlock { .. } | Block::Divider | Block::Image { .. } => Vec::new(),
        }
    }

    /// Every URL the block points at: run links, cell links and image sources.
    pub fn urls(&self) -> Vec<&str> {
        match self {
            Block::Image { url } => vec![url.as_str()],
            Block::Table { rows, .. } => rows
                .iter()
                .flat_map(|row| row.cells.iter().flatten())
                .filter_map(|run| run.link.as_deref())
                .collect(),
            _ => self
                .runs()
                .unwrap_or_default()
                .iter()
                .filter_map(|run| run.link.as_deref())
                .collect(),
        }
    }

    /// Concatenated plain text of the block.
    pub fn plain_text(&self) -> String {
        match self {
            Block::CodeBlock { text, .. } => text.clone(),
            Block::Image { url } => url.clone(),
            Block::Divider => String::new(),
            Block::Table { rows, .. } => rows
                .iter()
                .map(|row| {
                    row.cells
                        .iter()
                        .map(|cell| cell.iter().map(|run| run.content.as_str()).collect::<String>())
                        .collect::<Vec<_>>()
                        .join(" | ")
                })
                .collect::<Vec<_>>()
                .join("\n"),
            _ => self
                .runs()
                .unwrap_or_default()
                .iter()
                .map(|run| run.content.as_str())
                .collect(),
        }
    }
}
