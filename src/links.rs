//! Link preservation across lossy conversions.
//!
//! Before a backend sees the Markdown, every `[text](url)` link and every bare
//! URL is swapped for an inert placeholder token and recorded in a [`LinkTable`].
//! After the backend has produced blocks, tokens found in any text run are
//! turned back into linked runs. Tokens are ASCII alphanumeric only, so neither
//! the Markdown parser nor the HTML round-trip can split or decorate them.
//!
//! Code is never masked. Tokens that still end up in a code block (raw `<pre>`
//! HTML, bridge output) are put back as the Markdown they replaced.

use std::ops::Range;
use std::sync::LazyLock;

use pulldown_cmark::{Event, Parser, Tag};
use regex::{Captures, Regex};

use crate::block::{Block, TextRun};
use crate::classifier::parser_options;

static MARKDOWN_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").expect("BUG: hardcoded markdown link regex is valid")
});

static BARE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https?://[^\s)"'\]\}<>]+"#).expect("BUG: hardcoded bare URL regex is valid")
});

static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[LINKPLACEHOLDER(\d+)END\]|LINKPLACEHOLDER(\d+)END|URLPLACEHOLDER(\d+)END")
        .expect("BUG: hardcoded placeholder regex is valid")
});

/// Punctuation that ends a sentence rather than a URL.
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?'];

/// What a placeholder stood for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// `[text](url)` syntax; the token was written bracket-wrapped.
    Markdown,
    /// A bare URL; display text equals the target.
    Bare,
}

/// One substituted link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkPlaceholder {
    pub token: String,
    pub display_text: String,
    pub target: String,
    pub kind: LinkKind,
    /// The Markdown the token replaced.
    pub source: String,
}

/// Placeholders recorded during one conversion, indexed by their number.
#[derive(Debug, Clone, Default)]
pub struct LinkTable {
    entries: Vec<LinkPlaceholder>,
}

impl LinkTable {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LinkPlaceholder> {
        self.entries.iter()
    }

    fn push(&mut self, kind: LinkKind, display_text: String, target: String, source: &str) -> String {
        let index = self.entries.len();
        let token = match kind {
            LinkKind::Markdown => format!("LINKPLACEHOLDER{index}END"),
            LinkKind::Bare => format!("URLPLACEHOLDER{index}END"),
        };
        self.entries.push(LinkPlaceholder {
            token: token.clone(),
            display_text,
            target,
            kind,
            source: source.to_string(),
        });
        token
    }

    /// Leftmost known token in `text`, with the byte range it covers.
    ///
    /// Markdown-link tokens swallow their surrounding brackets. Token-shaped
    /// text that is not in this table is skipped.
    fn find(&self, text: &str) -> Option<(Range<usize>, &LinkPlaceholder)> {
        TOKEN.captures_iter(text).find_map(|caps| {
            let (group, kind) = if caps.get(1).is_some() {
                (1, LinkKind::Markdown)
            } else if caps.get(2).is_some() {
                (2, LinkKind::Markdown)
            } else {
                (3, LinkKind::Bare)
            };
            let index: usize = caps.get(group)?.as_str().parse().ok()?;
            let entry = self.entries.get(index).filter(|entry| entry.kind == kind)?;
            let whole = caps.get(0)?;
            Some((whole.range(), entry))
        })
    }
}

/// Swap links and bare URLs for placeholder tokens.
///
/// Code (fenced or indented blocks and inline spans) is copied through
/// untouched, as are image sources, autolinks and URLs inside raw HTML
/// attributes.
pub fn preprocess(markdown: &str) -> (String, LinkTable) {
    let mut table = LinkTable::default();
    let segments = split_code(markdown);

    // Markdown links first, across the whole document, so bare URLs never see them
    let linked: Vec<(bool, String)> = segments
        .into_iter()
        .map(|(code, text)| {
            if code {
                (code, text.to_string())
            } else {
                (code, replace_markdown_links(text, &mut table))
            }
        })
        .collect();

    let mut out = String::with_capacity(markdown.len());
    for (code, text) in linked {
        if code {
            out.push_str(&text);
        } else {
            out.push_str(&replace_bare_urls(&text, &mut table));
        }
    }

    (out, table)
}

fn replace_markdown_links(text: &str, table: &mut LinkTable) -> String {
    MARKDOWN_LINK
        .replace_all(text, |caps: &Captures| {
            let whole = &caps[0];
            let start = caps.get(0).map_or(0, |m| m.start());
            // `![alt](src)` is an image, not a link
            if text[..start].ends_with('!') {
                return whole.to_string();
            }
            let target = link_destination(&caps[2]);
            if target.is_empty() {
                return whole.to_string();
            }
            let display = inline_plain_text(&caps[1]);
            let display = if display.is_empty() { target.clone() } else { display };
            format!("[{}]", table.push(LinkKind::Markdown, display, target, whole))
        })
        .into_owned()
}

fn replace_bare_urls(text: &str, table: &mut LinkTable) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for found in BARE_URL.find_iter(text) {
        let before = &text[..found.start()];
        if before.ends_with("](") || before.ends_with('<') || before.ends_with(['"', '\'', '=']) {
            continue;
        }
        let url = found.as_str().trim_end_matches(TRAILING_PUNCTUATION);
        if url.len() <= "https://".len() {
            continue;
        }
        out.push_str(&text[last..found.start()]);
        out.push_str(&table.push(LinkKind::Bare, url.to_string(), url.to_string(), url));
        last = found.start() + url.len();
    }
    out.push_str(&text[last..]);
    out
}

/// The destination of a `(...)` link part, without title or angle brackets.
fn link_destination(inner: &str) -> String {
    let inner = inner.trim();
    if let Some(rest) = inner.strip_prefix('<') {
        return rest.split('>').next().unwrap_or_default().trim().to_string();
    }
    inner.split_whitespace().next().unwrap_or_default().to_string()
}

/// Split into (is_code, text) segments, code being whatever the parser treats
/// as code: fenced and indented blocks and inline spans.
fn split_code(markdown: &str) -> Vec<(bool, &str)> {
    let mut segments = Vec::new();
    let mut last = 0;

    for (event, range) in Parser::new_ext(markdown, parser_options()).into_offset_iter() {
        if !matches!(event, Event::Code(_) | Event::Start(Tag::CodeBlock(_))) || range.start < last {
            continue;
        }
        if range.start > last {
            segments.push((false, &markdown[last..range.start]));
        }
        segments.push((true, &markdown[range.start..range.end]));
        last = range.end;
    }
    if last < markdown.len() {
        segments.push((false, &markdown[last..]));
    }
    segments
}

/// Markdown inline text with its markup stripped, as a link shows it.
fn inline_plain_text(markdown: &str) -> String {
    Parser::new(markdown)
        .filter_map(|event| match event {
            Event::Text(text) | Event::Code(text) => Some(text.into_string()),
            Event::SoftBreak | Event::HardBreak => Some(" ".to_string()),
            _ => None,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Resolve placeholder tokens in every run of every block.
///
/// With an empty table the blocks are returned as they came in.
pub fn postprocess(mut blocks: Vec<Block>, links: &LinkTable) -> Vec<Block> {
    if links.is_empty() {
        return blocks;
    }
    for block in &mut blocks {
        if let Block::CodeBlock { text, .. } = block {
            *text = restore_sources(text, links);
            continue;
        }
        for runs in block.run_lists_mut() {
            *runs = resolve_runs(std::mem::take(runs), links);
        }
    }
    blocks
}

fn resolve_runs(runs: Vec<TextRun>, links: &LinkTable) -> Vec<TextRun> {
    let mut out = Vec::with_capacity(runs.len());
    for run in runs {
        if links.find(&run.content).is_none() {
            out.push(run);
            continue;
        }

        let mut rest = run.content.as_str();
        while let Some((range, entry)) = links.find(rest) {
            let prefix = &rest[..range.start];
            if !prefix.is_empty() {
                out.push(TextRun {
                    content: prefix.to_string(),
                    ..run.clone()
                });
            }
            out.push(TextRun {
                content: entry.display_text.clone(),
                annotations: run.annotations,
                link: Some(entry.target.clone()),
            });
            rest = &rest[range.end..];
        }
        if !rest.is_empty() {
            out.push(TextRun {
                content: rest.to_string(),
                ..run.clone()
            });
        }
    }
    out
}

/// Put back the Markdown each token replaced. Code shows source, not links.
fn restore_sources(text: &str, links: &LinkTable) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some((range, entry)) = links.find(rest) {
        out.push_str(&rest[..range.start]);
        out.push_str(&entry.source);
        rest = &rest[range.end..];
    }
    out.push_str(rest);
    out
}

/// URLs in `markdown` under the same matching rule preprocessing uses.
///
/// Unlike preprocessing this includes link targets and image sources, so the
/// result can be compared against what ended up in the blocks.
pub fn find_urls(markdown: &str) -> Vec<String> {
    split_code(markdown)
        .into_iter()
        .filter(|(code, _)| !code)
        .flat_map(|(_, text)| BARE_URL.find_iter(text))
        .map(|found| found.as_str().trim_end_matches(TRAILING_PUNCTUATION).to_string())
        .filter(|url| url.len() > "https://".len())
        .collect()
}

/// Link unlinked URLs sitting in table cells.
///
/// Bridge output sometimes leaves cell URLs as plain text; the first URL in
/// such a run becomes its link.
pub fn link_bare_urls_in_tables(blocks: &mut [Block]) {
    for block in blocks.iter_mut() {
        if !matches!(block, Block::Table { .. }) {
            continue;
        }
        for runs in block.run_lists_mut() {
            for run in runs.iter_mut().filter(|run| run.link.is_none()) {
                if let Some(found) = BARE_URL.find(&run.content) {
                    let url = found.as_str().trim_end_matches(TRAILING_PUNCTUATION);
                    run.link = Some(url.to_string());
                }
            }
        }
    }
}
