use crate::block::Block;

/// Most children the Notion API accepts in one create/append request.
pub const NOTION_MAX_CHILDREN: usize = 100;

/// Page title for a Markdown document.
///
/// The first `#` heading wins, then the first non-empty line, then "Untitled".
pub fn extract_title(markdown: &str) -> String {
    let heading = markdown
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with('#'))
        .map(|line| line.trim_start_matches('#').trim());
    if let Some(title) = heading {
        return title.to_string();
    }

    markdown
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("Untitled")
        .to_string()
}

/// Split blocks into request-sized batches, in order.
pub fn batch_blocks(blocks: &[Block], size: usize) -> Vec<&[Block]> {
    blocks.chunks(size.max(1)).collect()
}
