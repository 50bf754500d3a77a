use std::sync::LazyLock;

use scraper::{ElementRef, Selector};
use tracing::{debug, warn};

use crate::block::{Block, TableRow, TextRun};
use crate::error::{ConvertError, Result};
use crate::inline::{flattened_text, runs_for};

static TR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr").expect("BUG: hardcoded selector 'tr' is valid"));

/// Blocks for a `<table>` element.
///
/// Normally a single Table block, nothing for an empty table, and two
/// paragraphs (diagnostic plus flattened text) when the table cannot be built.
pub fn table_blocks(table: ElementRef, max_columns: usize) -> Vec<Block> {
    match build_table(table, max_columns) {
        Ok(Some(block)) => vec![block],
        Ok(None) => Vec::new(),
        Err(e) => {
            warn!("Error processing table: {}", e);
            let mut blocks = vec![Block::Paragraph {
                runs: vec![TextRun::plain(format!("[Table could not be processed: {}]", e))],
            }];
            let text = flattened_text(table);
            let text = text.trim();
            if !text.is_empty() {
                blocks.push(Block::Paragraph {
                    runs: vec![TextRun::plain(text)],
                });
            }
            blocks
        }
    }
}

fn build_table(table: ElementRef, max_columns: usize) -> Result<Option<Block>> {
    let rows: Vec<ElementRef> = table.select(&TR_SELECTOR).collect();
    let Some(first) = rows.first() else {
        return Ok(None);
    };

    let width = cells_of(*first).count();
    if width == 0 {
        return Ok(None);
    }
    if width > max_columns {
        return Err(ConvertError::Table(format!(
            "table has {} columns, the limit is {}",
            width, max_columns
        )));
    }

    let has_header = cells_of(*first).any(|cell| cell.value().name() == "th");
    let cells = rows
        .iter()
        .map(|row| cells_of(*row).map(runs_for).collect())
        .collect();
    let rows = normalize_rows(cells, width);
    debug!(width, rows = rows.len(), has_header, "Built table");

    Ok(Some(Block::Table {
        width,
        has_header,
        rows,
    }))
}

fn cells_of<'a>(row: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|cell| matches!(cell.value().name(), "td" | "th"))
}

/// Force every row to exactly `width` cells.
///
/// Short rows get one empty run per missing cell; surplus cells are dropped.
pub fn normalize_rows(rows: Vec<Vec<Vec<TextRun>>>, width: usize) -> Vec<TableRow> {
    rows.into_iter()
        .map(|mut cells| {
            cells.truncate(width);
            while cells.len() < width {
                cells.push(vec![TextRun::plain("")]);
            }
            TableRow { cells }
        })
        .collect()
}
