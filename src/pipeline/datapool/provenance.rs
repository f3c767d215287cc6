//! Provenance index construction and lookups.
//!
//! Ids are either block ids (`A:3.1`), table ids (`T2`) or table row
//! references (`T2:row4`, 0-based). Row references are not keys of the
//! index: they resolve to their table's location only when the row exists.

use super::types::{DataPool, Provenance, SourceLocation};
use crate::pipeline::extraction::{ExtractedTable, TextBlock};

pub const SNIPPET_CHARS: usize = 100;

pub fn snippet(text: &str) -> String {
    text.chars().take(SNIPPET_CHARS).collect()
}

pub(crate) fn record_blocks(provenance: &mut Provenance, blocks: &[TextBlock]) {
    for block in blocks {
        provenance.insert(
            block.block_id.clone(),
            SourceLocation {
                doc_id: block.doc_id.clone(),
                page: block.page,
                snippet: snippet(&block.text),
            },
        );
    }
}

pub(crate) fn record_tables(provenance: &mut Provenance, tables: &[ExtractedTable]) {
    for table in tables {
        let title = table.title.clone().unwrap_or_else(|| table.headers.join(" | "));
        provenance.insert(
            table.table_id.clone(),
            SourceLocation {
                doc_id: table.doc_id.clone(),
                page: table.page,
                snippet: snippet(&format!("Table: {title}")),
            },
        );
    }
}

/// `T2:row4` → `("T2", Some(4))`; anything else → `(id, None)`.
fn split_row_ref(id: &str) -> (&str, Option<usize>) {
    match id.split_once(':') {
        Some((table, row)) if table.starts_with('T') => {
            match row.strip_prefix("row").and_then(|n| n.parse().ok()) {
                Some(index) => (table, Some(index)),
                None => (id, None),
            }
        }
        _ => (id, None),
    }
}

/// Location of a block, table or table row reference.
pub fn find_source<'a>(pool: &'a DataPool, id: &str) -> Option<&'a SourceLocation> {
    if let Some(location) = pool.provenance.get(id) {
        return Some(location);
    }
    match split_row_ref(id) {
        (table, Some(row)) if has_row(pool, table, row) => pool.provenance.get(table),
        _ => None,
    }
}

fn has_row(pool: &DataPool, table_id: &str, row: usize) -> bool {
    pool.table(table_id).is_some_and(|table| row < table.rows.len())
}

/// Whether `id` resolves through the provenance index.
pub fn is_resolvable(pool: &DataPool, id: &str) -> bool {
    find_source(pool, id).is_some()
}

/// Readable evidence for a reference: the block text (first `max_chars`
/// characters), a table row as `header: value` pairs, or the table headers.
pub fn source_context(pool: &DataPool, id: &str, max_chars: usize) -> Option<String> {
    if let Some(block) = pool.block(id) {
        return Some(block.text.chars().take(max_chars).collect());
    }

    let (table_id, row) = split_row_ref(id);
    let table = pool.table(table_id)?;
    match row {
        Some(i) => table.rows.get(i).map(|cells| render_row(&table.headers, cells)),
        None => Some(format!("Table: {}", table.headers.join(" | "))),
    }
}

fn render_row(headers: &[String], cells: &[String]) -> String {
    cells
        .iter()
        .enumerate()
        .filter(|(_, cell)| !cell.trim().is_empty())
        .map(|(i, cell)| match headers.get(i).filter(|h| !h.trim().is_empty()) {
            Some(header) => format!("{}: {}", header.trim(), cell.trim()),
            None => cell.trim().to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> DataPool {
        let mut pool = DataPool::default();
        pool.text_blocks = vec![TextBlock::new("A", Some(1), 0, "İhale konusu: yemek hizmeti alımı")];
        pool.tables = vec![ExtractedTable {
            table_id: "T1".into(),
            doc_id: "B".into(),
            headers: vec!["Yemek".into(), "Gramaj".into()],
            rows: vec![vec!["Pilav".into(), "80".into()], vec!["Çorba".into(), "".into()]],
            title: Some("Menü".into()),
            page: None,
        }];
        record_blocks(&mut pool.provenance, &pool.text_blocks.clone());
        record_tables(&mut pool.provenance, &pool.tables.clone());
        pool
    }

    #[test]
    fn snippet_is_char_bounded() {
        let long = "ş".repeat(150);
        assert_eq!(snippet(&long).chars().count(), 100);
    }

    #[test]
    fn blocks_and_tables_are_indexed() {
        let pool = pool();
        let block = pool.provenance.get("A:1.0").unwrap();
        assert_eq!(block.page, Some(1));
        assert_eq!(block.snippet, "İhale konusu: yemek hizmeti alımı");
        assert_eq!(pool.provenance.get("T1").unwrap().snippet, "Table: Menü");
    }

    #[test]
    fn row_refs_resolve_to_table() {
        let pool = pool();
        assert_eq!(find_source(&pool, "T1:row1").unwrap().doc_id, "B");
        assert!(find_source(&pool, "T9:row1").is_none());
        assert!(find_source(&pool, "A:9.9").is_none());
        assert!(is_resolvable(&pool, "A:1.0"));
    }

    #[test]
    fn row_refs_past_the_table_do_not_resolve() {
        let pool = pool();
        assert!(is_resolvable(&pool, "T1:row0"));
        assert!(!is_resolvable(&pool, "T1:row2"));
        assert!(!is_resolvable(&pool, "T1:row999"));
        assert!(source_context(&pool, "T1:row999", 200).is_none());
    }

    #[test]
    fn context_for_rows_and_blocks() {
        let pool = pool();
        assert_eq!(source_context(&pool, "T1:row0", 200).unwrap(), "Yemek: Pilav, Gramaj: 80");
        assert_eq!(source_context(&pool, "T1:row1", 200).unwrap(), "Yemek: Çorba");
        assert_eq!(source_context(&pool, "T1", 200).unwrap(), "Table: Yemek | Gramaj");
        assert_eq!(source_context(&pool, "A:1.0", 5).unwrap(), "İhale");
        assert!(source_context(&pool, "Z:0.0", 50).is_none());
    }
}
