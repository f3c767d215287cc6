use super::types::DataPool;
use crate::pipeline::extraction::{turkish_lowercase, DocumentType};
use crate::pipeline::patterns::{AmountKind, DateKind, EntityKind};

const MENU_HEADER_KEYWORDS: &[&str] = &["yemek", "menü", "öğün"];

/// Soft data-quality checklist. Never fails; each missing item is one
/// Turkish warning string.
pub fn quality_warnings(pool: &DataPool) -> Vec<String> {
    let mut warnings = Vec::new();

    if !pool.dates.iter().any(|d| d.kind == DateKind::IhaleTarihi) {
        warnings.push("İhale tarihi bulunamadı".to_string());
    }
    if !pool.entities.iter().any(|e| e.kind == EntityKind::Kurum) {
        warnings.push("Kurum bilgisi bulunamadı".to_string());
    }
    if !pool.amounts.iter().any(|a| a.kind == AmountKind::TahminiBedel) {
        warnings.push("Tahmini bedel bilgisi bulunamadı".to_string());
    }
    if !pool.entities.iter().any(|e| e.kind == EntityKind::Ikn) {
        warnings.push("İhale Kayıt Numarası (İKN) bulunamadı".to_string());
    }
    if !pool
        .documents
        .iter()
        .any(|d| matches!(d.type_guess, DocumentType::Idari | DocumentType::Teknik))
    {
        warnings.push("İdari veya teknik şartname tespit edilemedi".to_string());
    }

    let has_menu_table = pool.tables.iter().any(|table| {
        let headers = turkish_lowercase(&table.headers.join(" "));
        MENU_HEADER_KEYWORDS.iter().any(|k| headers.contains(k))
    });
    if !pool.tables.is_empty() && !has_menu_table {
        warnings.push("Menü tablosu tespit edilemedi".to_string());
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extraction::ExtractedTable;

    #[test]
    fn empty_pool_misses_everything_but_menu() {
        let warnings = quality_warnings(&DataPool::default());
        assert_eq!(
            warnings,
            vec![
                "İhale tarihi bulunamadı",
                "Kurum bilgisi bulunamadı",
                "Tahmini bedel bilgisi bulunamadı",
                "İhale Kayıt Numarası (İKN) bulunamadı",
                "İdari veya teknik şartname tespit edilemedi",
            ]
        );
    }

    #[test]
    fn non_menu_tables_flagged() {
        let mut pool = DataPool::default();
        pool.tables.push(
            ExtractedTable::from_grid("A", 0, vec![vec!["Personel".into(), "Adet".into()]]).unwrap(),
        );
        assert!(quality_warnings(&pool).contains(&"Menü tablosu tespit edilemedi".to_string()));

        pool.tables.push(
            ExtractedTable::from_grid("A", 1, vec![vec!["YEMEK ADI".into(), "Gramaj".into()]]).unwrap(),
        );
        assert!(!quality_warnings(&pool).contains(&"Menü tablosu tespit edilemedi".to_string()));
    }
}
