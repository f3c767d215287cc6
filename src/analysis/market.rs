use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use chrono::{Datelike, Local, NaiveDate};
use regex::Regex;

use super::types::{
    BudgetComparison, BudgetRisk, CostBreakdown, CostItem, ExtractedFields, FoodCategory, Forecast,
    ItemPrices, MarketAnalysis, MenuItem, PriceData, PriceSources, Trend,
};
use super::AnalysisError;
use crate::pipeline::datapool::DataPool;
use crate::pipeline::extraction::{turkish_lowercase, ExtractedTable};
use crate::pipeline::patterns::parse_turkish_number;

/// Reference prices in TRY per kg (eggs per piece).
const REFERENCE_PRICES: &[(&str, f64)] = &[
    ("tavuk", 95.0),
    ("kırmızı et", 450.0),
    ("dana eti", 480.0),
    ("kuzu eti", 520.0),
    ("balık", 180.0),
    ("pirinç", 45.0),
    ("bulgur", 28.0),
    ("makarna", 25.0),
    ("mercimek", 38.0),
    ("nohut", 42.0),
    ("fasulye", 48.0),
    ("domates", 25.0),
    ("salatalık", 20.0),
    ("biber", 35.0),
    ("patlıcan", 30.0),
    ("soğan", 15.0),
    ("patates", 12.0),
    ("havuç", 18.0),
    ("zeytinyağı", 240.0),
    ("ayçiçek yağı", 85.0),
    ("tereyağı", 350.0),
    ("beyaz peynir", 120.0),
    ("kaşar peyniri", 180.0),
    ("yumurta", 3.5),
    ("süt", 28.0),
    ("yoğurt", 32.0),
    ("ekmek", 10.0),
    ("un", 22.0),
    ("şeker", 28.0),
    ("tuz", 8.0),
    ("salça", 65.0),
];

const REFERENCE_CONFIDENCE: f32 = 0.8;
/// Used when no price source knows the product.
const FALLBACK_PRICE: f64 = 50.0;
const FALLBACK_CONFIDENCE: f32 = 0.5;
const LOW_CONFIDENCE: f32 = 0.6;
const HIGH_COST_ITEM: f64 = 1_000_000.0;

const DEFAULT_HEADCOUNT: u32 = 1000;
const DEFAULT_MEALS_PER_DAY: u32 = 3;
const DEFAULT_DAYS: u32 = 365;

const LABOR_SHARE: f64 = 0.35;
const OPERATIONAL_SHARE: f64 = 0.20;
const OVERHEAD_SHARE: f64 = 0.15;
const PROFIT_SHARE: f64 = 0.10;

const MONTHLY_INFLATION: f64 = 0.03;
const SEASONAL_FACTOR: f64 = 1.05;
const FORECAST_CONFIDENCE: f32 = 0.7;

const MENU_HEADER_KEYWORDS: &[&str] = &["yemek", "menü", "öğün", "malzeme", "gramaj"];
const NAME_COLUMN_KEYWORDS: &[&str] = &["yemek", "ürün", "malzeme"];
const PORTION_COLUMN_KEYWORDS: &[&str] = &["miktar", "porsiyon", "gramaj"];
const UNIT_COLUMN_KEYWORDS: &[&str] = &["birim"];

/// Spelling variants mapped to the reference product name. Exact match.
const NAME_VARIANTS: &[(&str, &str)] = &[
    ("tavuk eti", "tavuk"),
    ("tavuk but", "tavuk"),
    ("tavuk göğsü", "tavuk"),
    ("dana kıyma", "dana eti"),
    ("kıyma", "kırmızı et"),
    ("kuzu kuşbaşı", "kuzu eti"),
    ("zeytinyağ", "zeytinyağı"),
    ("ayçiçek yağ", "ayçiçek yağı"),
    ("beyaz un", "un"),
];

const CATEGORY_KEYWORDS: &[(FoodCategory, &[&str])] = &[
    (FoodCategory::EtGrubu, &["tavuk", "kırmızı et", "dana", "kuzu", "balık"]),
    (FoodCategory::TahilGrubu, &["pirinç", "bulgur", "makarna", "un", "ekmek"]),
    (FoodCategory::Baklagil, &["mercimek", "nohut", "fasulye"]),
    (
        FoodCategory::Sebze,
        &["domates", "salatalık", "biber", "patlıcan", "soğan", "patates", "havuç"],
    ),
    (FoodCategory::YagGrubu, &["zeytinyağı", "ayçiçek yağı", "tereyağı"]),
    (FoodCategory::SutGrubu, &["süt", "yoğurt", "beyaz peynir", "kaşar"]),
    (FoodCategory::Diger, &["yumurta", "şeker", "tuz", "salça"]),
];

static LEADING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d{3})*(?:,\d+)?|\d+(?:\.\d+)?").unwrap());

/// Per vocabulary word: the whole-word mention, and the same mention with a
/// `<number> <unit>` right before it.
static FOOD_MENTIONS: LazyLock<Vec<(&'static str, Regex, Regex)>> = LazyLock::new(|| {
    REFERENCE_PRICES
        .iter()
        .map(|(food, _)| {
            let word = format!(r"\b{}\b", regex::escape(food));
            let quantity = format!(r"(\d+(?:[.,]\d+)?)\s*(kg|gr|g|lt|adet)?\s*{word}");
            (*food, Regex::new(&word).unwrap(), Regex::new(&quantity).unwrap())
        })
        .collect()
});

/// A price for one product from one provider.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceQuote {
    pub unit_price: f64,
    pub currency: String,
    pub confidence: f32,
}

/// Pluggable price provider. Returns `Ok(None)` for unknown products.
pub trait PriceSource: Send + Sync {
    fn name(&self) -> &str;

    fn lookup(&self, product: &str) -> Result<Option<PriceQuote>, AnalysisError>;
}

/// Fixed in-process price list.
pub struct StaticPriceTable {
    entries: Vec<(String, f64)>,
    confidence: f32,
}

impl StaticPriceTable {
    pub fn new(entries: Vec<(String, f64)>) -> Self {
        Self {
            entries,
            confidence: REFERENCE_CONFIDENCE,
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }
}

impl Default for StaticPriceTable {
    fn default() -> Self {
        Self::new(
            REFERENCE_PRICES
                .iter()
                .map(|(name, price)| (name.to_string(), *price))
                .collect(),
        )
    }
}

impl PriceSource for StaticPriceTable {
    fn name(&self) -> &str {
        "internal_db"
    }

    /// Longest entry contained in the product name, so "kaşar peyniri"
    /// is not priced as some shorter key it happens to contain.
    fn lookup(&self, product: &str) -> Result<Option<PriceQuote>, AnalysisError> {
        let product = turkish_lowercase(product);
        Ok(self
            .entries
            .iter()
            .filter(|(key, _)| product.contains(key.as_str()))
            .max_by_key(|(key, _)| key.chars().count())
            .map(|(_, price)| PriceQuote {
                unit_price: *price,
                currency: "TRY".into(),
                confidence: self.confidence,
            }))
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}

pub fn normalize_product_name(name: &str) -> String {
    let lower = turkish_lowercase(name.trim());
    NAME_VARIANTS
        .iter()
        .find(|(variant, _)| *variant == lower)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(lower)
}

pub fn categorize_product(normalized: &str) -> FoodCategory {
    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| contains_any(normalized, keywords))
        .map(|(category, _)| *category)
        .unwrap_or(FoodCategory::Diger)
}

pub fn is_menu_table(table: &ExtractedTable) -> bool {
    let headers = turkish_lowercase(&table.headers.join(" "));
    contains_any(&headers, MENU_HEADER_KEYWORDS)
}

fn find_column(headers: &[String], keywords: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| contains_any(&turkish_lowercase(h), keywords))
}

fn leading_number(cell: &str) -> Option<f64> {
    LEADING_NUMBER
        .find(cell)
        .and_then(|m| parse_turkish_number(m.as_str()))
}

/// Menu rows of one table. Without a recognisable name column the first
/// column is used.
pub fn parse_menu_table(table: &ExtractedTable) -> Vec<MenuItem> {
    let name_col = find_column(&table.headers, NAME_COLUMN_KEYWORDS).unwrap_or(0);
    let portion_col = find_column(&table.headers, PORTION_COLUMN_KEYWORDS);
    let unit_col = find_column(&table.headers, UNIT_COLUMN_KEYWORDS);

    table
        .rows
        .iter()
        .enumerate()
        .filter_map(|(i, row)| {
            let name = row.get(name_col).map(|c| c.trim()).filter(|c| !c.is_empty())?;
            let cell = |col: Option<usize>| col.and_then(|c| row.get(c)).map(|c| c.trim());
            Some(MenuItem {
                name: name.to_string(),
                portion: cell(portion_col).and_then(leading_number),
                unit: cell(unit_col).filter(|u| !u.is_empty()).map(str::to_string),
                source_ref: Some(format!("{}:row{}", table.table_id, i)),
            })
        })
        .collect()
}

/// Vocabulary scan over the text blocks, one item per food name.
fn menu_from_text(pool: &DataPool) -> Vec<MenuItem> {
    let mut seen = HashSet::new();
    let mut items = Vec::new();

    for block in &pool.text_blocks {
        let lower = turkish_lowercase(&block.text);
        for (food, word, quantity) in FOOD_MENTIONS.iter() {
            if !word.is_match(&lower) || !seen.insert(*food) {
                continue;
            }
            let caps = quantity.captures(&lower);
            items.push(MenuItem {
                name: food.to_string(),
                portion: caps
                    .as_ref()
                    .and_then(|c| c.get(1))
                    .and_then(|m| parse_turkish_number(m.as_str())),
                unit: Some(
                    caps.as_ref()
                        .and_then(|c| c.get(2))
                        .map(|m| m.as_str().to_string())
                        .unwrap_or_else(|| "kg".into()),
                ),
                source_ref: Some(block.block_id.clone()),
            });
        }
    }

    items
}

/// Menu items from menu-looking tables, else from a vocabulary scan of
/// the text.
pub fn extract_menu_items(pool: &DataPool) -> Vec<MenuItem> {
    let from_tables: Vec<MenuItem> = pool
        .tables
        .iter()
        .filter(|t| is_menu_table(t))
        .flat_map(parse_menu_table)
        .collect();

    if !from_tables.is_empty() {
        return from_tables;
    }
    menu_from_text(pool)
}

/// Grams per person per meal. Table portions are grams unless the unit
/// says kg/lt; text mentions only count when given in grams, since a bare
/// "50 kg" in prose is a stock figure, not a portion.
fn portion_grams(item: &MenuItem, category: FoodCategory, from_table: bool) -> f64 {
    let unit = item.unit.as_deref().map(turkish_lowercase);
    let explicit = match (item.portion, unit.as_deref()) {
        (Some(p), Some("kg" | "lt")) if from_table => Some(p * 1000.0),
        (Some(p), _) if from_table => Some(p),
        (Some(p), Some("gr" | "g")) => Some(p),
        _ => None,
    };
    explicit
        .filter(|p| *p > 0.0)
        .unwrap_or_else(|| category.default_portion_grams())
}

pub fn compare_with_budget(total_cost: f64, budget: f64) -> BudgetComparison {
    let difference = budget - total_cost;
    let margin = if budget > 0.0 {
        difference / budget * 100.0
    } else {
        0.0
    };

    let (risk_level, recommendation) = if margin > 20.0 {
        (BudgetRisk::Safe, "Bütçe yeterli, güvenle teklif verilebilir")
    } else if margin > 5.0 {
        (BudgetRisk::Tight, "Bütçe sıkı, maliyet optimizasyonu önerilir")
    } else {
        (
            BudgetRisk::Risky,
            "Bütçe yetersiz, teklif vermeden önce detaylı analiz gerekli",
        )
    };

    BudgetComparison {
        budget,
        calculated_cost: total_cost,
        difference,
        margin_percentage: round_to(margin, 1),
        risk_level,
        recommendation: recommendation.to_string(),
    }
}

/// Labor, operations, overhead and margin as fixed shares of food cost.
pub fn cost_breakdown(food_cost: f64) -> CostBreakdown {
    CostBreakdown {
        food_cost: food_cost.round(),
        labor_cost: (food_cost * LABOR_SHARE).round(),
        operational_cost: (food_cost * OPERATIONAL_SHARE).round(),
        overhead: (food_cost * OVERHEAD_SHARE).round(),
        profit_margin: (food_cost * PROFIT_SHARE).round(),
    }
}

pub fn forecast(total_cost: f64) -> Forecast {
    Forecast {
        current: total_cost,
        next_month: (total_cost * (1.0 + MONTHLY_INFLATION)).round(),
        next_quarter: (total_cost * (1.0 + MONTHLY_INFLATION).powi(3) * SEASONAL_FACTOR).round(),
        trend: Trend::Up,
        seasonal_factor: SEASONAL_FACTOR,
        confidence: FORECAST_CONFIDENCE,
    }
}

fn is_heating_season(today: NaiveDate) -> bool {
    matches!(today.month(), 11 | 12 | 1 | 2 | 3)
}

/// Cost estimate for the catering contract from the menu and scale fields.
pub struct MarketAnalyzer {
    prices: Arc<dyn PriceSource>,
}

impl Default for MarketAnalyzer {
    fn default() -> Self {
        Self::new(Arc::new(StaticPriceTable::default()))
    }
}

impl MarketAnalyzer {
    pub fn new(prices: Arc<dyn PriceSource>) -> Self {
        Self { prices }
    }

    pub fn analyze(&self, pool: &DataPool, fields: &ExtractedFields) -> Result<MarketAnalysis, AnalysisError> {
        self.analyze_on(pool, fields, Local::now().date_naive())
    }

    /// Same as [`analyze`](Self::analyze) with the calendar date fixed,
    /// which decides the seasonal warning and the price date.
    pub fn analyze_on(
        &self,
        pool: &DataPool,
        fields: &ExtractedFields,
        today: NaiveDate,
    ) -> Result<MarketAnalysis, AnalysisError> {
        let menu = extract_menu_items(pool);
        let mut warnings = Vec::new();
        if menu.is_empty() {
            warnings.push("Menü kalemi bulunamadı, maliyet hesaplanamadı".to_string());
        }

        let headcount = fields.kisi_sayisi.unwrap_or_else(|| {
            warnings.push(format!("Kişi sayısı bulunamadı, {DEFAULT_HEADCOUNT} kişi varsayıldı"));
            DEFAULT_HEADCOUNT
        });
        let meals = fields.ogun_sayisi.unwrap_or(DEFAULT_MEALS_PER_DAY);
        let days = fields.gun_sayisi.unwrap_or_else(|| {
            warnings.push(format!("Gün sayısı bulunamadı, {DEFAULT_DAYS} gün varsayıldı"));
            DEFAULT_DAYS
        });
        let daily_portions = f64::from(headcount) * f64::from(meals);

        let mut cost_items = Vec::with_capacity(menu.len());
        for item in &menu {
            cost_items.push(self.cost_item(item, daily_portions, f64::from(days), today)?);
        }

        let food_cost: f64 = cost_items.iter().map(|i| i.total_price).sum();
        let breakdown = cost_breakdown(food_cost);
        let total_cost = breakdown.sum();
        let comparison = compare_with_budget(total_cost, fields.tahmini_butce.unwrap_or(0.0));

        let high_cost = cost_items.iter().filter(|i| i.total_price > HIGH_COST_ITEM).count();
        if high_cost > 0 {
            warnings.push(format!("{high_cost} kalem yüksek maliyetli ürün tespit edildi"));
        }
        let low_confidence = cost_items.iter().filter(|i| i.confidence < LOW_CONFIDENCE).count();
        if low_confidence > 0 {
            warnings.push(format!("{low_confidence} ürün için fiyat güvenilirliği düşük"));
        }
        match fields.tahmini_butce {
            Some(_) if comparison.risk_level == BudgetRisk::Risky => {
                warnings.push("Bütçe riski yüksek! Detaylı inceleme gerekli".to_string());
            }
            None => warnings.push("Tahmini bütçe bulunamadı, bütçe karşılaştırması yapılamadı".to_string()),
            _ => {}
        }
        if is_heating_season(today) {
            warnings.push("Kış ayları için ısınma maliyetleri hesaba katılmalı".to_string());
        }

        tracing::info!(
            items = cost_items.len(),
            total_cost,
            risk = comparison.risk_level.as_str(),
            "Market analysis complete"
        );

        Ok(MarketAnalysis {
            price_sources: PriceSources {
                db_used: !cost_items.is_empty(),
                ..PriceSources::default()
            },
            cost_items,
            total_cost,
            breakdown,
            forecast: forecast(total_cost),
            comparison,
            warnings,
        })
    }

    fn cost_item(
        &self,
        item: &MenuItem,
        daily_portions: f64,
        days: f64,
        today: NaiveDate,
    ) -> Result<CostItem, AnalysisError> {
        let normalized = normalize_product_name(&item.name);
        let category = categorize_product(&normalized);
        let from_table = item.source_ref.as_deref().is_some_and(|r| r.contains(":row"));
        let grams = portion_grams(item, category, from_table);
        let quantity = grams * daily_portions * days / 1000.0;

        let (unit_price, currency, confidence, source) = match self.prices.lookup(&normalized)? {
            Some(quote) => (quote.unit_price, quote.currency, quote.confidence, self.prices.name().to_string()),
            None => {
                tracing::debug!(product = %normalized, "No price found, using fallback");
                (FALLBACK_PRICE, "TRY".to_string(), FALLBACK_CONFIDENCE, "fallback".to_string())
            }
        };

        Ok(CostItem {
            product_key: normalized.split_whitespace().collect::<Vec<_>>().join("_"),
            name_original: item.name.clone(),
            name_normalized: normalized,
            category,
            unit: "kg".into(),
            quantity: round_to(quantity, 2),
            prices: ItemPrices {
                db: Some(PriceData {
                    value: unit_price,
                    currency,
                    date: today,
                    source,
                }),
                ..ItemPrices::default()
            },
            unit_price,
            confidence,
            total_price: round_to(unit_price * quantity, 2),
            source_ref: item.source_ref.iter().cloned().collect(),
        })
    }
}
