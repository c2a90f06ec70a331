use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use tabled::Tabled;

use crate::util::{count_from_f64, normalize_label, parse_count_safe};

/// Canonical months, in calendar order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Month {
    Janeiro,
    Fevereiro,
    Marco,
    Abril,
    Maio,
    Junho,
    Julho,
    Agosto,
    Setembro,
    Outubro,
    Novembro,
    Dezembro,
}

impl Month {
    pub const ALL: [Month; 12] = [
        Month::Janeiro,
        Month::Fevereiro,
        Month::Marco,
        Month::Abril,
        Month::Maio,
        Month::Junho,
        Month::Julho,
        Month::Agosto,
        Month::Setembro,
        Month::Outubro,
        Month::Novembro,
        Month::Dezembro,
    ];

    /// Title-case label shown in tables, charts and exported headers.
    pub fn display_name(self) -> &'static str {
        match self {
            Month::Janeiro => "Janeiro",
            Month::Fevereiro => "Fevereiro",
            Month::Marco => "Março",
            Month::Abril => "Abril",
            Month::Maio => "Maio",
            Month::Junho => "Junho",
            Month::Julho => "Julho",
            Month::Agosto => "Agosto",
            Month::Setembro => "Setembro",
            Month::Outubro => "Outubro",
            Month::Novembro => "Novembro",
            Month::Dezembro => "Dezembro",
        }
    }

    /// Upper-case label used as the stored `mes` value.
    pub fn storage_name(self) -> String {
        self.display_name().to_uppercase()
    }

    /// 1-based calendar number.
    pub fn number(self) -> u32 {
        self as u32 + 1
    }

    pub fn from_number(n: u32) -> Option<Month> {
        Month::ALL.get(n.checked_sub(1)? as usize).copied()
    }

    /// Parse any case/whitespace variant of a month name.
    ///
    /// `MARCO` is accepted for `MARÇO` since spreadsheets typed on keyboards
    /// without a cedilla show up in practice.
    pub fn parse(label: &str) -> Option<Month> {
        let key = normalize_label(label);
        if key == "MARCO" {
            return Some(Month::Marco);
        }
        Month::ALL.iter().copied().find(|m| m.storage_name() == key)
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Row as it lives in the `treinamentos` table.
///
/// Other clients write to the same table, so a row may carry `null`, floats
/// or numeric strings where counts belong; those decode to a count (or 0)
/// instead of failing the whole select.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: i64,
    #[serde(default, deserialize_with = "lenient_text")]
    pub area: String,
    #[serde(rename = "mes", default, deserialize_with = "lenient_text")]
    pub month: String,
    #[serde(rename = "em_dia", default, deserialize_with = "lenient_count")]
    pub on_time: u32,
    #[serde(rename = "vencido", default, deserialize_with = "lenient_count")]
    pub overdue: u32,
}

fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => match n.as_u64() {
            Some(v) => u32::try_from(v).unwrap_or(u32::MAX),
            None => n.as_f64().map(count_from_f64).unwrap_or(0),
        },
        Some(Value::String(s)) => parse_count_safe(Some(&s)),
        _ => 0,
    })
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}

/// Payload for inserting a new row; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewRecord {
    pub area: String,
    #[serde(rename = "mes")]
    pub month: String,
    #[serde(rename = "em_dia")]
    pub on_time: u32,
    #[serde(rename = "vencido")]
    pub overdue: u32,
}

/// A record with normalized labels, as handed to the reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingRecord {
    pub area: String,
    pub month: String,
    pub on_time: u32,
    pub overdue: u32,
}

impl TrainingRecord {
    pub fn new(area: &str, month: &str, on_time: u32, overdue: u32) -> Self {
        Self {
            area: normalize_label(area),
            month: normalize_label(month),
            on_time,
            overdue,
        }
    }

    /// Canonical month for this record, if its label is one of the twelve.
    pub fn canonical_month(&self) -> Option<Month> {
        Month::parse(&self.month)
    }
}

impl From<StoredRecord> for TrainingRecord {
    fn from(row: StoredRecord) -> Self {
        TrainingRecord::new(&row.area, &row.month, row.on_time, row.overdue)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonthCounts {
    pub on_time: u32,
    pub overdue: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PivotRow {
    pub area: String,
    /// One entry per month of the owning table, same order.
    pub counts: Vec<MonthCounts>,
}

/// Wide view: one row per area, one on-time/overdue pair per month.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PivotTable {
    pub months: Vec<Month>,
    pub rows: Vec<PivotRow>,
}

/// Which flavor of column header to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderStyle {
    /// `Janeiro (Em Dia)`, used on screen.
    Display,
    /// `Janeiro Em Dia`, used in exported spreadsheets.
    Export,
}

impl PivotTable {
    pub fn column_count(&self) -> usize {
        1 + self.months.len() * 2
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn headers(&self, style: HeaderStyle) -> Vec<String> {
        let mut headers = Vec::with_capacity(self.column_count());
        headers.push("area".to_string());
        for month in &self.months {
            let name = month.display_name();
            match style {
                HeaderStyle::Display => {
                    headers.push(format!("{name} (Em Dia)"));
                    headers.push(format!("{name} (Vencido)"));
                }
                HeaderStyle::Export => {
                    headers.push(format!("{name} Em Dia"));
                    headers.push(format!("{name} Vencido"));
                }
            }
        }
        headers
    }

    /// Counts for `area` in `month`, if both are part of this table.
    pub fn counts(&self, area: &str, month: Month) -> Option<MonthCounts> {
        let col = self.months.iter().position(|m| *m == month)?;
        let row = self.rows.iter().find(|r| r.area == area)?;
        row.counts.get(col).copied()
    }

    /// Rows flattened to strings in header order.
    pub fn string_rows(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| {
                let mut cells = Vec::with_capacity(self.column_count());
                cells.push(row.area.clone());
                for c in &row.counts {
                    cells.push(c.on_time.to_string());
                    cells.push(c.overdue.to_string());
                }
                cells
            })
            .collect()
    }
}

/// Why a comparison came back without rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoData {
    StoreEmpty,
    NoMatchingMonths,
    AreaWithoutRecords,
}

impl NoData {
    pub fn message(self) -> &'static str {
        match self {
            NoData::StoreEmpty => "Nenhum dado encontrado na tabela 'treinamentos'.",
            NoData::NoMatchingMonths => "Nenhum dado correspondente aos meses selecionados.",
            NoData::AreaWithoutRecords => "Nenhum dado para a área selecionada nesses meses.",
        }
    }
}

/// Two-month comparison; always area plus four count columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonTable {
    pub table: PivotTable,
    pub no_data: Option<NoData>,
}

impl ComparisonTable {
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct MonthSummary {
    #[serde(rename = "Mes")]
    #[tabled(rename = "Mês")]
    pub month: String,
    #[serde(rename = "Areas")]
    #[tabled(rename = "Áreas")]
    pub areas: usize,
    #[serde(rename = "EmDia")]
    #[tabled(rename = "Em Dia")]
    pub on_time: u64,
    #[serde(rename = "Vencido")]
    #[tabled(rename = "Vencido")]
    pub overdue: u64,
    #[serde(rename = "Conformidade")]
    #[tabled(rename = "Conformidade (%)")]
    pub compliance_pct: String,
}
