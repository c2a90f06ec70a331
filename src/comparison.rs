use std::collections::BTreeMap;

use thiserror::Error;
use tracing::{debug, warn};

use crate::types::{
    ComparisonTable, Month, MonthCounts, MonthSummary, NoData, PivotRow, PivotTable,
    TrainingRecord,
};
use crate::util::{compliance_pct, format_pct, normalize_label};

/// Label of the "no filter" entry in the area selector.
pub const ALL_AREAS: &str = "Todas";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ComparisonError {
    #[error("Selecione dois meses diferentes ({0} escolhido duas vezes).")]
    SameMonth(Month),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AreaFilter {
    All,
    Only(String),
}

impl AreaFilter {
    /// The exact selector label `Todas` or blank input means no filter; any
    /// other text, `TODAS` included, names an area.
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if input.is_empty() || input == ALL_AREAS {
            return AreaFilter::All;
        }
        AreaFilter::Only(normalize_label(input))
    }

    fn matches(&self, area: &str) -> bool {
        match self {
            AreaFilter::All => true,
            AreaFilter::Only(wanted) => *wanted == normalize_label(area),
        }
    }
}

/// Build the two-month comparison for the selected area(s).
///
/// Columns come out in calendar order regardless of the order the months
/// were picked in. An empty result is reported through
/// [`ComparisonTable::no_data`], never as an error.
pub fn build_comparison(
    records: &[TrainingRecord],
    month_a: Month,
    month_b: Month,
    area_filter: &AreaFilter,
) -> Result<ComparisonTable, ComparisonError> {
    if month_a == month_b {
        return Err(ComparisonError::SameMonth(month_a));
    }
    let mut months = vec![month_a, month_b];
    months.sort();

    if records.is_empty() {
        return Ok(empty_comparison(months, NoData::StoreEmpty));
    }

    let in_months: Vec<&TrainingRecord> = records
        .iter()
        .filter(|r| Month::parse(&r.month).is_some_and(|m| months.contains(&m)))
        .collect();
    let selected: Vec<&TrainingRecord> = in_months
        .iter()
        .copied()
        .filter(|r| area_filter.matches(&r.area))
        .collect();

    if selected.is_empty() {
        let reason = match area_filter {
            AreaFilter::Only(_) if !in_months.is_empty() => NoData::AreaWithoutRecords,
            _ => NoData::NoMatchingMonths,
        };
        return Ok(empty_comparison(months, reason));
    }

    let table = pivot(selected.into_iter(), months);
    debug!(rows = table.rows.len(), "Built comparison table");
    Ok(ComparisonTable {
        table,
        no_data: None,
    })
}

/// Pivot every record whose month is one of the twelve canonical names.
///
/// Months appear in calendar order and only when at least one record has
/// them. This is the complete base used by the spreadsheet export.
pub fn build_full_table(records: &[TrainingRecord]) -> PivotTable {
    let mut months: Vec<Month> = Vec::new();
    let mut known: Vec<&TrainingRecord> = Vec::with_capacity(records.len());
    for r in records {
        match Month::parse(&r.month) {
            Some(m) => {
                if !months.contains(&m) {
                    months.push(m);
                }
                known.push(r);
            }
            None => warn!(area = %r.area, month = %r.month, "Skipping record with unknown month"),
        }
    }
    months.sort();
    pivot(known.into_iter(), months)
}

/// Group by area and spread counts over `months`, zero-filling gaps.
///
/// If the store holds duplicate rows for one (area, month) pair, their counts
/// are averaged the way a pivot over raw rows would; see
/// [`mean_counts`].
fn pivot<'a>(records: impl Iterator<Item = &'a TrainingRecord>, months: Vec<Month>) -> PivotTable {
    let mut by_area: BTreeMap<String, Vec<Vec<MonthCounts>>> = BTreeMap::new();
    for r in records {
        let Some(col) = Month::parse(&r.month).and_then(|m| months.iter().position(|x| *x == m))
        else {
            continue;
        };
        let cells = by_area
            .entry(normalize_label(&r.area))
            .or_insert_with(|| vec![Vec::new(); months.len()]);
        cells[col].push(MonthCounts {
            on_time: r.on_time,
            overdue: r.overdue,
        });
    }

    let rows = by_area
        .into_iter()
        .map(|(area, cells)| PivotRow {
            area,
            counts: cells.iter().map(|c| mean_counts(c)).collect(),
        })
        .collect();
    PivotTable { months, rows }
}

/// Mean of duplicate cells, truncated; a single cell passes through and an
/// empty one is zero.
fn mean_counts(cells: &[MonthCounts]) -> MonthCounts {
    match cells {
        [] => MonthCounts::default(),
        [one] => *one,
        many => {
            let n = many.len() as u64;
            let on_time: u64 = many.iter().map(|c| c.on_time as u64).sum();
            let overdue: u64 = many.iter().map(|c| c.overdue as u64).sum();
            MonthCounts {
                on_time: (on_time / n) as u32,
                overdue: (overdue / n) as u32,
            }
        }
    }
}

fn empty_comparison(months: Vec<Month>, reason: NoData) -> ComparisonTable {
    ComparisonTable {
        table: PivotTable {
            months,
            rows: Vec::new(),
        },
        no_data: Some(reason),
    }
}

/// Per-month totals across all rows of a pivot.
pub fn summarize(table: &PivotTable) -> Vec<MonthSummary> {
    table
        .months
        .iter()
        .enumerate()
        .map(|(col, month)| {
            let mut on_time = 0u64;
            let mut overdue = 0u64;
            for row in &table.rows {
                if let Some(c) = row.counts.get(col) {
                    on_time += c.on_time as u64;
                    overdue += c.overdue as u64;
                }
            }
            MonthSummary {
                month: month.display_name().to_string(),
                areas: table.rows.len(),
                on_time,
                overdue,
                compliance_pct: format_pct(compliance_pct(on_time, overdue)),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HeaderStyle;

    fn sample() -> Vec<TrainingRecord> {
        vec![
            TrainingRecord::new("RH", "JANEIRO", 10, 2),
            TrainingRecord::new("RH", "FEVEREIRO", 8, 5),
            TrainingRecord::new("TI", "JANEIRO", 20, 0),
        ]
    }

    fn month(label: &str) -> Month {
        Month::parse(label).unwrap()
    }

    #[test]
    fn test_only_exact_selector_label_means_all_areas() {
        assert_eq!(AreaFilter::parse("Todas"), AreaFilter::All);
        assert_eq!(AreaFilter::parse("  "), AreaFilter::All);
        assert_eq!(AreaFilter::parse("TODAS"), AreaFilter::Only("TODAS".into()));

        let mut records = sample();
        records.push(TrainingRecord::new("todas", "JANEIRO", 1, 1));
        let result = build_comparison(
            &records,
            Month::Janeiro,
            Month::Fevereiro,
            &AreaFilter::parse("todas"),
        )
        .unwrap();
        assert_eq!(result.table.rows.len(), 1);
        assert_eq!(result.table.rows[0].area, "TODAS");
    }

    #[test]
    fn test_rh_ti_scenario() {
        let result = build_comparison(
            &sample(),
            month("Janeiro"),
            month("Fevereiro"),
            &AreaFilter::parse("Todas"),
        )
        .unwrap();
        assert_eq!(result.no_data, None);
        let table = &result.table;
        assert_eq!(
            table.string_rows(),
            vec![
                vec!["RH", "10", "2", "8", "5"],
                vec!["TI", "20", "0", "0", "0"],
            ]
        );
    }

    #[test]
    fn test_same_month_rejected() {
        let err = build_comparison(
            &sample(),
            Month::Janeiro,
            Month::Janeiro,
            &AreaFilter::All,
        )
        .unwrap_err();
        assert_eq!(err, ComparisonError::SameMonth(Month::Janeiro));
    }

    #[test]
    fn test_always_five_columns() {
        for (a, b) in [
            (Month::Janeiro, Month::Fevereiro),
            (Month::Julho, Month::Agosto),
            (Month::Dezembro, Month::Marco),
        ] {
            let result = build_comparison(&sample(), a, b, &AreaFilter::All).unwrap();
            assert_eq!(result.table.column_count(), 5);
            assert_eq!(result.table.headers(HeaderStyle::Display).len(), 5);
            for row in result.table.string_rows() {
                assert_eq!(row.len(), 5);
            }
        }
    }

    #[test]
    fn test_columns_follow_calendar_not_selection_order() {
        let result =
            build_comparison(&sample(), Month::Fevereiro, Month::Janeiro, &AreaFilter::All)
                .unwrap();
        assert_eq!(
            result.table.headers(HeaderStyle::Display),
            vec![
                "area",
                "Janeiro (Em Dia)",
                "Janeiro (Vencido)",
                "Fevereiro (Em Dia)",
                "Fevereiro (Vencido)",
            ]
        );
    }

    #[test]
    fn test_absent_area_month_is_zero() {
        let result =
            build_comparison(&sample(), Month::Janeiro, Month::Fevereiro, &AreaFilter::All)
                .unwrap();
        let ti = result.table.counts("TI", Month::Fevereiro).unwrap();
        assert_eq!(ti, MonthCounts::default());
    }

    #[test]
    fn test_filter_normalizes_case_and_whitespace() {
        let records = vec![
            TrainingRecord {
                area: " rh".to_string(),
                month: "janeiro ".to_string(),
                on_time: 1,
                overdue: 1,
            },
            TrainingRecord::new("TI", "JANEIRO", 2, 2),
        ];
        let result = build_comparison(
            &records,
            Month::Janeiro,
            Month::Maio,
            &AreaFilter::parse("  Rh "),
        )
        .unwrap();
        assert_eq!(result.table.rows.len(), 1);
        assert_eq!(result.table.rows[0].area, "RH");
    }

    #[test]
    fn test_no_data_reasons() {
        let empty = build_comparison(&[], Month::Janeiro, Month::Maio, &AreaFilter::All).unwrap();
        assert_eq!(empty.no_data, Some(NoData::StoreEmpty));
        assert!(empty.is_empty());
        assert_eq!(empty.table.column_count(), 5);

        let months =
            build_comparison(&sample(), Month::Julho, Month::Agosto, &AreaFilter::All).unwrap();
        assert_eq!(months.no_data, Some(NoData::NoMatchingMonths));

        let area = build_comparison(
            &sample(),
            Month::Janeiro,
            Month::Fevereiro,
            &AreaFilter::parse("Logística"),
        )
        .unwrap();
        assert_eq!(area.no_data, Some(NoData::AreaWithoutRecords));
    }

    #[test]
    fn test_rows_are_reproducible() {
        let mut shuffled = sample();
        shuffled.reverse();
        let a = build_comparison(&sample(), Month::Janeiro, Month::Fevereiro, &AreaFilter::All)
            .unwrap();
        let b = build_comparison(&shuffled, Month::Janeiro, Month::Fevereiro, &AreaFilter::All)
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_full_table_uses_every_present_month() {
        let mut records = sample();
        records.push(TrainingRecord::new("TI", "MARÇO", 1, 1));
        records.push(TrainingRecord::new("TI", "13º", 9, 9));
        let table = build_full_table(&records);
        assert_eq!(
            table.months,
            vec![Month::Janeiro, Month::Fevereiro, Month::Marco]
        );
        assert_eq!(table.column_count(), 7);
        assert_eq!(
            table.counts("RH", Month::Marco),
            Some(MonthCounts::default())
        );
    }

    #[test]
    fn test_duplicate_rows_average() {
        let records = vec![
            TrainingRecord::new("RH", "JANEIRO", 10, 2),
            TrainingRecord::new("RH", "JANEIRO", 4, 1),
        ];
        let table = build_full_table(&records);
        assert_eq!(
            table.counts("RH", Month::Janeiro),
            Some(MonthCounts {
                on_time: 7,
                overdue: 1
            })
        );
    }

    #[test]
    fn test_summarize_totals() {
        let result =
            build_comparison(&sample(), Month::Janeiro, Month::Fevereiro, &AreaFilter::All)
                .unwrap();
        let summary = summarize(&result.table);
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].month, "Janeiro");
        assert_eq!((summary[0].on_time, summary[0].overdue), (30, 2));
        assert_eq!(summary[0].compliance_pct, "93,8");
        assert_eq!((summary[1].on_time, summary[1].overdue), (8, 5));
    }
}
