use budget_forecast::config::ForecastConfig;
use budget_forecast::data::{DataLoader, HistoryYear, SalesRow};
use budget_forecast::error::{DataValidationError, ForecastError};
use polars::prelude::*;
use pretty_assertions::assert_eq;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_history(header: &str, extra_rows: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{}", header).unwrap();
    for year in [2024, 2025] {
        for month in 1..=12 {
            writeln!(file, "{},{},Garden,10,1000.0,600.0,1500.0", year, month).unwrap();
            writeln!(file, "{},{},Kitchen,4,800.0,520.0,900.0", year, month).unwrap();
        }
    }
    for row in extra_rows {
        writeln!(file, "{}", row).unwrap();
    }
    file
}

fn validation_error(
    result: std::result::Result<budget_forecast::HistoricalDataset, ForecastError>,
) -> DataValidationError {
    match result {
        Err(ForecastError::DataValidation(err)) => err,
        other => panic!("expected a validation error, got {:?}", other),
    }
}

#[test]
fn test_data_loader_from_csv() {
    let file = write_history("Year,Month,Group,Quantity,Sales,COGS,Stock", &[]);
    let dataset = DataLoader::new().from_csv(file.path()).unwrap();

    assert_eq!(dataset.forecast_year(), 2026);
    assert_eq!(dataset.history_years(), (2024, 2025));
    assert_eq!(dataset.groups(), &["Garden".to_string(), "Kitchen".to_string()]);
    assert_eq!(dataset.records().len(), 48);
    assert_eq!(dataset.realized_through(), None);

    let garden = dataset.baseline("Garden").unwrap();
    assert_eq!(garden.annual(HistoryYear::Later).sales, 12_000.0);
    assert_eq!(garden.month(HistoryYear::Earlier, 3).gross_profit(), 400.0);
    assert!(dataset.records().iter().all(|r| r.gross_profit == r.sales - r.cogs));
}

#[test]
fn test_column_names_are_case_insensitive() {
    let file = write_history("year,MONTH,MainGroup,quantity,sales,cogs,STOCK", &[]);
    let dataset = DataLoader::new().from_csv(file.path()).unwrap();
    assert_eq!(dataset.groups().len(), 2);
}

#[test]
fn test_realized_rows_set_the_boundary() {
    let file = write_history(
        "Year,Month,Group,Quantity,Sales,COGS,Stock",
        &[
            "2026,1,Garden,11,1100.0,650.0,1400.0",
            "2026,2,Kitchen,5,900.0,560.0,950.0",
            "2026,3,Garden,0,0,0,0",
        ],
    );
    let dataset = DataLoader::new().from_csv(file.path()).unwrap();

    assert_eq!(dataset.forecast_year(), 2026);
    assert_eq!(dataset.realized_through(), Some(2));
    assert_eq!(dataset.realized_records().len(), 3);
    assert_eq!(dataset.realized("Garden", 1).unwrap().sales, 1100.0);
    assert!(dataset.realized("Kitchen", 1).is_none());
    // Realized rows do not count as history
    assert_eq!(dataset.records().len(), 48);
}

#[test]
fn test_explicit_forecast_year_ignores_other_years() {
    let rows = vec![
        SalesRow::new(2023, 1, "A", 1.0, 10.0, 5.0, 3.0),
        SalesRow::new(2024, 1, "A", 1.0, 10.0, 5.0, 3.0),
        SalesRow::new(2025, 1, "A", 2.0, 20.0, 10.0, 6.0),
        SalesRow::new(2027, 1, "A", 9.0, 90.0, 45.0, 27.0),
    ];
    let dataset = DataLoader::with_forecast_year(2026).from_rows(rows).unwrap();

    assert_eq!(dataset.forecast_year(), 2026);
    assert_eq!(dataset.ignored_rows(), 2);
    assert_eq!(dataset.records().len(), 2);
}

#[test]
fn test_duplicate_rows_are_summed() {
    let rows = vec![
        SalesRow::new(2024, 5, "A", 1.0, 100.0, 60.0, 10.0),
        SalesRow::new(2024, 5, "A", 2.0, 200.0, 120.0, 20.0),
        SalesRow::new(2025, 5, "A", 3.0, 300.0, 180.0, 30.0),
    ];
    let dataset = DataLoader::new().from_rows(rows).unwrap();

    let may = dataset.baseline("A").unwrap().month(HistoryYear::Earlier, 5);
    assert_eq!(may.quantity, 3.0);
    assert_eq!(may.sales, 300.0);
    assert_eq!(may.stock, 30.0);
    assert_eq!(dataset.records().len(), 2);
}

#[test]
fn test_missing_column() {
    let file = write_history("Year,Month,Group,Quantity,Sales,COGS,Inventory", &[]);
    let err = validation_error(DataLoader::new().from_csv(file.path()));
    assert_eq!(
        err,
        DataValidationError::MissingColumn {
            column: "Stock".to_string()
        }
    );
}

#[test]
fn test_missing_year() {
    let rows = vec![
        SalesRow::new(2023, 1, "A", 1.0, 10.0, 5.0, 3.0),
        SalesRow::new(2025, 1, "A", 1.0, 10.0, 5.0, 3.0),
    ];
    let err = validation_error(DataLoader::new().from_rows(rows));
    assert_eq!(err, DataValidationError::MissingYear { year: 2024 });
    assert!(err.to_string().contains("2024"));
}

#[test]
fn test_group_without_history() {
    let rows = vec![
        SalesRow::new(2024, 1, "A", 1.0, 10.0, 5.0, 3.0),
        SalesRow::new(2025, 1, "A", 1.0, 10.0, 5.0, 3.0),
        SalesRow::new(2026, 1, "New", 1.0, 10.0, 5.0, 3.0),
    ];
    let err = validation_error(DataLoader::new().from_rows(rows));
    assert_eq!(
        err,
        DataValidationError::EmptyGroup {
            group: "New".to_string(),
            first_year: 2024,
            second_year: 2025,
        }
    );
}

#[test]
fn test_invalid_month() {
    let file = write_history(
        "Year,Month,Group,Quantity,Sales,COGS,Stock",
        &["2025,13,Garden,1,1.0,1.0,1.0"],
    );
    let err = validation_error(DataLoader::new().from_csv(file.path()));
    assert_eq!(
        err,
        DataValidationError::InvalidMonth {
            year: 2025,
            group: "Garden".to_string(),
            month: 13,
        }
    );
}

#[test]
fn test_missing_value() {
    let file = write_history(
        "Year,Month,Group,Quantity,Sales,COGS,Stock",
        &["2025,6,Garden,1,,1.0,1.0"],
    );
    let err = validation_error(DataLoader::new().from_csv(file.path()));
    assert!(matches!(err, DataValidationError::MissingValue { ref column, row: 48 } if column == "Sales"));
}

#[test]
fn test_non_finite_value() {
    let rows = vec![
        SalesRow::new(2024, 1, "A", 1.0, 10.0, 5.0, 3.0),
        SalesRow::new(2025, 2, "A", 1.0, f64::NAN, 5.0, 3.0),
    ];
    let err = validation_error(DataLoader::new().from_rows(rows));
    assert!(matches!(
        err,
        DataValidationError::InvalidValue { ref column, year: 2025, month: 2, .. } if column == "Sales"
    ));
}

#[test]
fn test_empty_dataset() {
    let err = validation_error(DataLoader::new().from_rows(Vec::new()));
    assert_eq!(err, DataValidationError::EmptyDataset);
}

#[test]
fn test_from_dataframe() {
    let df = df! {
        "Year" => &[2024i64, 2025],
        "Month" => &[1i64, 1],
        "Group" => &["A", "A"],
        "Quantity" => &[10.0, 12.0],
        "Sales" => &[100.0, 130.0],
        "COGS" => &[60.0, 70.0],
        "Stock" => &[40.0, 45.0],
    }
    .unwrap();

    let dataset = DataLoader::new().from_dataframe(&df).unwrap();
    assert_eq!(dataset.forecast_year(), 2026);
    assert_eq!(dataset.records()[1].gross_profit, 60.0);
}

#[test]
fn test_out_of_range_year() {
    let df = df! {
        "Year" => &[2024i64, 5_000_000_000],
        "Month" => &[1i64, 1],
        "Group" => &["A", "A"],
        "Quantity" => &[10.0, 12.0],
        "Sales" => &[100.0, 130.0],
        "COGS" => &[60.0, 70.0],
        "Stock" => &[40.0, 45.0],
    }
    .unwrap();

    let err = validation_error(DataLoader::new().from_dataframe(&df));
    assert_eq!(
        err,
        DataValidationError::InvalidYear {
            row: 1,
            value: 5_000_000_000,
        }
    );
}

#[test]
fn test_loader_from_config_uses_forecast_year() {
    let file = write_history(
        "Year,Month,Group,Quantity,Sales,COGS,Stock",
        &["2026,1,Garden,12,1200.0,700.0,1600.0", "2026,1,Kitchen,5,900.0,600.0,950.0"],
    );

    let config = ForecastConfig::from_toml_str("forecast_year = 2027\n").unwrap();
    let dataset = DataLoader::from_config(&config).from_csv(file.path()).unwrap();
    assert_eq!(dataset.forecast_year(), 2027);
    assert_eq!(dataset.history_years(), (2025, 2026));
    assert_eq!(dataset.ignored_rows(), 24);
    assert_eq!(dataset.realized_through(), None);

    // Without a configured year the loader infers one
    let dataset = DataLoader::from_config(&ForecastConfig::default())
        .from_csv(file.path())
        .unwrap();
    assert_eq!(dataset.forecast_year(), 2026);
    assert_eq!(dataset.realized_through(), Some(1));
}

#[test]
fn test_history_to_dataframe() {
    let file = write_history("Year,Month,Group,Quantity,Sales,COGS,Stock", &[]);
    let dataset = DataLoader::new().from_csv(file.path()).unwrap();
    let df = dataset.to_dataframe().unwrap();

    assert_eq!(df.height(), 48);
    assert_eq!(
        df.get_column_names(),
        vec![
            "Year",
            "Month",
            "Group",
            "Quantity",
            "Sales",
            "COGS",
            "GrossProfit",
            "Stock",
            "GrossMargin%",
            "Source"
        ]
    );
}

#[test]
fn test_missing_file() {
    let result = DataLoader::new().from_csv("no_such_history.csv");
    assert!(matches!(result, Err(ForecastError::IoError(_))));
}
