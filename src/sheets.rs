use async_trait::async_trait;
use google_sheets4::Sheets;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::auth::HttpsConnector;
use crate::error::Error;

/// `<sheet name>!<cell range>`, e.g. `Sheet1!A2:E`.
pub fn a1_range(sheet_name: &str, cell_range: &str) -> String {
    format!("{}!{}", sheet_name, cell_range)
}

/// Rows of cell values as returned by a range read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellGrid {
    rows: Vec<Vec<String>>,
}

impl CellGrid {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    /// Converts raw API cells: strings verbatim, other scalars as JSON text.
    pub fn from_values<T: Serialize>(values: Vec<Vec<T>>) -> Result<Self, serde_json::Error> {
        let rows = values
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| serde_json::to_value(cell).map(cell_text))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

impl<S: Into<String>> FromIterator<Vec<S>> for CellGrid {
    fn from_iter<I: IntoIterator<Item = Vec<S>>>(iter: I) -> Self {
        Self::new(
            iter.into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        )
    }
}

fn cell_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[async_trait]
pub trait SheetSource: Send + Sync {
    async fn read_range(&self, spreadsheet_id: &str, range: &str) -> Result<CellGrid, Error>;
}

/// Reads values through the Sheets v4 API.
pub struct SheetsReader {
    hub: Sheets<HttpsConnector>,
}

impl SheetsReader {
    pub fn new(hub: Sheets<HttpsConnector>) -> Self {
        Self { hub }
    }
}

#[async_trait]
impl SheetSource for SheetsReader {
    async fn read_range(&self, spreadsheet_id: &str, range: &str) -> Result<CellGrid, Error> {
        info!("Fetching rows from sheet {} range {}", spreadsheet_id, range);

        let read_error = |message: String| Error::Read {
            sheet_id: spreadsheet_id.to_string(),
            range: range.to_string(),
            message,
        };

        let (_, value_range) = self
            .hub
            .spreadsheets()
            .values_get(spreadsheet_id, range)
            .doit()
            .await
            .map_err(|e| read_error(e.to_string()))?;

        let grid = CellGrid::from_values(value_range.values.unwrap_or_default())
            .map_err(|e| read_error(format!("unexpected cell value: {}", e)))?;
        debug!("Fetched {} rows", grid.len());
        Ok(grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn range_joins_sheet_and_cells() {
        assert_eq!(a1_range("Sheet1", "A2:E"), "Sheet1!A2:E");
        assert_eq!(a1_range("My Data", "B:B"), "My Data!B:B");
    }

    #[test]
    fn from_values_renders_scalars() {
        let grid = CellGrid::from_values(vec![
            vec![json!("a"), json!(42), json!(1.5)],
            vec![json!(true), json!(null)],
        ])
        .unwrap();
        assert_eq!(
            grid.rows(),
            &[
                vec!["a".to_string(), "42".into(), "1.5".into()],
                vec!["true".to_string(), "".into()],
            ]
        );
    }

    #[test]
    fn from_values_accepts_plain_strings() {
        let grid = CellGrid::from_values(vec![vec!["x".to_string()]]).unwrap();
        assert_eq!(grid, CellGrid::from_iter([vec!["x"]]));
    }

    #[test]
    fn empty_values_make_an_empty_grid() {
        let grid = CellGrid::from_values(Vec::<Vec<Value>>::new()).unwrap();
        assert!(grid.is_empty());
        assert_eq!(grid.len(), 0);
    }
}
