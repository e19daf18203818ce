use std::fmt::Display;

use serde::Serialize;

use crate::cli::{OutputFormat, ReportFormat};

const COLUMN_GAP: usize = 3;

#[derive(Serialize)]
pub struct TableCellOption<T>(Option<T>);

impl<T> From<Option<T>> for TableCellOption<T> {
    fn from(value: Option<T>) -> Self {
        TableCellOption(value)
    }
}

impl<T: Display> Display for TableCellOption<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(value) = &self.0 {
            value.fmt(f)
        } else {
            f.write_str("-")
        }
    }
}

pub trait TableOutputRow {
    fn get_name(&self) -> String;
    fn get_column_names() -> Vec<String>;
    fn get_column_count() -> usize;
    fn get_row(&self) -> Vec<String>;
}

pub trait TableOutputDisplay {
    fn render_names(self) -> String;
    fn render_table(self, with_headers: bool) -> String;
}

impl<I: IntoIterator<Item = T>, T: TableOutputRow> TableOutputDisplay for I {
    fn render_names(self) -> String {
        self.into_iter()
            .map(|row| format!("{}\n", row.get_name()))
            .collect()
    }

    fn render_table(self, with_headers: bool) -> String {
        let mut rows = self.into_iter().map(|r| r.get_row()).collect::<Vec<_>>();

        if with_headers {
            rows.insert(0, T::get_column_names());
        }

        let mut widths = vec![0; T::get_column_count()];
        for row in &rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let mut output = String::new();
        for row in rows {
            let last = row.len().saturating_sub(1);
            for (i, (cell, width)) in row.iter().zip(&widths).enumerate() {
                if i == last {
                    output.push_str(cell);
                } else {
                    output.push_str(&format!("{cell:<pad$}", pad = width + COLUMN_GAP));
                }
            }
            output.push('\n');
        }

        output
    }
}

pub trait SerializableOutputDisplay {
    fn to_json(&self) -> Result<String, serde_json::Error>;
    fn to_json_pretty(&self) -> Result<String, serde_json::Error>;
    fn to_yaml(&self) -> Result<String, serde_yaml::Error>;
}

impl<T: ?Sized + Serialize> SerializableOutputDisplay for T {
    fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self).map(|s| s + "\n")
    }

    fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self).map(|s| s + "\n")
    }

    fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

pub trait CliPrint {
    fn render(self, format: OutputFormat) -> anyhow::Result<String>;

    fn print(self, format: OutputFormat) -> anyhow::Result<()>
    where
        Self: Sized,
    {
        print!("{}", self.render(format)?);

        Ok(())
    }
}

impl<T: Serialize + TableOutputDisplay> CliPrint for T {
    fn render(self, format: OutputFormat) -> anyhow::Result<String> {
        Ok(match format {
            OutputFormat::Names => self.render_names(),
            OutputFormat::Table => self.render_table(false),
            OutputFormat::TableWithHeaders => self.render_table(true),
            OutputFormat::Json => self.to_json()?,
            OutputFormat::JsonPretty => self.to_json_pretty()?,
            OutputFormat::Yaml => self.to_yaml()?,
        })
    }
}

/// Renders anything that has both a human readable and a serializable form.
pub fn render_report<T: Display + Serialize>(
    report: &T,
    format: ReportFormat,
) -> anyhow::Result<String> {
    Ok(match format {
        ReportFormat::Text => report.to_string(),
        ReportFormat::Json => report.to_json()?,
        ReportFormat::JsonPretty => report.to_json_pretty()?,
        ReportFormat::Yaml => report.to_yaml()?,
    })
}
