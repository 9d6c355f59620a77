pub(crate) mod limits;
pub(crate) mod migrate;
pub(crate) mod records;
pub(crate) mod shared;
pub(crate) mod sync;

use clap::ValueEnum;

/// Output format for tabular commands.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Display as a formatted table (default)
    #[default]
    Table,
    /// Display as JSON
    Json,
}

impl OutputFormat {
    /// Print rows as a rounded table or pretty JSON.
    pub(crate) fn print<T>(self, rows: Vec<T>) -> Result<(), serde_json::Error>
    where
        T: serde::Serialize + tabled::Tabled,
    {
        match self {
            OutputFormat::Table => {
                let mut table = tabled::Table::new(rows);
                table.with(tabled::settings::Style::rounded());
                println!("{}", table);
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            }
        }
        Ok(())
    }
}
