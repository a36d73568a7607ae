use crate::migrate::MigrationReport;
use crate::storage::Record;
use indicatif::HumanDuration;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
struct RecordRow<'a> {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "Var")]
    var: &'a str,
    #[tabled(rename = "Key")]
    key: &'a str,
    #[tabled(rename = "Value")]
    value: &'a str,
}

#[derive(Tabled)]
struct MetricRow {
    #[tabled(rename = "Metric")]
    metric: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

/// Rows in the order given, numbered from 1
pub fn records_table(records: &[Record]) -> String {
    if records.is_empty() {
        return String::new();
    }

    let rows = records.iter().enumerate().map(|(i, r)| RecordRow {
        rank: i + 1,
        var: &r.var,
        key: &r.key,
        value: &r.value,
    });
    Table::new(rows).with(Style::rounded()).to_string()
}

pub fn report_table(report: &MigrationReport) -> String {
    let rows = [
        MetricRow { metric: "Keys found", value: report.total.to_string() },
        MetricRow { metric: "Transferred", value: report.transferred.to_string() },
        MetricRow { metric: "Failed", value: report.failed.to_string() },
        MetricRow { metric: "Files read", value: report.files.to_string() },
        MetricRow { metric: "Files skipped", value: report.skipped_files.to_string() },
        MetricRow { metric: "Log entries", value: report.log_entries.to_string() },
        MetricRow { metric: "Elapsed", value: HumanDuration(report.elapsed).to_string() },
    ];
    Table::new(rows).with(Style::rounded()).to_string()
}
