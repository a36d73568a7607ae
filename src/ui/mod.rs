pub mod icons;
pub mod output;
pub mod progress;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{error, header, info, ready, section, success, summary_row, warn};
pub use progress::MigrationProgress;
pub use table::{records_table, report_table};
pub use theme::{is_quiet, theme, Theme};
