//! Progress bar for table-by-table dump runs.

use indicatif::{ProgressBar, ProgressStyle};

/// Bar counting processed tables; its length is set once tables are listed
pub fn table_progress_bar() -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} tables {msg}",
        )?
        .progress_chars("█▓▒░  ")
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    Ok(pb)
}

/// Move `pb` to `done` of `total`, showing the table just finished
pub fn update_table_progress(pb: &ProgressBar, done: usize, total: usize, table: &str) {
    pb.set_length(total as u64);
    pb.set_position(done as u64);
    pb.set_message(table.to_string());
}
