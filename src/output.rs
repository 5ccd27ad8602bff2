use std::io::{self, Write};

use serde::Serialize;

use crate::pipeline::DownloadSummary;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

#[derive(Debug, Serialize)]
struct SummaryReport {
    xeno_canto: usize,
    macaulay: usize,
    total: usize,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_summary(summary: &DownloadSummary) -> io::Result<()> {
        Self::print_json(&SummaryReport {
            xeno_canto: summary.xeno_canto,
            macaulay: summary.macaulay,
            total: summary.total(),
        })
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

pub fn render_summary(summary: &DownloadSummary) -> String {
    format!(
        "Download Summary:\n- Xeno-Canto: {} files\n- eBird/ML: {} files\n- Total: {} files\n",
        summary.xeno_canto,
        summary.macaulay,
        summary.total()
    )
}
