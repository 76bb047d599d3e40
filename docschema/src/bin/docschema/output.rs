use anyhow::Result;
use clap::ValueEnum;
use colored::{Color, Colorize};
use comfy_table::{Attribute, Cell, Color as TableColor, Table, presets};
use serde::{Deserialize, Serialize};

const PASS: Color = Color::Green;
const FAIL: Color = Color::Red;
const WARN: Color = Color::Yellow;
const TRACE: Color = Color::BrightBlack;

/// How reports are rendered on stdout.
#[derive(Clone, Copy, Debug, ValueEnum, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One table row per slot or document
    #[default]
    Table,
    /// Pretty-printed JSON
    Json,
    /// One line per type or document
    Compact,
}

#[derive(Clone, Debug, Default)]
pub struct ReportOptions {
    pub format: OutputFormat,
    pub quiet: bool,
    pub verbose: bool,
    pub no_color: bool,
}

/// A command result that can be printed in every [`OutputFormat`].
pub trait Report: Serialize {
    fn headers(&self) -> &'static [&'static str];
    fn rows(&self, reporter: &Reporter) -> Vec<Vec<Cell>>;
    fn compact_lines(&self) -> Vec<String>;
}

/// Prints reports on stdout and progress or verdict lines on stderr.
pub struct Reporter {
    pub options: ReportOptions,
}

impl Reporter {
    pub fn new(options: ReportOptions) -> Self {
        Self { options }
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.options.no_color {
            text.to_owned()
        } else {
            text.color(color).to_string()
        }
    }

    pub fn render<R: Report>(&self, report: &R) -> Result<String> {
        Ok(match self.options.format {
            OutputFormat::Json => serde_json::to_string_pretty(report)?,
            OutputFormat::Compact => report.compact_lines().join("\n"),
            OutputFormat::Table => {
                let mut table = Table::new();
                table.load_preset(if self.options.no_color {
                    presets::ASCII_FULL
                } else {
                    presets::UTF8_FULL_CONDENSED
                });
                table.set_header(report.headers().iter().map(|header| {
                    let cell = Cell::new(header).add_attribute(Attribute::Bold);
                    if self.options.no_color { cell } else { cell.fg(TableColor::Cyan) }
                }));
                for row in report.rows(self) {
                    table.add_row(row);
                }
                table.to_string()
            }
        })
    }

    pub fn print<R: Report>(&self, report: &R) -> Result<()> {
        if !self.options.quiet {
            println!("{}", self.render(report)?);
        }
        Ok(())
    }

    /// Table cell marking a passed or failed check.
    pub fn mark(&self, ok: bool) -> Cell {
        let (text, color) = if ok { ("yes", TableColor::Green) } else { ("no", TableColor::Red) };
        if self.options.no_color { Cell::new(text) } else { Cell::new(text).fg(color) }
    }

    /// Final line of a command; failures are printed even in quiet mode.
    pub fn verdict(&self, ok: bool, message: &str) {
        if ok {
            if !self.options.quiet && self.options.format != OutputFormat::Json {
                eprintln!("{}", self.paint(message, PASS));
            }
        } else {
            eprintln!("{}", self.paint(message, FAIL));
        }
    }

    pub fn warn(&self, message: &str) {
        if !self.options.quiet {
            eprintln!("{}", self.paint(message, WARN));
        }
    }

    /// Progress line shown with `--verbose`.
    pub fn trace(&self, message: &str) {
        if self.options.verbose && !self.options.quiet {
            eprintln!("{}", self.paint(message, TRACE));
        }
    }
}
