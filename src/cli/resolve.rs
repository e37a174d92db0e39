use std::{fmt::Write as _, path::PathBuf};

use bc3::{resolve_with, Config, Document, Resolution, ResolveOptions, ResolvedLineItem};
use clap::Parser;
use tracing::instrument;

use super::{
    input::{self, Input},
    terminal::{is_narrow, output_width, truncate, Colorize},
};

const CODE_WIDTH: usize = 24;
const NUMBER_WIDTH: usize = 14;
const UNIT_WIDTH: usize = 6;
const MIN_DESCRIPTION_WIDTH: usize = 16;
const INDENT: &str = "  ";

#[derive(Debug, Parser)]
pub struct Resolve {
    /// BC3 files, or directories to search for them
    #[arg(required = true, value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
    Summary,
}

impl Resolve {
    #[instrument(level = "debug", skip_all)]
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let paths = input::collect_paths(&self.paths)?;
        let inputs = input::load(&paths, config)?;
        let options = ResolveOptions::from(config);

        let mut reports = Vec::new();
        let mut failures = 0;
        for input in &inputs {
            match resolve_with(&input.document, &options) {
                Ok(resolution) => reports.push(Report::new(input, resolution)),
                Err(error) => {
                    failures += 1;
                    eprintln!("{}", format!("{}: {error}", input.path.display()).warning());
                }
            }
        }

        let decimals = config.decimals() as usize;
        match self.output {
            OutputFormat::Table => {
                let width = output_width();
                let narrow = is_narrow();
                for report in &reports {
                    print!("{}", render_table(report, width, narrow, decimals));
                }
            }
            OutputFormat::Json => {
                let json: Vec<_> = reports.iter().map(Report::to_json).collect();
                println!("{}", serde_json::to_string_pretty(&json)?);
            }
            OutputFormat::Summary => {
                for report in &reports {
                    println!("{}", render_summary(report));
                }
            }
        }

        if failures > 0 {
            anyhow::bail!("{failures} of {} documents could not be resolved", inputs.len());
        }
        Ok(())
    }
}

/// A resolved document, ready for display.
struct Report<'a> {
    source: String,
    title: String,
    resolution: Resolution,
    document: &'a Document,
}

impl<'a> Report<'a> {
    fn new(input: &'a Input, resolution: Resolution) -> Self {
        Self {
            source: input.path.display().to_string(),
            title: title(&input.document),
            resolution,
            document: &input.document,
        }
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "source": self.source,
            "title": self.title,
            "encoding": self.document.metadata().encoding,
            "items": self.resolution.items(),
            "total": self.resolution.total(),
            "diagnostics": self.resolution.diagnostics(),
            "summary": self.resolution.diagnostic_summary().to_string(),
        })
    }
}

/// The description of the first root, prefixed with the database owner.
fn title(document: &Document) -> String {
    let description = document
        .roots()
        .first()
        .and_then(|code| {
            let text = document.text(code).map(str::trim).filter(|text| !text.is_empty());
            text.or_else(|| document.concept(code).map(bc3::Concept::description))
        })
        .filter(|description| !description.is_empty())
        .unwrap_or("untitled budget");

    match document.version().map(|version| version.owner.trim()) {
        Some(owner) if !owner.is_empty() => format!("{owner}: {description}"),
        _ => description.to_owned(),
    }
}

fn render_table(report: &Report<'_>, width: usize, narrow: bool, decimals: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", report.title.info());
    let _ = writeln!(out, "{}", report.source.dim());
    let _ = writeln!(out);

    let items = report.resolution.items();
    if narrow {
        for item in items {
            let _ = writeln!(
                out,
                "{}{}  {:.decimals$}",
                INDENT.repeat(item.depth),
                item.code,
                item.extended_total
            );
        }
    } else {
        let fixed = CODE_WIDTH + UNIT_WIDTH + 3 * NUMBER_WIDTH + 5 * 2;
        let description_width = width.saturating_sub(fixed).max(MIN_DESCRIPTION_WIDTH);

        let _ = writeln!(
            out,
            "{:<CODE_WIDTH$}  {:<description_width$}  {:<UNIT_WIDTH$}  {:>NUMBER_WIDTH$}  {:>NUMBER_WIDTH$}  {:>NUMBER_WIDTH$}",
            "Code", "Description", "Unit", "Quantity", "Price", "Total"
        );
        let rule = "─".repeat(fixed + description_width);
        let _ = writeln!(out, "{}", rule.dim());
        for item in items {
            let row = table_row(item, description_width, decimals);
            let row = if item.unresolved {
                row.warning()
            } else if item.is_header {
                row.info()
            } else {
                row
            };
            let _ = writeln!(out, "{row}");
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Total: {:.decimals$}", report.resolution.total());
    let _ = writeln!(out, "{}", diagnostics_line(&report.resolution));
    let _ = writeln!(out);
    out
}

fn table_row(item: &ResolvedLineItem, description_width: usize, decimals: usize) -> String {
    let code = truncate(
        &format!("{}{}", INDENT.repeat(item.depth), item.code),
        CODE_WIDTH,
    );
    let description = truncate(&item.description, description_width);
    let unit = truncate(&item.unit, UNIT_WIDTH);
    format!(
        "{code:<CODE_WIDTH$}  {description:<description_width$}  {unit:<UNIT_WIDTH$}  {:>NUMBER_WIDTH$.3}  {:>NUMBER_WIDTH$.decimals$}  {:>NUMBER_WIDTH$.decimals$}",
        item.resolved_quantity, item.unit_price, item.extended_total
    )
}

fn render_summary(report: &Report<'_>) -> String {
    let items = report.resolution.items();
    let unresolved = items.iter().filter(|item| item.unresolved).count();
    format!(
        "{}: items={} unresolved={unresolved} total={} ({})",
        report.source,
        items.len(),
        report.resolution.total(),
        report.resolution.diagnostic_summary()
    )
}

fn diagnostics_line(resolution: &Resolution) -> String {
    let summary = resolution.diagnostic_summary();
    if summary.is_empty() {
        summary.to_string().success()
    } else {
        summary.to_string().warning()
    }
}

#[cfg(test)]
mod tests {
    use bc3::parse;

    use super::*;

    fn input(text: &str) -> Input {
        Input {
            path: PathBuf::from("budget.bc3"),
            document: parse(text),
        }
    }

    const BUDGET: &str = concat!(
        "~V|ACME Builders|FIEBDC-3/2020|\n",
        "~C|R##||Office refurbishment||\n",
        "~C|E01#||Earthworks||\n",
        "~C|E01.1|m3|Excavation in trenches|12.5|\n",
        "~D|R|E01\\1\\|\n~D|E01|E01.1\\1\\|\n",
        "~M|E01\\E01.1||4||\n",
    );

    #[test]
    fn title_is_prefixed_with_owner() {
        assert_eq!(title(&parse(BUDGET)), "ACME Builders: Office refurbishment");
    }

    #[test]
    fn title_without_version_record() {
        assert_eq!(title(&parse("~C|R|||\n~T|R|Housing block|")), "Housing block");
        assert_eq!(title(&parse("~C|R|||")), "untitled budget");
    }

    #[test]
    fn table_indents_by_depth_and_ends_with_diagnostics() {
        let input = input(BUDGET);
        let resolution = resolve_with(&input.document, &ResolveOptions::default()).unwrap();
        let report = Report::new(&input, resolution);

        let table = render_table(&report, 120, false, 2);

        assert!(table.contains("Office refurbishment"));
        assert!(table.contains("    E01.1"));
        assert!(table.contains("Total: 50.00"));
        assert!(table.contains("no diagnostics"));
    }

    #[test]
    fn narrow_table_lists_code_and_total() {
        let input = input(BUDGET);
        let resolution = resolve_with(&input.document, &ResolveOptions::default()).unwrap();
        let report = Report::new(&input, resolution);

        let table = render_table(&report, 40, true, 2);

        assert!(table.contains("    E01.1  50.00"));
    }

    #[test]
    fn summary_reports_counts() {
        let input = input("~C|R|||\n~C|A|u|A|2|\n~D|R|A\\1\\\\X\\1\\|\n~M|A||3||");
        let resolution = resolve_with(&input.document, &ResolveOptions::default()).unwrap();
        let report = Report::new(&input, resolution);

        assert_eq!(
            render_summary(&report),
            "budget.bc3: items=3 unresolved=1 total=6 (1 dangling reference)"
        );
    }

    #[test]
    fn json_carries_items_and_diagnostics() {
        let input = input(BUDGET);
        let resolution = resolve_with(&input.document, &ResolveOptions::default()).unwrap();
        let json = Report::new(&input, resolution).to_json();

        assert_eq!(json["title"], "ACME Builders: Office refurbishment");
        assert_eq!(json["items"].as_array().map(Vec::len), Some(3));
        assert_eq!(json["items"][2]["code"], "E01.1");
        assert_eq!(json["summary"], "no diagnostics");
    }
}
