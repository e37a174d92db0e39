use std::{fmt::Write as _, path::PathBuf};

use bc3::{
    domain::DiagnosticSummary, resolve_with, Config, Diagnostic, DiagnosticKind, Document,
    ResolveOptions,
};
use clap::Parser;
use tracing::instrument;

use super::{input, terminal::Colorize};

const MAX_CYCLE_DISPLAY: usize = 5;

#[derive(Debug, Parser)]
pub struct Check {
    /// BC3 files, or directories to search for them
    #[arg(required = true, value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Only print the per-file summary line
    #[arg(long, short)]
    quiet: bool,
}

/// Problems found in one document.
struct Findings {
    diagnostics: Vec<Diagnostic>,
    cycles: Vec<Vec<String>>,
    empty: Option<String>,
}

impl Findings {
    fn collect(document: &Document, options: &ResolveOptions) -> Self {
        let (diagnostics, empty) = match resolve_with(document, options) {
            Ok(resolution) => (resolution.diagnostics().to_vec(), None),
            Err(error) => (document.diagnostics().to_vec(), Some(error.to_string())),
        };
        let cycles = document
            .cycles()
            .into_iter()
            .map(|cycle| cycle.into_iter().map(String::from).collect())
            .collect();
        Self {
            diagnostics,
            cycles,
            empty,
        }
    }

    fn count(&self) -> usize {
        self.diagnostics.len() + usize::from(self.empty.is_some())
    }
}

impl Check {
    #[instrument(level = "debug", skip_all)]
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let paths = input::collect_paths(&self.paths)?;
        let inputs = input::load(&paths, config)?;
        let options = ResolveOptions::from(config);

        let mut total = 0;
        for input in &inputs {
            let findings = Findings::collect(&input.document, &options);
            total += findings.count();
            print!(
                "{}",
                render(&input.path.display().to_string(), &findings, self.quiet)
            );
        }

        if total > 0 {
            std::process::exit(2);
        }
        Ok(())
    }
}

fn render(source: &str, findings: &Findings, quiet: bool) -> String {
    let mut out = String::new();
    let count = findings.count();
    let status = if count == 0 {
        format!("✓ {source}: no problems").success()
    } else {
        format!("✗ {source}: {count} problems").warning()
    };
    let _ = writeln!(out, "{status}");
    if quiet {
        return out;
    }

    if let Some(reason) = &findings.empty {
        let _ = writeln!(out, "  {}", reason.warning());
    }
    for diagnostic in &findings.diagnostics {
        let label = match diagnostic.kind {
            DiagnosticKind::MalformedRecord => "malformed",
            DiagnosticKind::DanglingReference => "dangling",
            DiagnosticKind::Cycle => "cycle",
            DiagnosticKind::Overflow => "overflow",
            DiagnosticKind::Truncated => "truncated",
        };
        let _ = writeln!(out, "  {:<10} {diagnostic}", label.dim());
    }

    if !findings.cycles.is_empty() {
        let _ = writeln!(out, "  Cycles: {}", findings.cycles.len().to_string().warning());
        for cycle in findings.cycles.iter().take(MAX_CYCLE_DISPLAY) {
            let _ = writeln!(out, "    - {}", cycle.join(" -> "));
        }
        if findings.cycles.len() > MAX_CYCLE_DISPLAY {
            let _ = writeln!(
                out,
                "    - ... and {} more cycles",
                findings.cycles.len() - MAX_CYCLE_DISPLAY
            );
        }
    }

    let summary = DiagnosticSummary::from_diagnostics(&findings.diagnostics);
    let _ = writeln!(out, "  {}", summary.to_string().dim());
    out
}

#[cfg(test)]
mod tests {
    use bc3::parse;

    use super::*;

    fn findings(text: &str) -> Findings {
        Findings::collect(&parse(text), &ResolveOptions::default())
    }

    #[test]
    fn clean_document_has_no_findings() {
        let findings = findings("~C|R|||\n~C|A|u|A|1|\n~D|R|A\\1\\|");
        assert_eq!(findings.count(), 0);
        assert!(render("ok.bc3", &findings, false).contains("ok.bc3: no problems"));
    }

    #[test]
    fn parse_and_resolution_problems_are_counted() {
        let findings = findings("~C|R|||\n~C||oops|\n~C|A|||\n~D|R|A\\1\\\\X\\1\\|\n~D|A|R\\1\\|");

        // R and A reference each other, so neither is a root
        assert_eq!(findings.cycles.len(), 1);
        assert!(findings.empty.is_some());
        assert_eq!(findings.count(), 2);

        let report = render("bad.bc3", &findings, false);
        assert!(report.contains("bad.bc3: 2 problems"));
        assert!(report.contains("- A -> R"));
        assert!(report.contains("no root concept was found"));
    }

    #[test]
    fn dangling_references_are_reported() {
        let findings = findings("~C|R|||\n~D|R|X99\\1\\|");
        assert_eq!(findings.count(), 1);

        let report = render("dangling.bc3", &findings, false);
        assert!(report.contains("record 1: R references X99 which has no concept record"));
        assert!(report.contains("1 dangling reference"));
    }

    #[test]
    fn truncated_resolution_is_a_problem() {
        let document = parse("~C|A|u|A|1|\n~C|B|u|B|1|");
        let options = ResolveOptions {
            max_items: 1,
            ..ResolveOptions::default()
        };
        let findings = Findings::collect(&document, &options);
        assert_eq!(findings.count(), 1);

        let report = render("large.bc3", &findings, false);
        assert!(report.contains("resolution stopped after 1 items"));
        assert!(report.contains("1 truncated resolution"));
    }

    #[test]
    fn quiet_prints_only_the_status_line() {
        let findings = findings("~C|R|||\n~D|R|X99\\1\\|");
        assert_eq!(render("dangling.bc3", &findings, true).lines().count(), 1);
    }
}
