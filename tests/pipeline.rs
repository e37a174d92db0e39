//! End-to-end tests of the parse and resolve pipeline.

use std::str::FromStr;

use bc3::{
    domain::{EmptyReason, ResourceClass},
    format::tokenize,
    parse, parse_bytes, resolve, resolve_from, resolve_with, Code, ConceptKind, Config,
    DiagnosticKind, ParseOptions, ResolveError, ResolveOptions,
};
use rayon::prelude::*;
use rust_decimal::Decimal;
use test_case::test_case;

fn dec(value: &str) -> Decimal {
    Decimal::from_str(value).unwrap()
}

fn code(value: &str) -> Code {
    Code::new(value).unwrap()
}

/// A small but complete budget: two chapters of measured work items, one of
/// them repeated twice, and a hired machine measured in hours.
const BUDGET: &str = r"~V|ACME Builders|FIEBDC-3/2020\010120|Estimator 4.2|Housing block\|ANSI|Sample budget|
~K|\2\2\3\2\2\2\2\EUR\|
~C|OBRA##||Housing block||010124|0|
~C|C01#||Earthworks||010124|0|
~C|C02#||Structure||010124|0|
~C|E01.01|m3|Trench excavation|23.45|010124|0|
~C|E01.02|m2|Compaction|4.1|010124|0|
~C|E02.01|u|Precast footing|310|010124|0|
~C|MQ01|h|Backhoe|45|010124|2|
~D|OBRA|C01\1\\C02\1\|
~D|C01|E01.01\1\\E01.02\1\|
~D|C02|E02.01\2\\MQ01\1\|
~M|C01\E01.01|1|60|\Zone A\2\10\1.5\\\Zone B\1\8\1.5\\|
~M|C01\E01.02|2|40|\Slab\1\8\5\\|
~M|C02\E02.01|1|3||
~M|C02\MQ01|2|12||
~T|E01.01|Excavation of trenches in any kind of soil, by mechanical means.|
";

#[test_case("~C|A|u|Alpha|1|"; "concept")]
#[test_case("~D|A|B\\2\\\\C\\1\\1.5\\|"; "decomposition")]
#[test_case("~M|A\\B|1|30|\\Zone\\2\\3\\5\\\\|"; "measurement")]
#[test_case("~T|A|Some | text|"; "text with pipe")]
fn tokenizing_is_lossless(text: &str) {
    let records = tokenize(text);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].to_text(), &text[1..]);
}

#[test]
fn later_concept_records_win() {
    let document = parse("~C|A|u|Alpha|1|\n~C|A|u|Alpha|2|");
    assert_eq!(document.concept("A").unwrap().unit_price(), dec("2"));
}

#[test]
fn quantities_multiply_along_the_path() {
    let document = parse(concat!(
        "~C|R|||\n~C|A|||\n~C|B|u|B|1|\n",
        "~D|R|A\\2.0\\|\n~D|A|B\\3.0\\|\n~M|A\\B||5||",
    ));
    let resolution = resolve(&document).unwrap();

    let b = resolution.items().iter().find(|item| item.code.as_str() == "B").unwrap();
    assert_eq!(b.resolved_quantity, dec("30.0"));
}

#[test]
fn cycles_terminate_with_one_item_each() {
    let document = parse("~C|A|||\n~C|B|||\n~D|A|B\\1\\|\n~D|B|A\\1\\|");
    let resolution = resolve_from(&document, &[code("A")], &ResolveOptions::default()).unwrap();

    let codes: Vec<_> = resolution.items().iter().map(|item| item.code.as_str()).collect();
    assert_eq!(codes, ["A", "B"]);
    assert_eq!(resolution.diagnostic_summary().count(DiagnosticKind::Cycle), 1);
    assert_eq!(document.cycles(), [vec![code("A"), code("B")]]);
}

#[test]
fn dangling_references_do_not_raise() {
    let document = parse("~C|R|||\n~D|R|X99\\1\\|");
    let resolution = resolve(&document).unwrap();

    let placeholder = &resolution.items()[1];
    assert_eq!(placeholder.code.as_str(), "X99");
    assert_eq!(placeholder.description, "unresolved reference");
    assert_eq!(placeholder.unit_price, Decimal::ZERO);
    assert_eq!(placeholder.resolved_quantity, Decimal::ZERO);
    assert_eq!(
        resolution.diagnostic_summary().count(DiagnosticKind::DanglingReference),
        1
    );
}

#[test]
fn subtrees_follow_decomposition_order() {
    let document = parse(concat!(
        "~C|R|||\n~C|A|||\n~C|B|||\n~C|C|||\n~C|A1|||\n~C|B1|||\n~C|B2|||\n~C|C1|||\n",
        "~D|R|B\\1\\\\A\\1\\\\C\\1\\|\n",
        "~D|A|A1\\1\\|\n~D|B|B1\\1\\\\B2\\1\\|\n~D|C|C1\\1\\|",
    ));
    let resolution = resolve(&document).unwrap();

    let codes: Vec<_> = resolution.items().iter().map(|item| item.code.as_str()).collect();
    assert_eq!(codes, ["R", "B", "B1", "B2", "A", "A1", "C", "C1"]);
}

#[test_case(""; "empty string")]
#[test_case("~~~|||~\n~"; "only separators")]
fn empty_input_cannot_be_resolved(text: &str) {
    let document = parse(text);
    assert_eq!(document.concept_count(), 0);
    assert_eq!(
        resolve(&document).unwrap_err(),
        ResolveError::EmptyDocument(EmptyReason::NoConcepts)
    );
}

#[test]
fn sample_budget_resolves() {
    let document = parse(BUDGET);

    assert!(document.diagnostics().is_empty());
    assert_eq!(document.version().unwrap().owner, "ACME Builders");
    assert_eq!(document.roots(), [code("OBRA")]);
    assert_eq!(document.concept("C01").unwrap().kind(), ConceptKind::Chapter);
    assert_eq!(document.concept("E01.01").unwrap().kind(), ConceptKind::SimpleItem);
    assert_eq!(
        document.concept("MQ01").unwrap().resource_class(),
        Some(ResourceClass::Machinery)
    );

    let resolution = resolve(&document).unwrap();
    let rows: Vec<_> = resolution
        .items()
        .iter()
        .map(|item| (item.code.as_str(), item.depth, item.is_header))
        .collect();
    assert_eq!(
        rows,
        [
            ("OBRA", 0, true),
            ("C01", 1, true),
            ("E01.01", 2, false),
            ("E01.02", 2, false),
            ("C02", 1, true),
            ("E02.01", 2, false),
            ("MQ01", 2, false),
        ]
    );

    let excavation = &resolution.items()[2];
    // 2 × 10 × 1.5 + 1 × 8 × 1.5
    assert_eq!(excavation.resolved_quantity, dec("42"));
    assert_eq!(excavation.extended_total, dec("984.90"));
    assert_eq!(
        excavation.description,
        "Excavation of trenches in any kind of soil, by mechanical means."
    );

    let footing = &resolution.items()[5];
    assert_eq!(footing.resolved_quantity, dec("6"));
    assert_eq!(footing.ancestor_chain, [code("OBRA"), code("C02")]);

    assert_eq!(resolution.total(), dec("3548.90"));
}

#[test]
fn oversized_numbers_saturate_and_are_reported() {
    let document = parse(concat!(
        "~C|R|||\n~C|A|u|A|1|\n~C|L|u|L|1|\n",
        "~D|R|A\\79228162514264337593543950335\\2\\\\L\\1\\|\n",
        "~M|R\\L|||\\a\\79228162514264337593543950335\\2\\\\\\|\n",
    ));
    let resolution = resolve(&document).unwrap();

    let summary = resolution.diagnostic_summary();
    assert!(summary.count(DiagnosticKind::Overflow) >= 2);
    assert_eq!(resolution.items()[2].resolved_quantity, Decimal::MAX);
}

#[test]
fn doubling_layers_are_bounded_by_default() {
    let mut text: String = (0..18)
        .map(|layer| {
            let next = layer + 1;
            format!("~C|N{layer}|||\n~D|N{layer}|N{next}\\1\\\\N{next}\\1\\|\n")
        })
        .collect();
    text.push_str("~C|N18|u|Leaf|1|\n");

    let resolution = resolve(&parse(&text)).unwrap();

    assert_eq!(
        resolution.items().len(),
        bc3::domain::resolve::DEFAULT_MAX_ITEMS
    );
    assert_eq!(resolution.diagnostic_summary().count(DiagnosticKind::Truncated), 1);
}

#[test]
fn latin1_bytes_and_configured_options() {
    let config: Config = toml::from_str(
        "_version = \"1\"\ndecimals = 0\nplaceholder_description = \"missing concept\"\n",
    )
    .unwrap();

    let mut options = ParseOptions::from(&config);
    options.source = Some("obra.bc3".to_owned());
    let document = parse_bytes(
        b"~C|R||Reforma||\n~C|A|m2|Alicatado cer\xe1mico|10.6|\n~D|R|A\\1\\\\Z\\1\\|\n~M|R\\A||1||",
        &options,
    );
    assert_eq!(document.concept("A").unwrap().description(), "Alicatado cerámico");

    let resolution = resolve_with(&document, &ResolveOptions::from(&config)).unwrap();
    assert_eq!(resolution.items()[1].extended_total, dec("11"));
    assert_eq!(resolution.items()[2].description, "missing concept");
}

#[test]
fn documents_resolve_independently_in_parallel() {
    let texts: Vec<String> = (1..=16)
        .map(|price| format!("~C|R|||\n~C|A|u|A|{price}|\n~D|R|A\\2\\|\n~M|R\\A||3||"))
        .collect();

    let totals: Vec<Decimal> = texts
        .par_iter()
        .map(|text| resolve(&parse(text)).unwrap().total())
        .collect();

    let expected: Vec<Decimal> = (1..=16).map(|price| Decimal::from(price * 6)).collect();
    assert_eq!(totals, expected);
}
