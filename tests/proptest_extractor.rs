//! Property-based tests with proptest.
//!
//! Generate small source files out of single-line statements and
//! multi-line literals, then check the laws extraction must obey for every
//! line: the result is a contiguous run of the file's lines, it respects
//! the line limit, and a limit of one is the same as reading the line.

use proptest::prelude::*;
use snippet_rs::{SnippetExtractor, SourceFile};

// -- Source strategies --

/// Variable name that cannot collide with a keyword.
fn var_name() -> impl Strategy<Value = String> {
    "[a-z]{1,6}".prop_map(|s| format!("v_{s}"))
}

fn single_line_statement() -> impl Strategy<Value = String> {
    prop_oneof![
        (var_name(), 0..1000u32).prop_map(|(name, n)| format!("{name} = {n}")),
        (var_name(), var_name()).prop_map(|(a, b)| format!("{a}.{b}(1, :sym)")),
        var_name().prop_map(|name| format!("expect({name}).to eq(\"ok\")")),
        Just("# a comment".to_string()),
        Just(String::new()),
    ]
}

fn multi_line_statement() -> impl Strategy<Value = String> {
    prop_oneof![
        (var_name(), prop::collection::vec(0..100u32, 0..4)).prop_map(|(name, items)| {
            let mut text = format!("{name} = [\n");
            for item in items {
                text.push_str(&format!("  {item},\n"));
            }
            text.push(']');
            text
        }),
        (var_name(), var_name()).prop_map(|(a, b)| format!("{a} = {b}\n  .first\n  .last")),
        var_name().prop_map(|name| format!("{name} = <<~EOS\n  body\nEOS")),
        var_name().prop_map(|name| format!("it(\"works\") do\n  {name} = 1\nend")),
    ]
}

fn source_text() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![single_line_statement(), multi_line_statement()],
        1..8,
    )
    .prop_map(|statements| statements.join("\n") + "\n")
}

fn extractor_for(text: &str) -> SnippetExtractor {
    let extractor = SnippetExtractor::new();
    extractor
        .provider()
        .insert(SourceFile::from_source("prop.rb", text));
    extractor
}

fn is_contiguous_run(lines: &[String], of: &[&str]) -> bool {
    !lines.is_empty()
        && of
            .windows(lines.len())
            .any(|window| window.iter().zip(lines).all(|(a, b)| *a == b.as_str()))
}

// -- Properties --

proptest! {
    #[test]
    fn result_is_contiguous_lines_of_the_file(text in source_text()) {
        let extractor = extractor_for(&text);
        let file_lines: Vec<&str> = text.lines().collect();

        for line in 1..=file_lines.len() {
            let lines = extractor
                .extract_expression_lines_at("prop.rb", line, None)
                .expect("line exists");
            prop_assert!(
                is_contiguous_run(&lines, &file_lines),
                "line {}: {:?} is not a run of\n{}", line, lines, text
            );
        }
    }

    #[test]
    fn line_limit_is_respected(text in source_text(), limit in 0usize..5) {
        let extractor = extractor_for(&text);
        let line_count = text.lines().count();

        for line in 1..=line_count {
            let lines = extractor
                .extract_expression_lines_at("prop.rb", line, Some(limit))
                .expect("line exists");
            prop_assert!(!lines.is_empty());
            prop_assert!(lines.len() <= limit.max(1));
        }
    }

    #[test]
    fn limit_of_one_reads_the_line(text in source_text()) {
        let extractor = extractor_for(&text);
        let file_lines: Vec<&str> = text.lines().collect();

        for (index, expected) in file_lines.iter().enumerate() {
            let line = index + 1;
            let single = extractor
                .extract_expression_lines_at("prop.rb", line, Some(1))
                .expect("line exists");
            prop_assert_eq!(&single, &vec![(*expected).to_string()]);
            prop_assert_eq!(
                extractor.extract_line_at("prop.rb", line).expect("line exists"),
                *expected
            );
        }
    }

    #[test]
    fn assignments_on_their_own_line_extract_alone(
        names in prop::collection::vec(var_name(), 1..10),
    ) {
        let text: String = names
            .iter()
            .enumerate()
            .map(|(i, name)| format!("{name} = {i}\n"))
            .collect();
        let extractor = extractor_for(&text);

        for (index, expected) in text.lines().enumerate() {
            let lines = extractor
                .extract_expression_lines_at("prop.rb", index + 1, None)
                .expect("line exists");
            prop_assert_eq!(lines, vec![expected.to_string()]);
        }
    }
}
