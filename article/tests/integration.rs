use article::{Block, Document, ParseErrorKind, Parser, Span};
use chrono::NaiveDate;

fn parse(source: &str) -> Document {
    Parser::new(source.to_string(), 0).parse().expect("parse failed")
}

fn parse_err(source: &str) -> ParseErrorKind {
    Parser::new(source.to_string(), 0)
        .parse()
        .expect_err("parse should fail")
        .kind
}

const HEADER: &str = "+++\ntitle = \"Hello\"\nslug = \"hello\"\ndate = \"2024-08-20\"\n+++\n";

#[test]
fn hello_scenario() {
    let doc = parse(
        "+++\ntitle = \"Hello\"\nslug = \"hello\"\ndate = \"2024-08-20\"\n+++\n# Heading One\nSome **bold** text with `code`.\n",
    );
    assert_eq!(doc.title(), "Hello");
    assert_eq!(doc.slug(), "hello");
    assert_eq!(doc.date(), NaiveDate::from_ymd_opt(2024, 8, 20).unwrap());
    assert_eq!(doc.description(), None);
    assert_eq!(
        doc.blocks(),
        &[
            Block::Heading {
                level: 1,
                text: "Heading One".into()
            },
            Block::Paragraph {
                spans: vec![
                    Span::text("Some "),
                    Span::emphasis("bold", true),
                    Span::text(" text with "),
                    Span::code("code"),
                    Span::text("."),
                ]
            },
        ]
    );
}

#[test]
fn missing_slug_is_reported_by_name() {
    let err = parse_err("+++\ntitle = \"Hello\"\ndate = \"2024-08-20\"\n+++\nbody\n");
    assert_eq!(
        err,
        ParseErrorKind::MissingMetadata {
            key: "slug".into()
        }
    );
}

#[test]
fn first_absent_key_wins() {
    let err = parse_err("+++\ndescription = \"only this\"\n+++\n");
    assert_eq!(
        err,
        ParseErrorKind::MissingMetadata {
            key: "title".into()
        }
    );
}

#[test]
fn no_header_means_missing_title() {
    let err = parse_err("# Just a heading\n");
    assert_eq!(
        err,
        ParseErrorKind::MissingMetadata {
            key: "title".into()
        }
    );
}

#[test]
fn header_only_yields_empty_blocks() {
    let doc = parse(HEADER);
    assert!(doc.is_empty());
    let doc = parse(&format!("{}\n   \n\n", HEADER));
    assert!(doc.blocks().is_empty());
}

#[test]
fn unclosed_header_is_malformed() {
    let err = parse_err("+++\ntitle = \"Hello\"\nslug = \"hello\"\n# Body\n");
    assert_eq!(err, ParseErrorKind::MalformedHeader);
}

#[test]
fn backticks_closed_by_tildes_are_unterminated() {
    let err = parse_err(&format!("{}```cpp\nint main() {{}}\n~~~\n", HEADER));
    assert_eq!(
        err,
        ParseErrorKind::UnterminatedFence {
            marker: "```".into()
        }
    );
}

#[test]
fn non_blank_body_yields_blocks() {
    for body in ["x", "# h", "- item", "> q", "***", "```\n```"] {
        let doc = parse(&format!("{}{}\n", HEADER, body));
        assert!(!doc.blocks().is_empty(), "no blocks for {:?}", body);
    }
}

#[test]
fn code_fence_round_trips_byte_for_byte() {
    let fenced = "template <typename ExPolicy>\nauto f = \"`**x**`\";\n# not a heading\r\n\n  - [link](nope)\n";
    let doc = parse(&format!("{}~~~~cpp\n{}~~~~\nafter\n", HEADER, fenced));
    match &doc.blocks()[0] {
        Block::CodeFence { language, raw_text } => {
            assert_eq!(language.as_deref(), Some("cpp"));
            assert_eq!(raw_text, fenced);
        }
        other => panic!("expected code fence, got {:?}", other),
    }
    assert_eq!(
        doc.blocks()[1],
        Block::Paragraph {
            spans: vec![Span::text("after")]
        }
    );
}

#[test]
fn parsing_is_idempotent() {
    let source = format!(
        "{}## Intro\n\nText with *emphasis* and [a link](https://example.org).\n\n1. one\n2. two\n\n---\n",
        HEADER
    );
    assert_eq!(parse(&source), parse(&source));
}

#[test]
fn source_id_does_not_affect_equality() {
    let a = Parser::new(HEADER.to_string(), 1).parse().unwrap();
    let b = Parser::new(HEADER.to_string(), 2).parse().unwrap();
    assert_eq!(a.source_id(), 1);
    assert_eq!(a, b);
}

#[test]
fn lone_link_paragraph_becomes_link_block() {
    let doc = parse(&format!(
        "{}[HPX on GitHub](https://github.com/STEllAR-GROUP/hpx)\n",
        HEADER
    ));
    assert_eq!(
        doc.blocks(),
        &[Block::Link {
            text: "HPX on GitHub".into(),
            url: "https://github.com/STEllAR-GROUP/hpx".into()
        }]
    );
}

#[test]
fn lists_keep_order_kind_and_depth() {
    let doc = parse(&format!("{}- a\n  - b\n1. c\n", HEADER));
    let items: Vec<(bool, u8, Option<u64>)> = doc
        .blocks()
        .iter()
        .map(|b| match b {
            Block::ListItem {
                ordered,
                depth,
                number,
                ..
            } => (*ordered, *depth, *number),
            other => panic!("expected list item, got {:?}", other),
        })
        .collect();
    assert_eq!(items, vec![(false, 0, None), (false, 1, None), (true, 0, Some(1))]);
}

#[test]
fn description_and_unknown_keys_are_kept() {
    let doc = parse(
        "+++\ntitle = \"GSoC\"\nslug = \"gsoc-2024\"\ndate = 2024-08-20\ndescription = \"Final report\"\n\n[taxonomies]\ntags = [\"hpx\", \"gsoc\"]\n+++\n",
    );
    assert_eq!(doc.description(), Some("Final report"));
    assert_eq!(doc.date(), NaiveDate::from_ymd_opt(2024, 8, 20).unwrap());
    let tags = doc.extra()["taxonomies"]["tags"].as_array().unwrap();
    assert_eq!(tags.len(), 2);
    assert!(!doc.extra().contains_key("title"));
}

#[test]
fn slug_with_whitespace_is_rejected() {
    let err = parse_err("+++\ntitle = \"T\"\nslug = \"two words\"\ndate = \"2024-08-20\"\n+++\n");
    assert_eq!(
        err,
        ParseErrorKind::InvalidSlug {
            value: "two words".into()
        }
    );
}

#[test]
fn unparseable_date_is_rejected() {
    let err = parse_err("+++\ntitle = \"T\"\nslug = \"t\"\ndate = \"last summer\"\n+++\n");
    assert_eq!(
        err,
        ParseErrorKind::InvalidDate {
            value: "last summer".into()
        }
    );
}

#[test]
fn error_spans_point_into_source() {
    let source = format!("{}text\n\n```rust\nfn main() {{}}\n", HEADER);
    let err = Parser::new(source.clone(), 7).parse().unwrap_err();
    assert_eq!(err.file_id, 7);
    assert_eq!(&source[err.span.clone()], "```rust");
    assert!(!err.to_diagnostic().notes.is_empty());
}

#[test]
fn display_reparses_to_the_same_document() {
    let source = format!(
        "{}# Title\n\nSome **bold**, *em* and `code` with [link](https://x.org).\n\n- one\n  - two\n\n> quoted\n\n```cpp\nint x = 1;\n```\n\n---\n",
        HEADER
    );
    let doc = parse(&source);
    assert_eq!(parse(&doc.to_string()), doc);
}

#[test]
fn display_keeps_literal_markers_literal() {
    let source = format!(
        "{}\\*not emphasis\\* and 1\\. x\n\n\\# not heading\n\n1\\) not a list\nsnake_case and a < b and 2 * 3\n\n- item with \\`ticks\\`\n",
        HEADER
    );
    let doc = parse(&source);
    assert!(
        doc.blocks()
            .iter()
            .flat_map(|b| b.spans())
            .all(|s| matches!(s, Span::Text { .. }))
    );
    assert_eq!(doc.blocks().len(), 4);
    assert_eq!(parse(&doc.to_string()), doc);
}

#[test]
fn outline_anchors_never_collide() {
    let doc = parse(&format!("{}## Results\n\n## Results\n\n## Results 1\n\n## !!!\n", HEADER));
    let anchors: Vec<String> = doc.outline().into_iter().map(|e| e.anchor).collect();
    assert_eq!(anchors, vec!["results", "results-1", "results-1-1", "section"]);
}

#[test]
fn unquoted_header_date_is_accepted() {
    let doc = parse("+++\ntitle = \"T\"\nslug = \"t\"\ndate = 2024-08-20T09:00:00Z\n+++\n");
    assert_eq!(doc.date(), NaiveDate::from_ymd_opt(2024, 8, 20).unwrap());
}

#[test]
fn documents_parse_independently_across_threads() {
    let source = format!("{}# Parallel\n\nbody text\n", HEADER);
    let expected = parse(&source);
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|id| {
                let source = source.clone();
                scope.spawn(move || Parser::new(source, id).parse().unwrap())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    });
}
