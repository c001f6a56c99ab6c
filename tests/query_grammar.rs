// tests/query_grammar.rs
use article_archive::error::QuerySyntaxKind;
use article_archive::query::Query;

fn q(s: &str) -> Query {
    Query::parse(s).unwrap_or_else(|e| panic!("{s:?} should parse: {e}"))
}

#[test]
fn precedence_matches_the_documented_grouping() {
    assert!(q("a and b or c").matches("c"));
    assert!(!q("a and (b or c)").matches("c"));
    assert_eq!(q("a and b or c").expr(), q("(a and b) or c").expr());
}

#[test]
fn operator_words_inside_literals_are_literal() {
    for (query, hay, expect) in [
        ("android", "Android 15 preview", true),
        ("android", "and roid", false),
        ("sandor", "Sandor's notes", true),
        ("brand or orchid", "new orchid", true),
    ] {
        assert_eq!(q(query).matches(hay), expect, "{query:?} vs {hay:?}");
    }
}

#[test]
fn uppercase_operators_are_operators() {
    assert!(q("Rust AND Tokio").matches("tokio for rust"));
    assert!(q("rust OR go").matches("Go generics"));
}

#[test]
fn errors_report_the_offending_position() {
    let cases = [
        ("((a)", QuerySyntaxKind::UnmatchedOpen, 0),
        ("a) or (b", QuerySyntaxKind::UnmatchedClose, 1),
        ("()", QuerySyntaxKind::EmptyGroup, 0),
        ("a or", QuerySyntaxKind::MissingOperand, 4),
        ("and", QuerySyntaxKind::MissingOperand, 0),
        ("(a)(b)", QuerySyntaxKind::MissingOperator, 3),
    ];
    for (raw, kind, position) in cases {
        let e = Query::parse(raw).unwrap_err();
        assert_eq!((e.kind, e.position), (kind, position), "{raw:?}");
    }
}

#[test]
fn blank_query_is_match_all() {
    let all = q("   ");
    assert!(all.is_match_all());
    assert!(all.matches("anything"));
}
