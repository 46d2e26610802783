use archival_automation::classify::{classify, DialogKind, LinkCount};

#[test]
fn count_before_phrase() {
    let out = classify("2 links are missing.");
    assert_eq!(out.kind, DialogKind::MissingLinks);
    assert_eq!(out.count, Some(LinkCount::Known(2)));
}

#[test]
fn count_after_contains() {
    let out = classify("This document contains 12 missing links. Use the Links panel to update them.");
    assert_eq!(out.kind, DialogKind::MissingLinks);
    assert_eq!(out.count, Some(LinkCount::Known(12)));
}

#[test]
fn singular_phrase_is_recognised() {
    let out = classify("1 link is missing");
    assert_eq!(out.kind, DialogKind::MissingLinks);
    assert_eq!(out.count, Some(LinkCount::Known(1)));
}

#[test]
fn marker_without_number_is_unknown_not_zero() {
    for text in [
        "This document contains missing links.",
        "Some links are missing",
        "This document contains several missing links",
        "Missing Links",
    ] {
        let out = classify(text);
        assert_eq!(out.kind, DialogKind::MissingLinks, "{text}");
        assert_eq!(out.count, Some(LinkCount::Unknown), "{text}");
    }
}

#[test]
fn case_and_spacing_do_not_matter() {
    let out = classify("  3   LINKS\nARE   Missing  ");
    assert_eq!(out.kind, DialogKind::MissingLinks);
    assert_eq!(out.count, Some(LinkCount::Known(3)));
}

#[test]
fn fullwidth_digits_are_normalised() {
    let out = classify("\u{FF14} links are missing");
    assert_eq!(out.count, Some(LinkCount::Known(4)));
}

#[test]
fn fonts_only() {
    let out = classify("The document uses one or more missing fonts.");
    assert_eq!(out.kind, DialogKind::MissingFonts);
    assert_eq!(out.count, None);
}

#[test]
fn links_win_over_fonts() {
    let out = classify("Missing fonts and 6 links are missing");
    assert_eq!(out.kind, DialogKind::MissingLinks);
    assert_eq!(out.count, Some(LinkCount::Known(6)));
}

#[test]
fn no_marker_is_none() {
    for text in ["", "Save changes before closing?", "contains 5 pages"] {
        let out = classify(text);
        assert_eq!(out.kind, DialogKind::None, "{text:?}");
        assert_eq!(out.count, None);
    }
}

#[test]
fn negative_or_fractional_counts_are_unknown() {
    assert_eq!(classify("-2 links are missing").count, Some(LinkCount::Unknown));
    assert_eq!(classify("contains 2.5 missing links").count, Some(LinkCount::Unknown));
}

#[test]
fn classification_is_idempotent() {
    let text = "This document contains 3 missing links.";
    let first = classify(text);
    assert_eq!(classify(text), first);
    assert_eq!(classify(&first.raw_text), first);
}

#[test]
fn unknown_count_renders_as_word() {
    assert_eq!(LinkCount::Unknown.to_string(), "unknown");
    assert_eq!(LinkCount::Known(9).to_string(), "9");
}

#[test]
fn unrelated_contains_does_not_supply_the_count() {
    let out = classify("Folder contains 2 pages. 5 links are missing");
    assert_eq!(out.count, Some(LinkCount::Known(5)));

    let out = classify("This book contains 40 pages and 1 link is missing");
    assert_eq!(out.count, Some(LinkCount::Known(1)));
}

#[test]
fn count_next_to_any_marker_form() {
    for (text, n) in [
        ("3 missing links", 3),
        ("The document has 3 missing links.", 3),
        ("Links are missing: 3", 3),
        ("Missing links: 4", 4),
        ("1 missing link", 1),
    ] {
        assert_eq!(classify(text).count, Some(LinkCount::Known(n)), "{text}");
    }
}

#[test]
fn count_does_not_cross_a_sentence_end() {
    let out = classify("The document has missing links. 2 images were updated.");
    assert_eq!(out.count, Some(LinkCount::Unknown));
}
