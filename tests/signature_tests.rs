use std::collections::BTreeSet;

use bookcover::dom::snapshot::NodeSnapshot;
use bookcover::signature::candidates::candidates_of;
use bookcover::signature::fingerprint::{pagelet_prefix, signature_of, text_fingerprint};
use bookcover::signature::signature_model::SignatureRules;

use crate::common::{first, suggested_blocks};

mod common;

fn keywords(words: &[&str]) -> BTreeSet<String> {
    words.iter().map(|w| w.to_string()).collect()
}

// ============================================================================
// Signatures
// ============================================================================

#[test]
fn text_does_not_affect_signature() {
    let doc = suggested_blocks(2);
    let blocks = doc.query_selector_all(r#"[role="article"]"#).unwrap();
    let rules = SignatureRules::default();

    let a = signature_of(&doc, blocks[0], &rules);
    let b = signature_of(&doc, blocks[1], &rules);

    assert_ne!(doc.text_content(blocks[0]), doc.text_content(blocks[1]));
    assert_eq!(a, b);
    assert_eq!(a.digest(), b.digest());
}

#[test]
fn id_is_not_part_of_default_signature() {
    let doc = NodeSnapshot::new("body")
        .child(NodeSnapshot::new("div").attr("role", "region").attr("id", "a1"))
        .child(NodeSnapshot::new("div").attr("role", "region").attr("id", "b2"))
        .into_document();
    let nodes = doc.query_selector_all("div").unwrap();

    let rules = SignatureRules::default();
    assert_eq!(
        signature_of(&doc, nodes[0], &rules),
        signature_of(&doc, nodes[1], &rules)
    );

    let with_id = SignatureRules::with_attributes(&["role", "ID"]);
    assert_ne!(
        signature_of(&doc, nodes[0], &with_id),
        signature_of(&doc, nodes[1], &with_id)
    );
}

#[test]
fn class_order_and_pagelet_index_are_normalized() {
    let doc = NodeSnapshot::new("body")
        .child(
            NodeSnapshot::new("div")
                .attr("class", "b a")
                .attr("data-pagelet", "FeedUnit_3"),
        )
        .child(
            NodeSnapshot::new("div")
                .attr("class", "a  b")
                .attr("data-pagelet", "FeedUnit_17"),
        )
        .into_document();
    let nodes = doc.query_selector_all("div").unwrap();
    let rules = SignatureRules::default();

    let a = signature_of(&doc, nodes[0], &rules);
    assert_eq!(a, signature_of(&doc, nodes[1], &rules));
    assert_eq!(a.attributes["class"], "a b");
    assert_eq!(a.attributes["data-pagelet"], "FeedUnit_");
}

#[test]
fn child_shape_distinguishes_signatures() {
    let doc = NodeSnapshot::new("body")
        .child(
            NodeSnapshot::new("div")
                .attr("role", "article")
                .child(NodeSnapshot::new("span")),
        )
        .child(
            NodeSnapshot::new("div")
                .attr("role", "article")
                .child(NodeSnapshot::new("span").attr("class", "x")),
        )
        .into_document();
    let nodes = doc.query_selector_all(r#"[role="article"]"#).unwrap();
    let rules = SignatureRules::default();

    assert_ne!(
        signature_of(&doc, nodes[0], &rules),
        signature_of(&doc, nodes[1], &rules)
    );
}

#[test]
fn key_is_canonical() {
    let doc = NodeSnapshot::new("body")
        .child(
            NodeSnapshot::new("DIV")
                .attr("role", "region")
                .attr("aria-label", "Reels")
                .child(NodeSnapshot::new("span").attr("class", "b a"))
                .child(NodeSnapshot::new("a")),
        )
        .into_document();
    let node = first(&doc, "div");
    let signature = signature_of(&doc, node, &SignatureRules::default());

    assert_eq!(
        signature.key(),
        r#"<div aria-label="Reels" role="region">[span.a.b][a]"#
    );
    assert_eq!(signature.digest(), text_fingerprint(&signature.key()));
    assert_eq!(signature.digest().len(), 40);
}

#[test]
fn pagelet_prefix_strips_trailing_digits() {
    assert_eq!(pagelet_prefix("FeedUnit_42"), "FeedUnit_");
    assert_eq!(pagelet_prefix("Stories"), "Stories");
    assert_eq!(pagelet_prefix(" Reels2 "), "Reels");
}

#[test]
fn fingerprint_is_stable() {
    assert_eq!(
        text_fingerprint("abc"),
        "a9993e364706816aba3e25717850c26c9cd0d89d"
    );
}

// ============================================================================
// Candidates
// ============================================================================

#[test]
fn candidates_need_marker_and_keyword() {
    let doc = NodeSnapshot::new("body")
        // marker + keyword in text
        .child(
            NodeSnapshot::new("div")
                .attr("role", "article")
                .text("Suggested for You"),
        )
        // keyword in marker value
        .child(NodeSnapshot::new("div").attr("aria-label", "Reels and short videos"))
        // keyword but no marker
        .child(NodeSnapshot::new("div").attr("class", "x").text("suggested"))
        // marker but no keyword
        .child(NodeSnapshot::new("div").attr("role", "banner").text("Home"))
        .into_document();

    let found: Vec<_> = candidates_of(&doc, &keywords(&["suggested", "reels"])).collect();

    assert_eq!(found.len(), 2);
    assert_eq!(doc.attribute(found[0], "role"), Some("article"));
    assert!(doc.attribute(found[1], "aria-label").is_some());
}

#[test]
fn candidates_follow_document_changes() {
    let mut doc = suggested_blocks(3);
    let words = keywords(&["suggested"]);
    assert_eq!(candidates_of(&doc, &words).count(), 3);

    let victim = first(&doc, r#"[role="article"]"#);
    doc.remove(victim);
    assert_eq!(candidates_of(&doc, &words).count(), 2);
}

#[test]
fn no_keywords_no_candidates() {
    let doc = suggested_blocks(2);
    assert_eq!(candidates_of(&doc, &BTreeSet::new()).count(), 0);
}
