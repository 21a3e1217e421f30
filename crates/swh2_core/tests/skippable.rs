mod common;

use common::{SaveBuilder, skippable_body, structured, tail};
use swh2_core::chunk::{FieldValue, Tag};
use swh2_core::layout::SectionId;
use swh2_core::scanner::ScanHit;
use swh2_core::swh2::HEADER_LEN;
use swh2_core::{ChunkRule, DecodeOptions, Document, FieldRule, Grammar};

fn decode_strict(bytes: &[u8]) -> Document {
    Document::decode_with(bytes, &Grammar::swh2(), DecodeOptions::strict())
        .unwrap_or_else(|e| panic!("save failed to decode: {e}"))
}

#[test]
fn section_body_is_untouched_by_primary_edits() {
    let mut b = SaveBuilder::new();
    structured(&mut b);
    b.section(&skippable_body());
    tail(&mut b);
    let mut doc = decode_strict(&b.finish());
    let body = doc.skippable().unwrap().blob().bytes().to_vec();
    assert_eq!(body, skippable_body().payload());

    doc.set_field("Head.location", FieldValue::text(&"x".repeat(200)))
        .unwrap();
    doc.set_field("Inve.hats[0]", FieldValue::text("hat_fancy"))
        .unwrap();
    let reread = decode_strict(&doc.encode().unwrap());

    let section = reread.skippable().unwrap();
    assert_eq!(section.blob().bytes(), body.as_slice());
    assert_eq!(section.blob().origin(), 0);
    let hits: Vec<_> = section.blob().strings().iter().map(|s| s.hit).collect();
    assert!(matches!(hits[0], ScanHit::Definition { origin: 3, .. }));
    assert!(matches!(hits[1], ScanHit::Reference { target: 3, .. }));
}

#[test]
fn same_text_in_both_scopes_stays_defined_in_each() {
    let mut body = SaveBuilder::section_body();
    body.u8(0x01).definition("outset_a").u8(0x02);

    let mut b = SaveBuilder::new();
    structured(&mut b);
    b.section(&body);
    tail(&mut b);
    let mut doc = decode_strict(&b.finish());

    let section = doc.skippable().unwrap();
    assert_eq!(section.strings().len(), 1);
    assert!(matches!(
        section.blob().strings()[0].hit,
        ScanHit::Definition { .. }
    ));

    // With the primary definition gone, nothing in the section may point out
    // of it and nothing outside may point in.
    doc.set_field("imh2.outset", FieldValue::text("outset_b"))
        .unwrap();
    let reread = decode_strict(&doc.encode().unwrap());
    let section = reread.skippable().unwrap();
    assert_eq!(section.blob().bytes(), body.payload());
    assert!(matches!(
        section.blob().strings()[0].hit,
        ScanHit::Definition { .. }
    ));
    assert_eq!(
        reread.get_field("imh2.outset").unwrap(),
        FieldValue::text("outset_b")
    );
}

#[test]
fn chunk_tag_after_anchor_is_not_a_section() {
    let mut b = SaveBuilder::new();
    structured(&mut b);
    tail(&mut b);
    let bytes = b.finish();

    let doc = decode_strict(&bytes);
    assert!(doc.skippable().is_none());
    assert!(doc.layout().section(SectionId::Skippable).is_none());
    assert_eq!(&doc.tail().bytes()[..4], b"CrLo");
}

#[test]
fn length_past_end_of_file_is_left_to_the_tail() {
    let mut b = SaveBuilder::new();
    structured(&mut b);
    b.varint(5_000).u8(0xF0).u8(0xF1);
    let bytes = b.finish();

    let doc = decode_strict(&bytes);
    assert!(doc.skippable().is_none());
    assert_eq!(doc.tail().len(), 4);
    assert_eq!(doc.encode().unwrap(), bytes);
}

#[test]
fn count_byte_after_anchor_is_not_mistaken_for_a_section() {
    // A loadout count of 16 followed by exactly 16 bytes, the first of them
    // a reference back into the structured chunks.
    let mut b = SaveBuilder::new();
    structured(&mut b);
    let count_at = b.position();
    b.u8(16);
    let reference_at = b.position();
    b.string("Rustwater");
    let used = b.position() - reference_at;
    b.bytes(&vec![0xF0; 16 - used]);
    let bytes = b.finish();

    let mut doc = decode_strict(&bytes);
    assert!(doc.skippable().is_none());
    assert_eq!(doc.tail().origin(), count_at);

    doc.set_field("imh2.outset", FieldValue::text(&"o".repeat(60)))
        .unwrap();
    let reread = decode_strict(&doc.encode().unwrap());
    let references: Vec<&[u8]> = reread
        .tail()
        .strings()
        .iter()
        .filter(|s| matches!(s.hit, ScanHit::Reference { .. }))
        .map(|s| reread.strings().text(s.id))
        .collect();
    assert_eq!(references, vec![b"Rustwater".as_slice()]);
}

#[test]
fn section_after_a_middle_chunk_stays_in_place() {
    let (first, second) = (Tag::new(*b"Aaaa"), Tag::new(*b"Bbbb"));
    let grammar = Grammar::new()
        .with_rule(ChunkRule::new(first, vec![FieldRule::u8("a")]))
        .with_rule(ChunkRule::new(second, vec![FieldRule::u8("b")]))
        .with_top_level([first, second])
        .with_skippable_after(first);

    let mut body = SaveBuilder::section_body();
    body.bytes(b"xyz");
    let mut b = SaveBuilder::new();
    b.tag(b"Aaaa").u8(1).section(&body).tag(b"Bbbb").u8(2);
    let bytes = b.finish();

    let mut doc = Document::decode_with(&bytes, &grammar, DecodeOptions::strict())
        .unwrap_or_else(|e| panic!("save failed to decode: {e}"));
    assert_eq!(doc.chunks().len(), 2);
    assert_eq!(doc.skippable().unwrap().blob().bytes(), b"xyz");
    assert!(doc.tail().is_empty());
    assert_eq!(doc.encode().unwrap(), bytes);

    doc.set_field("Bbbb.b", FieldValue::Int(7)).unwrap();
    let encoded = doc.encode().unwrap();
    assert_eq!(&encoded[HEADER_LEN + 5..HEADER_LEN + 9], b"\x03xyz");
    assert_eq!(&encoded[HEADER_LEN + 9..], b"Bbbb\x07");
}
