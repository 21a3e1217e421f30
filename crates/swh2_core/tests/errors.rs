mod common;

use common::{SaveBuilder, head, imh2, standard_save};
use swh2_core::chunk::Tag;
use swh2_core::{
    ChecksumStatus, ChunkRule, DecodeOptions, Document, FieldRule, Grammar, SaveError,
};

fn single_field(rule: FieldRule) -> Grammar {
    let head = Tag::new(*b"Head");
    Grammar::new()
        .with_rule(ChunkRule::new(head, vec![rule]))
        .with_top_level([head])
}

#[test]
fn bad_magic_is_rejected_with_what_was_found() {
    let mut bytes = standard_save();
    bytes[..4].copy_from_slice(b"SWH1");

    let err = Document::decode(&bytes).unwrap_err();
    assert_eq!(
        err,
        SaveError::BadMagic {
            found: "SWH1".to_string()
        }
    );

    // Strict mode still reports the magic first.
    bytes[..4].copy_from_slice(b"XXXX");
    assert_eq!(
        Document::decode_with(&bytes, &Grammar::swh2(), DecodeOptions::strict()).unwrap_err(),
        SaveError::BadMagic {
            found: "XXXX".to_string()
        }
    );
    assert!(matches!(
        Document::decode(b"SW"),
        Err(SaveError::BadMagic { .. })
    ));
}

#[test]
fn newer_versions_are_refused() {
    let mut bytes = standard_save();
    bytes[4] = 2;
    assert_eq!(
        Document::decode(&bytes).unwrap_err(),
        SaveError::UnsupportedVersion { found: 2, max: 1 }
    );
}

#[test]
fn checksum_mismatch_is_a_warning_unless_strict() {
    let mut b = SaveBuilder::new();
    common::structured(&mut b);
    let good = b.finish();
    let bad = b.finish_with_checksum(0x1234_5678);
    let computed = u32::from_le_bytes(good[5..9].try_into().unwrap());

    let doc = Document::decode(&bad).unwrap();
    assert_eq!(
        doc.checksum(),
        ChecksumStatus::Mismatch {
            stored: 0x1234_5678,
            computed
        }
    );
    // Encoding always writes a fresh checksum.
    assert_eq!(doc.encode().unwrap(), good);

    let strict = DecodeOptions {
        strict_checksum: true,
        ..DecodeOptions::default()
    };
    assert_eq!(
        Document::decode_with(&bad, &Grammar::swh2(), strict).unwrap_err(),
        SaveError::ChecksumMismatch {
            stored: 0x1234_5678,
            computed
        }
    );
}

#[test]
fn truncated_varint_reports_its_offset() {
    let mut b = SaveBuilder::new();
    b.tag(b"Head").u8(0x85);
    let grammar = single_field(FieldRule::varint("v"));
    let err = Document::decode_with(&b.finish(), &grammar, DecodeOptions::default()).unwrap_err();
    assert_eq!(err, SaveError::MalformedVarint { offset: 13 });
}

#[test]
fn truncated_scalar_reports_missing_bytes() {
    let mut b = SaveBuilder::new();
    b.tag(b"Head").u16(7);
    let grammar = single_field(FieldRule::u32("v"));
    let err = Document::decode_with(&b.finish(), &grammar, DecodeOptions::default()).unwrap_err();
    assert_eq!(
        err,
        SaveError::UnexpectedEndOfBuffer {
            offset: 13,
            need: 4,
            have: 2
        }
    );
}

#[test]
fn dangling_backreference_is_an_error() {
    let mut b = SaveBuilder::new();
    b.tag(b"Head").varint(5).varint(3);
    let grammar = single_field(FieldRule::string("name"));
    let err = Document::decode_with(&b.finish(), &grammar, DecodeOptions::default()).unwrap_err();
    assert_eq!(
        err,
        SaveError::DanglingStringReference {
            offset: 14,
            distance: 3,
            length: 5
        }
    );
}

#[test]
fn mid_mission_saves_are_unsupported() {
    let mut b = SaveBuilder::new();
    head(&mut b, "Rustwater", "quest_intro", &["Wesley"]);
    imh2(&mut b, "outset_a");
    let marker_at = b.position();
    b.tag(b"MsnD").u8(0).u32(1);

    let err = Document::decode(&b.finish()).unwrap_err();
    assert_eq!(
        err,
        SaveError::UnsupportedSaveState {
            offset: marker_at,
            tag: Tag::new(*b"MsnD")
        }
    );
}

#[test]
fn wrong_nested_tag_is_reported() {
    let mut b = SaveBuilder::new();
    b.tag(b"Head").u8(0).u32(0).u32(0).u32(0).u8(0).u8(0).u8(0).u32(0);
    let nested_at = b.position();
    b.tag(b"Difx").u8(0);

    let err = Document::decode(&b.finish()).unwrap_err();
    assert_eq!(
        err,
        SaveError::UnexpectedChunkTag {
            offset: nested_at,
            expected: Tag::new(*b"Difc"),
            found: Tag::new(*b"Difx")
        }
    );
}
