use super::types::{DIFC, GARE, HEAD, IMH2, INVE, ITIN, MID_MISSION_MARKERS, SHIP, TOP_LEVEL};
use crate::chunk::{Count, ScalarKind};
use crate::grammar::{ChunkRule, FieldRule, Grammar};

impl Grammar {
    /// Chunk rules for the parts of an SWH2 save that are understood.
    /// Everything after `Inve` is kept opaque.
    pub fn swh2() -> Self {
        Self::new()
            .with_rule(ChunkRule::new(
                DIFC,
                vec![
                    FieldRule::u8("unknown"),
                    FieldRule::list("settings", Count::Fixed(8), ScalarKind::U32),
                ],
            ))
            .with_rule(ChunkRule::new(
                HEAD,
                vec![
                    FieldRule::u8("zero_1"),
                    FieldRule::u32("unknown_1"),
                    FieldRule::u32("zero_2"),
                    FieldRule::u32("unknown_2"),
                    FieldRule::u8("unknown_3"),
                    FieldRule::u8("unknown_4"),
                    FieldRule::u8("unknown_5"),
                    FieldRule::u32("unknown_6"),
                    FieldRule::array("difficulties", Count::Fixed(2), DIFC),
                    FieldRule::string("location"),
                    FieldRule::string("region"),
                    FieldRule::string("quest"),
                    FieldRule::list("crew", Count::U8, ScalarKind::Str),
                ],
            ))
            .with_rule(ChunkRule::new(
                IMH2,
                vec![
                    FieldRule::u8("unknown_start"),
                    FieldRule::string("outset"),
                    FieldRule::u32("unknown_1"),
                    FieldRule::u32("unknown_2"),
                    FieldRule::u32("unknown_3"),
                    FieldRule::u8("small_unknown_1"),
                    FieldRule::u8("small_unknown_2"),
                    FieldRule::u8("small_unknown_3"),
                    FieldRule::u8("small_unknown_4"),
                    FieldRule::u8("small_unknown_5"),
                    FieldRule::string("campaign_state"),
                    FieldRule::u8("small_unknown_6"),
                ],
            ))
            .with_rule(ChunkRule::new(
                GARE,
                vec![
                    FieldRule::u8("unknown"),
                    FieldRule::u32("fragments"),
                    FieldRule::u32("water"),
                ],
            ))
            .with_rule(ChunkRule::new(
                SHIP,
                vec![
                    FieldRule::u8("unknown"),
                    FieldRule::list("equipped", Count::U8, ScalarKind::Str),
                    FieldRule::list("item_ids", Count::U8, ScalarKind::Varint),
                    FieldRule::list("item_sequences", Count::U8, ScalarKind::U32),
                    FieldRule::list("upgrades", Count::U8, ScalarKind::Str),
                    FieldRule::u8("unknown_b1"),
                    FieldRule::u8("unknown_b2"),
                    FieldRule::u8("unknown_b3"),
                    FieldRule::u8("unknown_b4"),
                    FieldRule::u32("unknown_i1"),
                    FieldRule::u32("unknown_i2"),
                    FieldRule::u16("unknown_s1"),
                ],
            ))
            .with_rule(ChunkRule::new(
                ITIN,
                vec![
                    FieldRule::u8("unknown_1"),
                    FieldRule::varint("unknown_2"),
                    FieldRule::u32("unknown_3"),
                    FieldRule::string("name"),
                    FieldRule::u32("unknown_4"),
                    FieldRule::u32("unknown_5"),
                ],
            ))
            .with_rule(ChunkRule::new(
                INVE,
                vec![
                    FieldRule::u8("unknown_1"),
                    FieldRule::u32("unknown_2"),
                    FieldRule::array("items", Count::Varint, ITIN),
                    FieldRule::list("unknown_arr", Count::Varint, ScalarKind::Varint),
                    FieldRule::list("unknown_arr_2", Count::Varint, ScalarKind::Varint),
                    FieldRule::list("hats", Count::Varint, ScalarKind::Str),
                    FieldRule::list("new_hats", Count::Varint, ScalarKind::Str),
                    FieldRule::string("leeway_hat"),
                ],
            ))
            .with_top_level(TOP_LEVEL)
            .with_skippable_after(INVE)
            .with_mid_mission_markers(MID_MISSION_MARKERS)
    }
}
