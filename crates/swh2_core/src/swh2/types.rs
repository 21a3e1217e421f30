use crate::chunk::Tag;

pub const MAGIC: [u8; 4] = *b"SWH2";
/// Newest save version this codec understands.
pub const MAX_VERSION: u8 = 1;
/// Magic, version byte, checksum.
pub const HEADER_LEN: usize = 9;
pub const CHECKSUM_OFFSET: usize = 5;

pub const HEAD: Tag = Tag::new(*b"Head");
pub const DIFC: Tag = Tag::new(*b"Difc");
pub const IMH2: Tag = Tag::new(*b"imh2");
pub const GARE: Tag = Tag::new(*b"GaRe");
pub const SHIP: Tag = Tag::new(*b"Ship");
pub const INVE: Tag = Tag::new(*b"Inve");
pub const ITIN: Tag = Tag::new(*b"ItIn");

pub const TOP_LEVEL: [Tag; 5] = [HEAD, IMH2, GARE, SHIP, INVE];

/// Chunks that only appear in saves made during a mission.
pub const MID_MISSION_MARKERS: [Tag; 6] = [
    Tag::new(*b"MsnD"),
    Tag::new(*b"PWDT"),
    Tag::new(*b"MtBG"),
    Tag::new(*b"Beha"),
    Tag::new(*b"ECSD"),
    Tag::new(*b"ECTa"),
];

/// Known chunk tags with no grammar rule yet. They stay inside opaque
/// regions.
pub const UNMODELED_TAGS: [Tag; 14] = [
    Tag::new(*b"CrLo"),
    Tag::new(*b"ReDe"),
    Tag::new(*b"LTma"),
    Tag::new(*b"LTde"),
    Tag::new(*b"LoDe"),
    Tag::new(*b"LoDD"),
    Tag::new(*b"ShlD"),
    Tag::new(*b"PBar"),
    Tag::new(*b"PeCo"),
    Tag::new(*b"Pers"),
    Tag::new(*b"QstS"),
    Tag::new(*b"Qest"),
    Tag::new(*b"MiSt"),
    Tag::new(*b"MsCD"),
];
