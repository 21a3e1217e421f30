#![allow(dead_code)]

use std::collections::HashMap;

use swh2_core::checksum;
use swh2_core::swh2::{HEADER_LEN, MAGIC};
use swh2_core::varint;

/// Writes save payloads the way the game does: each string is defined the
/// first time it appears in a scope and referenced by backward distance after
/// that.
#[derive(Debug, Clone)]
pub struct SaveBuilder {
    base: usize,
    payload: Vec<u8>,
    defined: HashMap<Vec<u8>, usize>,
}

impl SaveBuilder {
    /// Payload of a whole save; positions start after the header.
    pub fn new() -> Self {
        Self::scoped(HEADER_LEN)
    }

    /// Body of an isolated scope such as the skippable section.
    pub fn section_body() -> Self {
        Self::scoped(0)
    }

    fn scoped(base: usize) -> Self {
        Self {
            base,
            payload: Vec::new(),
            defined: HashMap::new(),
        }
    }

    pub fn position(&self) -> usize {
        self.base + self.payload.len()
    }

    pub fn tag(&mut self, tag: &[u8; 4]) -> &mut Self {
        self.payload.extend_from_slice(tag);
        self
    }

    pub fn u8(&mut self, v: u8) -> &mut Self {
        self.payload.push(v);
        self
    }

    pub fn u16(&mut self, v: u16) -> &mut Self {
        self.payload.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn u32(&mut self, v: u32) -> &mut Self {
        self.payload.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn varint(&mut self, v: u64) -> &mut Self {
        varint::encode(v, &mut self.payload);
        self
    }

    pub fn bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.payload.extend_from_slice(bytes);
        self
    }

    /// A string occurrence: a definition the first time, a reference after.
    pub fn string(&mut self, text: &str) -> &mut Self {
        if text.is_empty() {
            return self.u8(0);
        }
        match self.defined.get(text.as_bytes()).copied() {
            Some(site) => self.reference_to(text, site),
            None => self.definition(text),
        }
    }

    /// Always writes the bytes inline.
    pub fn definition(&mut self, text: &str) -> &mut Self {
        self.varint(text.len() as u64).u8(0);
        let site = self.position();
        self.defined.entry(text.as_bytes().to_vec()).or_insert(site);
        self.bytes(text.as_bytes())
    }

    fn reference_to(&mut self, text: &str, site: usize) -> &mut Self {
        self.varint(text.len() as u64);
        let anchor = self.position() as u64;
        self.varint(anchor - site as u64)
    }

    /// Writes `body` behind its skip length.
    pub fn section(&mut self, body: &SaveBuilder) -> &mut Self {
        self.varint(body.payload.len() as u64).bytes(&body.payload)
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Header with a correct checksum, then the payload.
    pub fn finish(&self) -> Vec<u8> {
        self.finish_with_checksum(checksum::compute(&self.payload))
    }

    pub fn finish_with_checksum(&self, crc: u32) -> Vec<u8> {
        let mut out = MAGIC.to_vec();
        out.push(1);
        out.extend_from_slice(&crc.to_le_bytes());
        out.extend_from_slice(&self.payload);
        out
    }
}

pub fn head(b: &mut SaveBuilder, location: &str, quest: &str, crew: &[&str]) {
    b.tag(b"Head").u8(0).u32(0x11).u32(0).u32(0x22).u8(1).u8(2).u8(3).u32(0x33);
    for level in 0..2u32 {
        b.tag(b"Difc").u8(0);
        for setting in 0..8 {
            b.u32(level * 10 + setting);
        }
    }
    b.string(location).string("Rocky Waters").string(quest);
    b.u8(crew.len() as u8);
    for member in crew {
        b.string(member);
    }
}

pub fn imh2(b: &mut SaveBuilder, outset: &str) {
    b.tag(b"imh2").u8(0).string(outset).u32(1).u32(2).u32(3);
    b.u8(4).u8(5).u8(6).u8(7).u8(8).string("camp_state_1").u8(9);
}

pub fn resources(b: &mut SaveBuilder, fragments: u32, water: u32) {
    b.tag(b"GaRe").u8(0).u32(fragments).u32(water);
}

pub fn ship(b: &mut SaveBuilder) {
    b.tag(b"Ship").u8(0);
    b.u8(2).string("cannon_mk1").string("hull_plating");
    b.u8(2).varint(7).varint(300);
    b.u8(2).u32(0).u32(1);
    b.u8(1).string("upgrade_speed");
    b.u8(1).u8(2).u8(3).u8(4).u32(5).u32(6).u16(7);
}

pub fn inventory(b: &mut SaveBuilder) {
    b.tag(b"Inve").u8(0).u32(0);
    b.varint(2);
    for name in ["cannon_mk1", "hat_top"] {
        b.tag(b"ItIn").u8(0).varint(1).u32(0).string(name).u32(0).u32(0);
    }
    b.varint(1).varint(5);
    b.varint(0);
    b.varint(2).string("hat_top").string("hat_big");
    b.varint(0);
    b.string("hat_big");
}

/// Every structured chunk, with the standard values used across the tests.
pub fn structured(b: &mut SaveBuilder) {
    head(b, "Rustwater", "quest_intro", &["Wesley", "Sally"]);
    imh2(b, "outset_a");
    resources(b, 35, 1200);
    ship(b);
    inventory(b);
}

/// Opaque data after the structured chunks: an unmodeled chunk holding a
/// reference to a structured string, and a definition with a later
/// reference of its own.
pub fn tail(b: &mut SaveBuilder) {
    b.tag(b"CrLo").u8(1).string("Rustwater").u8(0xFF);
    b.definition("loadout_alpha").u32(0xDEAD_BEEF).string("loadout_alpha");
    b.string("Wesley").bytes(&[0x00, 0x01, 0x02]);
}

pub fn skippable_body() -> SaveBuilder {
    let mut body = SaveBuilder::section_body();
    body.u8(0xF0).definition("hat_top").u16(0x0102).string("hat_top").u8(0xF1);
    body
}

/// A complete save: structured chunks, a skippable section and a tail.
pub fn standard_save() -> Vec<u8> {
    let mut b = SaveBuilder::new();
    structured(&mut b);
    b.section(&skippable_body());
    tail(&mut b);
    b.finish()
}
