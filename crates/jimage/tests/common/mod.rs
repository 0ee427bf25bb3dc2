#![allow(dead_code)]

use std::{
    cmp::Reverse,
    collections::{HashMap, HashSet},
};

use byteorder::{BigEndian, LittleEndian, WriteBytesExt};

const HASH_MULTIPLIER: i32 = 0x01000193;

pub fn init() {
    let _ = pretty_env_logger::try_init();
}

struct Entry {
    module: String,
    parent: String,
    base: String,
    extension: String,
    bytes: Vec<u8>,
    compressed_size: u64,
}

impl Entry {
    fn full_name(&self) -> String {
        let mut s = String::new();
        if !self.module.is_empty() {
            s.push_str(&format!("/{}/", self.module));
        }
        if !self.parent.is_empty() {
            s.push_str(&format!("{}/", self.parent));
        }
        s.push_str(&self.base);
        if !self.extension.is_empty() {
            s.push_str(&format!(".{}", self.extension));
        }
        s
    }
}

/// Writes jimages the way `jlink` lays them out: header, redirect table,
/// location offsets, locations, strings, then resource payloads.
pub struct ImageBuilder {
    big_endian: bool,
    entries: Vec<Entry>,
}

impl ImageBuilder {
    pub fn new() -> Self {
        Self {
            big_endian: false,
            entries: Vec::new(),
        }
    }

    pub fn big_endian(&mut self) -> &mut Self {
        self.big_endian = true;
        self
    }

    /// Adds the resource at `/module/parent/base.extension`.
    pub fn resource(&mut self, path: &str, bytes: &[u8]) -> &mut Self {
        self.push(path, bytes, 0)
    }

    /// Adds a resource whose payload claims to be compressed.
    pub fn compressed(&mut self, path: &str, bytes: &[u8]) -> &mut Self {
        let compressed_size = bytes.len() as u64;
        self.push(path, bytes, compressed_size)
    }

    fn push(&mut self, path: &str, bytes: &[u8], compressed_size: u64) -> &mut Self {
        let rest = path.strip_prefix('/').unwrap();
        let (module, rest) = rest.split_once('/').unwrap();
        let (parent, file) = rest.rsplit_once('/').unwrap_or(("", rest));
        let (base, extension) = file.rsplit_once('.').unwrap_or((file, ""));

        self.entries.push(Entry {
            module: module.to_owned(),
            parent: parent.to_owned(),
            base: base.to_owned(),
            extension: extension.to_owned(),
            bytes: bytes.to_vec(),
            compressed_size,
        });
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut strings = Strings::new();
        let mut locations = Vec::new();
        let mut location_offsets = Vec::new();
        let mut data = Vec::new();

        for entry in &self.entries {
            location_offsets.push(locations.len() as u32);
            let values = [
                strings.intern(&entry.module),
                strings.intern(&entry.parent),
                strings.intern(&entry.base),
                strings.intern(&entry.extension),
                data.len() as u64,
                entry.compressed_size,
                entry.bytes.len() as u64,
            ];
            write_location(&mut locations, &values);
            data.extend_from_slice(&entry.bytes);
        }

        let names: Vec<String> = self.entries.iter().map(Entry::full_name).collect();
        let (redirect_table, slots) = perfect_hash(&names);
        let mut attribute_offsets = vec![0u32; names.len()];
        for (i, &slot) in slots.iter().enumerate() {
            attribute_offsets[slot] = location_offsets[i];
        }

        let mut buf = Vec::new();
        self.put_u32(&mut buf, 0xCAFEDADA);
        self.put_u32(&mut buf, 1 << 16);
        self.put_u32(&mut buf, 0);
        self.put_u32(&mut buf, names.len() as u32);
        self.put_u32(&mut buf, names.len() as u32);
        self.put_u32(&mut buf, locations.len() as u32);
        self.put_u32(&mut buf, strings.data.len() as u32);
        for redirect in redirect_table {
            self.put_u32(&mut buf, redirect as u32);
        }
        for offset in attribute_offsets {
            self.put_u32(&mut buf, offset);
        }
        buf.extend_from_slice(&locations);
        buf.extend_from_slice(&strings.data);
        buf.extend_from_slice(&data);
        buf
    }

    fn put_u32(&self, buf: &mut Vec<u8>, value: u32) {
        if self.big_endian {
            buf.write_u32::<BigEndian>(value).unwrap();
        } else {
            buf.write_u32::<LittleEndian>(value).unwrap();
        }
    }
}

/// The string table starts with the empty string so that offset 0 means
/// "absent".
struct Strings {
    data: Vec<u8>,
    offsets: HashMap<String, u64>,
}

impl Strings {
    fn new() -> Self {
        Self {
            data: vec![0],
            offsets: HashMap::new(),
        }
    }

    fn intern(&mut self, s: &str) -> u64 {
        if s.is_empty() {
            return 0;
        }
        if let Some(&offset) = self.offsets.get(s) {
            return offset;
        }
        let offset = self.data.len() as u64;
        self.data.extend_from_slice(s.as_bytes());
        self.data.push(0);
        self.offsets.insert(s.to_owned(), offset);
        offset
    }
}

/// Attribute kinds 1..=7, zero values omitted, terminated by a zero byte.
fn write_location(buf: &mut Vec<u8>, values: &[u64; 7]) {
    for (i, &value) in values.iter().enumerate() {
        if value == 0 {
            continue;
        }
        let bytes = value.to_be_bytes();
        let skip = bytes.iter().take_while(|&&b| b == 0).count();
        let kind = i as u8 + 1;
        buf.push(kind << 3 | (8 - skip - 1) as u8);
        buf.extend_from_slice(&bytes[skip..]);
    }
    buf.push(0);
}

pub fn hash(data: &str, seed: i32) -> i32 {
    let hash_code = data.bytes().fold(seed as u32, |useed, byte| {
        (useed.wrapping_mul(HASH_MULTIPLIER as u32)) ^ byte as u32
    });
    (hash_code & 0x7fff_ffff) as i32
}

/// Returns the redirect table and the slot assigned to each name.
/// Colliding buckets get a seed that spreads their names over free slots,
/// single names are stored directly as `-1 - slot`.
fn perfect_hash(names: &[String]) -> (Vec<i32>, Vec<usize>) {
    let len = names.len();
    let mut buckets = vec![Vec::new(); len];
    for (i, name) in names.iter().enumerate() {
        buckets[hash(name, HASH_MULTIPLIER) as usize % len].push(i);
    }

    let mut order: Vec<usize> = (0..len).collect();
    order.sort_by_key(|&b| Reverse(buckets[b].len()));

    let mut redirect_table = vec![0i32; len];
    let mut slots = vec![0usize; len];
    let mut taken = vec![false; len];

    for b in order {
        let bucket = &buckets[b];
        match bucket.len() {
            0 => {}
            1 => {
                let slot = taken.iter().position(|t| !t).unwrap();
                taken[slot] = true;
                slots[bucket[0]] = slot;
                redirect_table[b] = -1 - slot as i32;
            }
            _ => {
                let mut seed = 1;
                loop {
                    let candidates: Vec<usize> = bucket
                        .iter()
                        .map(|&i| hash(&names[i], seed) as usize % len)
                        .collect();
                    let distinct: HashSet<_> = candidates.iter().collect();
                    if distinct.len() == candidates.len() && candidates.iter().all(|&s| !taken[s])
                    {
                        for (&i, &slot) in bucket.iter().zip(&candidates) {
                            taken[slot] = true;
                            slots[i] = slot;
                        }
                        redirect_table[b] = seed;
                        break;
                    }
                    seed += 1;
                }
            }
        }
    }

    (redirect_table, slots)
}
