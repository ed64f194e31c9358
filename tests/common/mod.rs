#![allow(dead_code)]

use std::path::Path;

use sha2::{Digest, Sha256};

/// Blanks the values of keys that change on every save.
pub fn scrub_pdf(bytes: &[u8]) -> Vec<u8> {
    let mut scrubbed = bytes.to_vec();
    for key in [
        b"/CreationDate(".as_slice(),
        b"/ModDate(".as_slice(),
        b"/Producer(".as_slice(),
        b"/Identifier(".as_slice(),
    ] {
        scrub_until(&mut scrubbed, key, b')');
    }
    scrub_until(&mut scrubbed, b"/ID[", b']');
    for tag in [
        b"<xmp:CreateDate>".as_slice(),
        b"<xmp:ModifyDate>".as_slice(),
        b"<xmp:MetadataDate>".as_slice(),
        b"<xmpMM:DocumentID>".as_slice(),
        b"<xmpMM:InstanceID>".as_slice(),
    ] {
        scrub_until(&mut scrubbed, tag, b'<');
    }
    scrubbed
}

fn scrub_until(bytes: &mut [u8], key: &[u8], terminator: u8) {
    let mut start = 0;
    while let Some(offset) = find(&bytes[start..], key) {
        let mut index = start + offset + key.len();
        while index < bytes.len() && bytes[index] != terminator {
            if !matches!(bytes[index], b'<' | b'>' | b' ') {
                bytes[index] = b'0';
            }
            index += 1;
        }
        start = index;
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

pub fn normalized_hash(bytes: &[u8]) -> String {
    let digest = Sha256::digest(scrub_pdf(bytes));
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

pub fn page_count(path: &Path) -> usize {
    lopdf::Document::load(path)
        .expect("generated PDF should parse")
        .get_pages()
        .len()
}

/// Writes a small solid PNG and returns its path.
pub fn write_logo(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("logo.png");
    image::RgbImage::from_pixel(40, 20, image::Rgb([20, 90, 160]))
        .save(&path)
        .expect("logo should be written");
    path
}
