//! Synthetic MP4 byte streams for tests.

pub fn mp4_box(kind: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + payload.len());
    out.extend_from_slice(&(8 + payload.len() as u32).to_be_bytes());
    out.extend_from_slice(kind);
    out.extend_from_slice(payload);
    out
}

/// Box using the 64-bit extended size field.
pub fn mp4_box_large(kind: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(16 + payload.len());
    out.extend_from_slice(&1u32.to_be_bytes());
    out.extend_from_slice(kind);
    out.extend_from_slice(&(16 + payload.len() as u64).to_be_bytes());
    out.extend_from_slice(payload);
    out
}

pub fn mvhd_v0(timescale: u32, duration: u32) -> Vec<u8> {
    let mut out = vec![0, 0, 0, 0];
    out.extend_from_slice(&[0; 8]);
    out.extend_from_slice(&timescale.to_be_bytes());
    out.extend_from_slice(&duration.to_be_bytes());
    // rate, volume, matrix, next track id
    out.extend_from_slice(&[0; 80]);
    out
}

pub fn mvhd_v1(timescale: u32, duration: u64) -> Vec<u8> {
    let mut out = vec![1, 0, 0, 0];
    out.extend_from_slice(&[0; 16]);
    out.extend_from_slice(&timescale.to_be_bytes());
    out.extend_from_slice(&duration.to_be_bytes());
    out.extend_from_slice(&[0; 80]);
    out
}

fn chpl_entries(out: &mut Vec<u8>, entries: &[(u64, &str)]) {
    for (start, title) in entries {
        out.extend_from_slice(&start.to_be_bytes());
        out.push(title.len() as u8);
        out.extend_from_slice(title.as_bytes());
    }
}

pub fn chpl_v1(entries: &[(u64, &str)]) -> Vec<u8> {
    let mut out = vec![1, 0, 0, 0, 0];
    out.extend_from_slice(&(entries.len() as u32).to_be_bytes());
    chpl_entries(&mut out, entries);
    out
}

pub fn chpl_v0(entries: &[(u64, &str)]) -> Vec<u8> {
    let mut out = vec![0, 0, 0, 0, entries.len() as u8];
    chpl_entries(&mut out, entries);
    out
}

/// `meta` payload: version/flags followed by child boxes.
pub fn meta_payload(children: &[Vec<u8>]) -> Vec<u8> {
    let mut out = vec![0, 0, 0, 0];
    for child in children {
        out.extend_from_slice(child);
    }
    out
}

/// A minimal chaptered audiobook: `ftyp`, `moov{mvhd, udta{chpl}}`, `mdat`.
pub fn m4b(timescale: u32, duration: u32, chapters: &[(u64, &str)]) -> Vec<u8> {
    let udta = mp4_box(b"udta", &mp4_box(b"chpl", &chpl_v1(chapters)));
    let mut moov_payload = mp4_box(b"mvhd", &mvhd_v0(timescale, duration));
    moov_payload.extend(udta);

    let mut out = mp4_box(b"ftyp", b"M4B \0\0\0\0");
    out.extend(mp4_box(b"moov", &moov_payload));
    out.extend(mp4_box(b"mdat", &[0; 32]));
    out
}
