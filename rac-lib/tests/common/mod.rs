//! Synthesized RAC streams.
#![allow(dead_code)]

use std::io::Cursor;

use hifitime::Epoch;
use rac::innosat::{checksum, GroupingFlag};
use rac::ramses::{RamsesHeader, TmHeader};
use rac::{Input, Provenance};

pub const HOUSEKEEPING: (u8, u8) = (3, 25);
pub const TRANSPARENT: (u8, u8) = (128, 25);

pub const SID_STAT: [u8; 2] = [0x00, 0x01];
pub const RID_CCD1: [u8; 2] = [0x00, 0x15];

/// STAT report body with time `ts` seconds and fraction 0.
pub fn stat(ts: u32) -> Vec<u8> {
    let mut dat = vec![0u8; 37];
    dat[0..2].copy_from_slice(&7u16.to_le_bytes()); // SPID
    dat[9..13].copy_from_slice(&ts.to_le_bytes());
    dat[15] = 1; // MODE
    dat
}

/// Innosat source packet with a data field header and valid CRC.
pub fn packet(flag: GroupingFlag, seq: u16, kind: (u8, u8), secs: u32, data: &[u8]) -> Vec<u8> {
    let len = u16::try_from(9 + data.len() + 2 - 1).expect("packet too long");
    let mut pkt = Vec::with_capacity(6 + usize::from(len) + 1);
    pkt.extend_from_slice(&0x0864u16.to_be_bytes());
    pkt.extend_from_slice(&(((flag as u16) << 14) | (seq & 0x3fff)).to_be_bytes());
    pkt.extend_from_slice(&len.to_be_bytes());
    pkt.extend_from_slice(&[0x10, kind.0, kind.1]);
    pkt.extend_from_slice(&secs.to_be_bytes());
    pkt.extend_from_slice(&[0x00, 0x00]);
    pkt.extend_from_slice(data);
    let crc = checksum(&pkt);
    pkt.extend_from_slice(&crc.to_be_bytes());
    pkt
}

/// Ramses frame created `millis` into day `date` wrapping `packet`.
pub fn frame(date: i32, millis: u32, packet: &[u8]) -> Vec<u8> {
    let tm = TmHeader {
        quality_indicator: 0,
        loss_flag: 0,
        vc_frame_counter: 1,
    };
    let header = RamsesHeader {
        sync: RamsesHeader::SYNC,
        length: u16::try_from(TmHeader::LEN + packet.len()).expect("frame too long"),
        port: 0,
        kind: 0,
        secure: 0,
        time: millis,
        date,
    };
    let mut dat = header.to_bytes().to_vec();
    dat.extend_from_slice(&tm.to_bytes());
    dat.extend_from_slice(packet);
    dat
}

/// Frames of a STAT report split over `parts` packets (1 is standalone). Fragment `n` has packet
/// time `ts + n` seconds.
pub fn stat_frame_list(date: i32, millis: u32, seq: u16, ts: u32, parts: usize) -> Vec<Vec<u8>> {
    let body = stat(ts);
    if parts <= 1 {
        let mut data = SID_STAT.to_vec();
        data.extend(body);
        let pkt = packet(GroupingFlag::Standalone, seq, HOUSEKEEPING, ts, &data);
        return vec![frame(date, millis, &pkt)];
    }

    let chunks: Vec<&[u8]> = body.chunks(body.len().div_ceil(parts)).collect();
    let last = chunks.len() - 1;
    chunks
        .iter()
        .enumerate()
        .map(|(idx, part)| {
            let flag = match idx {
                0 => GroupingFlag::Start,
                n if n == last => GroupingFlag::Stop,
                _ => GroupingFlag::Continuation,
            };
            let mut data = SID_STAT.to_vec();
            data.extend_from_slice(part);
            let num = idx as u32;
            let pkt = packet(flag, seq + idx as u16, HOUSEKEEPING, ts + num, &data);
            frame(date, millis + num, &pkt)
        })
        .collect()
}

pub fn stat_frames(date: i32, millis: u32, seq: u16, ts: u32, parts: usize) -> Vec<u8> {
    stat_frame_list(date, millis, seq, ts, parts).concat()
}

pub fn input(name: &str, dat: Vec<u8>) -> Input {
    Input::new(
        Cursor::new(dat),
        Provenance::new(name, Epoch::from_gregorian_utc_at_midnight(2024, 1, 1)),
    )
}
