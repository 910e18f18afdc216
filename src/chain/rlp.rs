//! Minimal RLP encoder for typed transaction payloads.
//!
//! Only encoding is needed: the node decodes, we never read RLP back.

/// Append the RLP encoding of a byte string.
pub(crate) fn encode_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    if bytes.len() == 1 && bytes[0] < 0x80 {
        out.push(bytes[0]);
        return;
    }
    encode_header(out, 0x80, bytes.len());
    out.extend_from_slice(bytes);
}

/// Append an unsigned integer as a minimal big-endian byte string.
pub(crate) fn encode_uint(out: &mut Vec<u8>, value: u128) {
    let be = value.to_be_bytes();
    let first = be.iter().position(|b| *b != 0).unwrap_or(be.len());
    encode_bytes(out, &be[first..]);
}

/// Append a list whose items are already encoded in `payload`.
pub(crate) fn encode_list(out: &mut Vec<u8>, payload: &[u8]) {
    encode_header(out, 0xc0, payload.len());
    out.extend_from_slice(payload);
}

fn encode_header(out: &mut Vec<u8>, offset: u8, len: usize) {
    if len < 56 {
        out.push(offset + len as u8);
        return;
    }
    let be = (len as u64).to_be_bytes();
    let first = be.iter().position(|b| *b != 0).unwrap_or(be.len() - 1);
    let len_bytes = &be[first..];
    out.push(offset + 55 + len_bytes.len() as u8);
    out.extend_from_slice(len_bytes);
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn bytes(input: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        encode_bytes(&mut out, input);
        out
    }

    fn uint(value: u128) -> Vec<u8> {
        let mut out = Vec::new();
        encode_uint(&mut out, value);
        out
    }

    #[test]
    fn short_strings() {
        assert_eq!(bytes(b"dog"), vec![0x83, b'd', b'o', b'g']);
        assert_eq!(bytes(b""), vec![0x80]);
        assert_eq!(bytes(&[0x00]), vec![0x00]);
        assert_eq!(bytes(&[0x7f]), vec![0x7f]);
        assert_eq!(bytes(&[0x80]), vec![0x81, 0x80]);
    }

    #[test]
    fn long_string_uses_length_prefix() {
        let text = b"Lorem ipsum dolor sit amet, consectetur adipisicing elit";
        assert_eq!(text.len(), 56);
        let encoded = bytes(text);
        assert_eq!(&encoded[..2], &[0xb8, 0x38]);
        assert_eq!(&encoded[2..], text);
    }

    #[test]
    fn integers_are_minimal() {
        assert_eq!(uint(0), vec![0x80]);
        assert_eq!(uint(15), vec![0x0f]);
        assert_eq!(uint(1024), vec![0x82, 0x04, 0x00]);
        assert_eq!(
            uint(1_000_000_000_000_000_000),
            vec![0x88, 0x0d, 0xe0, 0xb6, 0xb3, 0xa7, 0x64, 0x00, 0x00]
        );
    }

    #[test]
    fn lists() {
        let mut empty = Vec::new();
        encode_list(&mut empty, &[]);
        assert_eq!(empty, vec![0xc0]);

        let mut payload = Vec::new();
        encode_bytes(&mut payload, b"cat");
        encode_bytes(&mut payload, b"dog");
        let mut out = Vec::new();
        encode_list(&mut out, &payload);
        assert_eq!(
            out,
            vec![0xc8, 0x83, b'c', b'a', b't', 0x83, b'd', b'o', b'g']
        );
    }
}
