//! PEM framing for exported keys
//!
//! Keys travel through chat messages, QR payloads and contract storage, so the
//! decoder accepts CRLF line endings, surrounding whitespace and bodies that
//! were re-wrapped at a different width. The encoder always produces the
//! canonical form: LF line endings, 64-column base64 body, no trailing newline.

use base64::{Engine, engine::general_purpose::STANDARD};

use crate::error::CryptoError;

/// Column width of the base64 body.
pub const PEM_LINE_WIDTH: usize = 64;

/// Frame DER bytes as a PEM block with the given label.
pub fn encode(label: &str, der: &[u8]) -> String {
    let body = STANDARD.encode(der);

    // Base64 output is ASCII, so byte chunks are valid UTF-8 boundaries
    let mut pem = String::with_capacity(body.len() + body.len() / PEM_LINE_WIDTH + 64);
    pem.push_str(&begin_marker(label));
    pem.push('\n');
    for line in body.as_bytes().chunks(PEM_LINE_WIDTH) {
        pem.push_str(&String::from_utf8_lossy(line));
        pem.push('\n');
    }
    pem.push_str(&end_marker(label));

    pem
}

/// Extract the DER bytes from a PEM block with the given label.
///
/// # Errors
///
/// - `MalformedKey`: missing or mismatched markers, or invalid base64 body
pub fn decode(label: &str, text: &str) -> Result<Vec<u8>, CryptoError> {
    let begin = begin_marker(label);
    let end = end_marker(label);

    let mut lines = text.lines().map(str::trim).filter(|line| !line.is_empty());

    match lines.next() {
        Some(first) if first == begin => {},
        Some(first) if first.starts_with("-----BEGIN ") => {
            return Err(CryptoError::malformed_key(format!(
                "expected `{begin}`, found `{first}`"
            )));
        },
        _ => return Err(CryptoError::malformed_key(format!("missing `{begin}` line"))),
    }

    let mut body = String::with_capacity(text.len());
    let mut terminated = false;
    for line in lines.by_ref() {
        if line == end {
            terminated = true;
            break;
        }
        if line.starts_with("-----") {
            return Err(CryptoError::malformed_key(format!("unexpected marker `{line}`")));
        }
        body.extend(line.chars().filter(|c| !c.is_whitespace()));
    }

    if !terminated {
        return Err(CryptoError::malformed_key(format!("missing `{end}` line")));
    }
    if lines.next().is_some() {
        return Err(CryptoError::malformed_key("trailing data after end marker"));
    }
    if body.is_empty() {
        return Err(CryptoError::malformed_key("empty key body"));
    }

    STANDARD
        .decode(body.as_bytes())
        .map_err(|e| CryptoError::malformed_key(format!("invalid base64 body: {e}")))
}

fn begin_marker(label: &str) -> String {
    format!("-----BEGIN {label}-----")
}

fn end_marker(label: &str) -> String {
    format!("-----END {label}-----")
}

#[cfg(test)]
mod tests {
    use super::*;

    const LABEL: &str = "PUBLIC KEY";

    #[test]
    fn encode_wraps_at_64_columns() {
        let der = vec![0xA5u8; 200];
        let pem = encode(LABEL, &der);

        let lines: Vec<&str> = pem.lines().collect();
        assert_eq!(lines.first(), Some(&"-----BEGIN PUBLIC KEY-----"));
        assert_eq!(lines.last(), Some(&"-----END PUBLIC KEY-----"));

        let body = &lines[1..lines.len() - 1];
        for line in &body[..body.len() - 1] {
            assert_eq!(line.len(), PEM_LINE_WIDTH);
        }
        assert!(body[body.len() - 1].len() <= PEM_LINE_WIDTH);
        assert!(!pem.ends_with('\n'));
    }

    #[test]
    fn decode_inverts_encode() {
        let der: Vec<u8> = (0..=255u8).collect();
        let pem = encode(LABEL, &der);
        assert_eq!(decode(LABEL, &pem).unwrap(), der);
    }

    #[test]
    fn decode_accepts_crlf_and_rewrapped_body() {
        let der: Vec<u8> = (0..150u8).collect();
        let body = STANDARD.encode(&der);
        let (a, b) = body.split_at(17);
        let text = format!(
            "\r\n  -----BEGIN PUBLIC KEY-----\r\n{a}\r\n  {b}  \r\n-----END PUBLIC KEY-----\r\n\r\n"
        );

        assert_eq!(decode(LABEL, &text).unwrap(), der);
    }

    #[test]
    fn decode_rejects_wrong_label() {
        let pem = encode("PRIVATE KEY", &[1, 2, 3]);
        let err = decode(LABEL, &pem).unwrap_err();
        assert!(matches!(err, CryptoError::MalformedKey { reason } if reason.contains("expected")));
    }

    #[test]
    fn decode_rejects_missing_end_marker() {
        let text = "-----BEGIN PUBLIC KEY-----\nAQID\n";
        assert!(matches!(decode(LABEL, text), Err(CryptoError::MalformedKey { .. })));
    }

    #[test]
    fn decode_rejects_bare_base64() {
        assert!(matches!(decode(LABEL, "AQIDBA=="), Err(CryptoError::MalformedKey { .. })));
        assert!(matches!(decode(LABEL, ""), Err(CryptoError::MalformedKey { .. })));
    }

    #[test]
    fn decode_rejects_invalid_base64() {
        let text = "-----BEGIN PUBLIC KEY-----\n!!!not base64!!!\n-----END PUBLIC KEY-----";
        let err = decode(LABEL, text).unwrap_err();
        assert!(matches!(err, CryptoError::MalformedKey { reason } if reason.contains("base64")));
    }

    #[test]
    fn decode_rejects_empty_body_and_trailing_data() {
        let empty = "-----BEGIN PUBLIC KEY-----\n-----END PUBLIC KEY-----";
        assert!(matches!(decode(LABEL, empty), Err(CryptoError::MalformedKey { .. })));

        let trailing = format!("{}\nextra", encode(LABEL, &[9, 9, 9]));
        assert!(matches!(decode(LABEL, &trailing), Err(CryptoError::MalformedKey { .. })));
    }
}
