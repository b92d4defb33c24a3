//! Cookie payload and its signature.

use hmac::{Hmac, Mac};
use md5::Md5;
use std::fmt;

type HmacMd5 = Hmac<Md5>;

const MAX_MINUTE_DIGITS: usize = 13;
const SIGNATURE_LEN: usize = 16;

/// A signed minute.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct AuthToken {
    issued_minute: u64,
    signature: [u8; SIGNATURE_LEN],
}

impl AuthToken {
    /// Sign `minute` with `secret`.
    pub fn sign(secret: &[u8], minute: u64) -> Self {
        let mut mac = new_mac(secret);
        mac.update(minute_hex(minute).as_bytes());
        Self {
            issued_minute: minute,
            signature: mac.finalize().into_bytes().into(),
        }
    }

    /// Parse a cookie value of the form `<1-13 hex>|<32 hex>`, either case.
    pub fn parse(value: &str) -> Option<Self> {
        let (minute, signature) = value.split_once('|')?;
        if minute.is_empty() || minute.len() > MAX_MINUTE_DIGITS || !is_hex(minute) {
            return None;
        }
        if signature.len() != SIGNATURE_LEN * 2 || !is_hex(signature) {
            return None;
        }

        let issued_minute = u64::from_str_radix(minute, 16).ok()?;
        let mut bytes = [0u8; SIGNATURE_LEN];
        hex::decode_to_slice(signature, &mut bytes).ok()?;
        Some(Self {
            issued_minute,
            signature: bytes,
        })
    }

    pub fn issued_minute(&self) -> u64 {
        self.issued_minute
    }

    pub fn signature(&self) -> &[u8; SIGNATURE_LEN] {
        &self.signature
    }

    /// Recompute the signature under `secret` and compare in constant time.
    pub fn verify(&self, secret: &[u8]) -> bool {
        let mut mac = new_mac(secret);
        mac.update(minute_hex(self.issued_minute).as_bytes());
        mac.verify_slice(&self.signature).is_ok()
    }

    /// Lowercase cookie value.
    pub fn encode(&self) -> String {
        format!(
            "{}|{}",
            minute_hex(self.issued_minute),
            hex::encode(self.signature)
        )
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthToken")
            .field("issued_minute", &self.issued_minute)
            .finish_non_exhaustive()
    }
}

fn new_mac(secret: &[u8]) -> HmacMd5 {
    HmacMd5::new_from_slice(secret).expect("HMAC accepts any key length")
}

fn minute_hex(minute: u64) -> String {
    format!("{minute:x}")
}

fn is_hex(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_signature() {
        let token = AuthToken::sign(b"S", 1000);
        assert_eq!(token.encode(), "3e8|5a36edd3d03ced9f6657cd3bbdbd1f9a");
    }

    #[test]
    fn test_parse_accepts_uppercase() {
        let token = AuthToken::parse("3E8|5A36EDD3D03CED9F6657CD3BBDBD1F9A").unwrap();
        assert_eq!(token.issued_minute(), 1000);
        assert!(token.verify(b"S"));
        assert_eq!(token.encode(), "3e8|5a36edd3d03ced9f6657cd3bbdbd1f9a");
    }

    #[test]
    fn test_parse_rejects_malformed_values() {
        let sig = "5a36edd3d03ced9f6657cd3bbdbd1f9a";
        for bad in [
            String::new(),
            "3e8".to_string(),
            format!("|{sig}"),
            format!("3e8|{}", &sig[..31]),
            format!("3e8|{sig}0"),
            format!("3g8|{sig}"),
            format!("3e8|{}x", &sig[..31]),
            format!("+3e8|{sig}"),
            format!("12345678901234|{sig}"),
            format!("3e8|{sig}|1"),
            format!(" 3e8|{sig}"),
        ] {
            assert!(AuthToken::parse(&bad).is_none(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn test_parse_accepts_thirteen_digit_minute() {
        let value = AuthToken::sign(b"secret", 0xf_ffff_ffff_ffff).encode();
        let token = AuthToken::parse(&value).unwrap();
        assert_eq!(token.issued_minute(), 0xf_ffff_ffff_ffff);
    }

    #[test]
    fn test_verify_fails_under_other_secret() {
        let token = AuthToken::sign(b"first secret", 42);
        assert!(token.verify(b"first secret"));
        assert!(!token.verify(b"second secret"));
    }

    #[test]
    fn test_debug_omits_signature() {
        let token = AuthToken::sign(b"S", 1000);
        assert!(!format!("{token:?}").contains("5a36"));
    }
}
