use std::fmt;

use sha2::{Digest, Sha256};

/// Length of a hex-encoded SHA-256 digest
const KEY_LEN: usize = 64;

/// Synthesis parameters that determine the produced audio
///
/// Every field takes part in the digest. Each field is hashed with its
/// length in front, so separators inside a field cannot make two different
/// tuples hash the same input.
#[derive(Debug, Clone, Copy)]
pub struct KeyParams<'a> {
    pub text: &'a str,
    pub voice: &'a str,
    pub rate: &'a str,
    pub volume: &'a str,
    pub pitch: &'a str,
    /// Speaking style of the SSML document the text is wrapped in, `None`
    /// when the text is sent as plain text
    pub markup: Option<&'a str>,
}

/// Cache key: lowercase hex SHA-256 of the synthesis parameters
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for a set of synthesis parameters
    pub fn derive(params: &KeyParams<'_>) -> Self {
        let mut hasher = Sha256::new();

        for field in [params.text, params.voice, params.rate, params.volume, params.pitch] {
            update_field(&mut hasher, field);
        }

        match params.markup {
            Some(style) => {
                hasher.update([1]);
                update_field(&mut hasher, style);
            }
            None => hasher.update([0]),
        }

        Self(format!("{:x}", hasher.finalize()))
    }

    /// Parse a key previously produced by [`CacheKey::derive`]
    ///
    /// Returns `None` for anything that is not 64 lowercase hex characters,
    /// which lets directory listings skip foreign files.
    pub fn from_hex(value: &str) -> Option<Self> {
        let valid = value.len() == KEY_LEN && value.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        valid.then(|| Self(value.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn update_field(hasher: &mut Sha256, field: &str) {
    hasher.update((field.len() as u64).to_le_bytes());
    hasher.update(field.as_bytes());
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn params<'a>(text: &'a str, voice: &'a str, rate: &'a str, volume: &'a str, pitch: &'a str) -> KeyParams<'a> {
        KeyParams {
            text,
            voice,
            rate,
            volume,
            pitch,
            markup: None,
        }
    }

    #[test]
    fn same_parameters_same_key() {
        let a = params("Olá", "pt-BR-FranciscaNeural", "+5%", "+0%", "+2Hz");
        let b = params("Olá", "pt-BR-FranciscaNeural", "+5%", "+0%", "+2Hz");
        assert_eq!(CacheKey::derive(&a), CacheKey::derive(&b));
    }

    #[test]
    fn key_is_fixed_length_hex() {
        let key = CacheKey::derive(&params("", "", "", "", ""));
        assert_eq!(key.as_str().len(), 64);
        assert_eq!(CacheKey::from_hex(key.as_str()), Some(key));
    }

    #[test]
    fn every_field_changes_the_key() {
        let texts = ["sentença", "Sentença", "sentença "];
        let voices = ["pt-BR-FranciscaNeural", "pt-BR-AntonioNeural"];
        let rates = ["+0%", "+5%", "-10%"];
        let volumes = ["+0%", "+20%"];
        let pitches = ["+0Hz", "+2Hz"];

        let mut tuples = HashSet::new();
        let mut keys = HashSet::new();

        for text in texts {
            for voice in voices {
                for rate in rates {
                    for volume in volumes {
                        for pitch in pitches {
                            let p = params(text, voice, rate, volume, pitch);
                            // Deriving twice must agree
                            assert_eq!(CacheKey::derive(&p), CacheKey::derive(&p));
                            tuples.insert((text, voice, rate, volume, pitch));
                            keys.insert(CacheKey::derive(&p));
                        }
                    }
                }
            }
        }

        assert_eq!(tuples.len(), 3 * 2 * 3 * 2 * 2);
        assert_eq!(keys.len(), tuples.len());
    }

    #[test]
    fn separators_cannot_alias_fields() {
        let a = params("a|b", "c", "+0%", "+0%", "+0Hz");
        let b = params("a", "b|c", "+0%", "+0%", "+0Hz");
        assert_ne!(CacheKey::derive(&a), CacheKey::derive(&b));

        let c = params("ab", "c", "+0%", "+0%", "+0Hz");
        let d = params("a", "bc", "+0%", "+0%", "+0Hz");
        assert_ne!(CacheKey::derive(&c), CacheKey::derive(&d));
    }

    #[test]
    fn markup_mode_and_style_change_the_key() {
        let plain = params("mesmo texto", "pt-BR-FranciscaNeural", "+5%", "+0%", "+2Hz");
        let unstyled = KeyParams {
            markup: Some(""),
            ..plain
        };
        let styled = KeyParams {
            markup: Some("narration-professional"),
            ..plain
        };
        let cheerful = KeyParams {
            markup: Some("cheerful"),
            ..plain
        };

        let keys: HashSet<_> = [plain, unstyled, styled, cheerful].iter().map(CacheKey::derive).collect();
        assert_eq!(keys.len(), 4);
    }

    #[test]
    fn from_hex_rejects_foreign_names() {
        assert!(CacheKey::from_hex("not-a-key").is_none());
        assert!(CacheKey::from_hex(&"A".repeat(64)).is_none());
        assert!(CacheKey::from_hex(&"a".repeat(63)).is_none());
        assert!(CacheKey::from_hex(&"0".repeat(64)).is_some());
    }
}
