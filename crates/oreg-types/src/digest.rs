use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256, Sha512};

use crate::error::TypeError;

/// Hash algorithms this registry can compute and verify.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Algorithm {
    Sha256,
    Sha512,
    Blake3,
}

impl Algorithm {
    /// The canonical algorithm identifier used in digest strings.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
            Self::Blake3 => "blake3",
        }
    }

    /// Expected length of the hex encoding produced by this algorithm.
    pub const fn hex_len(&self) -> usize {
        match self {
            Self::Sha256 | Self::Blake3 => 64,
            Self::Sha512 => 128,
        }
    }

    /// Hash `data` and return the lowercase hex encoding.
    pub fn hash_hex(&self, data: &[u8]) -> String {
        match self {
            Self::Sha256 => hex::encode(Sha256::digest(data)),
            Self::Sha512 => hex::encode(Sha512::digest(data)),
            Self::Blake3 => blake3::hash(data).to_hex().to_string(),
        }
    }
}

impl FromStr for Algorithm {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sha256" => Ok(Self::Sha256),
            "sha512" => Ok(Self::Sha512),
            "blake3" => Ok(Self::Blake3),
            other => Err(TypeError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Algorithm-tagged content hash, written `algorithm:hex`.
///
/// A `Digest` can only be obtained through [`Digest::parse`] (or the
/// equivalent `FromStr`/serde paths) or [`Digest::from_content`], so every
/// value in circulation has passed syntactic validation: the algorithm is
/// `[a-z0-9]+([+._-][a-z0-9]+)*` and the encoded part is non-empty
/// lowercase hex. Parsing does not enforce the algorithm's hash length;
/// integrity is checked when content is read back ([`Digest::verify`]).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Digest {
    algorithm: String,
    encoded: String,
}

impl Digest {
    /// Parse and validate a digest string.
    pub fn parse(input: &str) -> Result<Self, TypeError> {
        let (algorithm, encoded) = input
            .split_once(':')
            .ok_or_else(|| TypeError::invalid_digest(input, "missing algorithm separator"))?;
        validate_algorithm(input, algorithm)?;
        validate_encoded(input, encoded)?;
        Ok(Self {
            algorithm: algorithm.to_string(),
            encoded: encoded.to_string(),
        })
    }

    /// Compute the digest of `data` with the given algorithm.
    pub fn from_content(algorithm: Algorithm, data: &[u8]) -> Self {
        Self {
            algorithm: algorithm.as_str().to_string(),
            encoded: algorithm.hash_hex(data),
        }
    }

    /// The algorithm identifier (e.g. `sha256`).
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// The hex-encoded hash.
    pub fn encoded(&self) -> &str {
        &self.encoded
    }

    /// Short form for logs: algorithm plus the first 12 hex characters.
    pub fn short(&self) -> String {
        let end = self.encoded.len().min(12);
        format!("{}:{}", self.algorithm, &self.encoded[..end])
    }

    /// Re-hash `data` and check that it produces this digest.
    ///
    /// Fails with [`TypeError::UnsupportedAlgorithm`] if this registry
    /// cannot compute the digest's algorithm.
    pub fn verify(&self, data: &[u8]) -> Result<bool, TypeError> {
        let algorithm: Algorithm = self.algorithm.parse()?;
        Ok(algorithm.hash_hex(data) == self.encoded)
    }

    /// Re-run syntactic validation.
    pub fn validate(&self) -> Result<(), TypeError> {
        let input = self.to_string();
        validate_algorithm(&input, &self.algorithm)?;
        validate_encoded(&input, &self.encoded)
    }

    /// Check the hex length against the digest's algorithm.
    ///
    /// Algorithms this registry cannot compute are not length-checked.
    pub fn check_length(&self) -> Result<(), TypeError> {
        let Ok(algorithm) = self.algorithm.parse::<Algorithm>() else {
            return Ok(());
        };
        if self.encoded.len() != algorithm.hex_len() {
            return Err(TypeError::invalid_digest(
                &self.to_string(),
                format!(
                    "{} digest needs {} hex characters, got {}",
                    algorithm,
                    algorithm.hex_len(),
                    self.encoded.len()
                ),
            ));
        }
        Ok(())
    }
}

fn validate_algorithm(input: &str, algorithm: &str) -> Result<(), TypeError> {
    if algorithm.is_empty() {
        return Err(TypeError::invalid_digest(input, "empty algorithm"));
    }
    let mut previous_was_separator = true;
    for ch in algorithm.chars() {
        match ch {
            'a'..='z' | '0'..='9' => previous_was_separator = false,
            '+' | '.' | '_' | '-' => {
                if previous_was_separator {
                    return Err(TypeError::invalid_digest(
                        input,
                        format!("misplaced separator {ch:?} in algorithm"),
                    ));
                }
                previous_was_separator = true;
            }
            other => {
                return Err(TypeError::invalid_digest(
                    input,
                    format!("invalid character {other:?} in algorithm"),
                ))
            }
        }
    }
    if previous_was_separator {
        return Err(TypeError::invalid_digest(
            input,
            "algorithm must not end with a separator",
        ));
    }
    Ok(())
}

fn validate_encoded(input: &str, encoded: &str) -> Result<(), TypeError> {
    if encoded.is_empty() {
        return Err(TypeError::invalid_digest(input, "empty hex"));
    }
    if let Some(bad) = encoded
        .chars()
        .find(|c| !matches!(c, '0'..='9' | 'a'..='f'))
    {
        return Err(TypeError::invalid_digest(
            input,
            format!("non-hex character {bad:?}"),
        ));
    }
    Ok(())
}

impl FromStr for Digest {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Digest {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Digest> for String {
    fn from(digest: Digest) -> Self {
        digest.to_string()
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.short())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.encoded)
    }
}
