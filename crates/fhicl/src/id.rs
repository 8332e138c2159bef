//! content ids
use crate::error::{Error, Result};
use sha2::{Digest, Sha256};

/// Number of digest bytes kept
const ID_BYTES: usize = 20;

/// Content derived identity of a [ParameterSet](crate::ParameterSet)
///
/// The id is the SHA-256 digest of the canonical string form, truncated to 20 bytes and written
/// as 40 lowercase hex digits. Equal content always yields an equal id, across processes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParameterSetId([u8; ID_BYTES]);

impl ParameterSetId {
    /// Length of the hex form
    pub const STR_LEN: usize = 2 * ID_BYTES;

    pub fn from_canonical(canonical: &str) -> Self {
        let digest = Sha256::digest(canonical.as_bytes());
        let mut bytes = [0u8; ID_BYTES];
        bytes.copy_from_slice(&digest[..ID_BYTES]);
        Self(bytes)
    }

    pub fn is_valid_str(text: &str) -> bool {
        text.len() == Self::STR_LEN && text.bytes().all(|b| b.is_ascii_hexdigit())
    }
}

impl std::str::FromStr for ParameterSetId {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        if !Self::is_valid_str(text) {
            return Err(Error::Other(format!(
                "\"{text}\" is not a valid parameter set id"
            )));
        }

        let mut bytes = [0u8; ID_BYTES];
        hex::decode_to_slice(text, &mut bytes)
            .map_err(|e| Error::Other(format!("\"{text}\" is not a valid parameter set id: {e}")))?;
        Ok(Self(bytes))
    }
}

impl std::fmt::Display for ParameterSetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl std::fmt::Debug for ParameterSetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ParameterSetId({self})")
    }
}
