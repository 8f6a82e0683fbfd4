// document-synthesis-service/src/signature.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{DocumentError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SignatureMark {
    /// PNG or JPEG of a hand-drawn signature, base64 encoded.
    Drawn {
        #[serde(rename = "imageBase64")]
        image_base64: String,
    },
    Typed { text: String },
}

/// Countersignature captured upstream and attached to a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureRecord {
    pub signer_name: String,
    pub signer_email: String,
    pub signed_at: DateTime<Utc>,
    pub mark: SignatureMark,
    /// SHA-256 hex over signer, timestamp and mark.
    #[serde(default)]
    pub integrity_hash: String,
}

impl SignatureRecord {
    pub fn new(signer_name: &str, signer_email: &str, signed_at: DateTime<Utc>, mark: SignatureMark) -> Self {
        let mut record = Self {
            signer_name: signer_name.to_string(),
            signer_email: signer_email.to_string(),
            signed_at,
            mark,
            integrity_hash: String::new(),
        };
        record.integrity_hash = record.compute_hash();
        record
    }

    pub fn compute_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.signer_name.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.signer_email.to_lowercase().as_bytes());
        hasher.update([0u8]);
        hasher.update(self.signed_at.to_rfc3339().as_bytes());
        hasher.update([0u8]);
        match &self.mark {
            SignatureMark::Drawn { image_base64 } => {
                hasher.update(b"drawn:");
                hasher.update(image_base64.as_bytes());
            }
            SignatureMark::Typed { text } => {
                hasher.update(b"typed:");
                hasher.update(text.as_bytes());
            }
        }
        hex::encode(hasher.finalize())
    }

    pub fn verify(&self) -> bool {
        !self.integrity_hash.is_empty() && self.integrity_hash.eq_ignore_ascii_case(&self.compute_hash())
    }

    /// Checks required fields; a record without a hash gets one computed.
    pub fn sealed(mut self) -> Result<Self> {
        if self.signer_name.trim().is_empty() {
            return Err(DocumentError::MissingField("signature.signerName".to_string()));
        }
        if self.integrity_hash.is_empty() {
            self.integrity_hash = self.compute_hash();
        } else if !self.verify() {
            return Err(DocumentError::InvalidData(format!(
                "signature integrity hash does not match for {}",
                self.signer_name
            )));
        }
        Ok(self)
    }

    pub fn short_hash(&self) -> &str {
        let end = self.integrity_hash.len().min(16);
        &self.integrity_hash[..end]
    }
}
