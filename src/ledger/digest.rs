// Revision Digest - per-document SHA-256 hash chain
//
// Every revision hashes its predecessor's hash together with its own
// table, document id, version and data. Rewriting any stored revision
// breaks the chain from that version on.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Hash of one revision. `data` is the stored JSON text, `None` for deletions.
pub fn revision_hash(
    previous_hash: Option<&str>,
    table: &str,
    document_id: &str,
    version: u64,
    data: Option<&str>,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(previous_hash.unwrap_or(""));
    hasher.update(b"|");
    hasher.update(table);
    hasher.update(b"|");
    hasher.update(document_id);
    hasher.update(b"|");
    hasher.update(version.to_string());
    hasher.update(b"|");
    hasher.update(data.unwrap_or("<deleted>"));
    format!("{:x}", hasher.finalize())
}

/// A revision as it sits in storage
#[derive(Debug, Clone)]
pub struct StoredRevision {
    pub table: String,
    pub document_id: String,
    pub version: u64,
    pub data: Option<String>,
    pub hash: String,
    pub previous_hash: Option<String>,
}

impl StoredRevision {
    pub fn recompute_hash(&self) -> String {
        revision_hash(
            self.previous_hash.as_deref(),
            &self.table,
            &self.document_id,
            self.version,
            self.data.as_deref(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VerificationReport {
    pub document_id: String,
    pub revisions: usize,
    pub verified: bool,

    /// First version whose hash or link did not check out
    pub first_mismatch: Option<u64>,

    /// Hash of the latest revision
    pub digest: Option<String>,
}

/// Walk revisions (version ascending) and check versions, links and hashes
pub fn verify_chain(document_id: &str, revisions: &[StoredRevision]) -> VerificationReport {
    let mut previous: Option<&str> = None;
    let mut first_mismatch = None;

    for (expected_version, revision) in revisions.iter().enumerate() {
        let linked = revision.previous_hash.as_deref() == previous;
        let in_sequence = revision.version == expected_version as u64;
        let intact = revision.recompute_hash() == revision.hash;

        if !(linked && in_sequence && intact) {
            first_mismatch = Some(revision.version);
            break;
        }
        previous = Some(revision.hash.as_str());
    }

    VerificationReport {
        document_id: document_id.to_string(),
        revisions: revisions.len(),
        verified: !revisions.is_empty() && first_mismatch.is_none(),
        first_mismatch,
        digest: revisions.last().map(|r| r.hash.clone()),
    }
}
