use sha2::{Digest, Sha256};

use crate::upstream::FamilyRef;

/// Hash of a listing page's ordered (id, name) pairs.
///
/// Any addition, removal, reorder or rename on the page changes it.
pub fn page_hash(families: &[FamilyRef]) -> String {
    let mut hasher = Sha256::new();
    for family in families {
        hasher.update(family.id.as_bytes());
        hasher.update(b"\t");
        hasher.update(family.name.as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}
