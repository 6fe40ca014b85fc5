//! Request signatures.
//!
//! The service authenticates a call by recomputing an MD5 digest over the
//! shared security key followed by every `key` + `value` pair of the request.

use md5::{Digest, Md5};

/// Keys that never take part in the digest.
pub const IGNORED_PARAMS: [&str; 2] = ["sig", "filedata"];

/// Hex-encoded digest of `security_key` followed by each `key` + `value`
/// pair, in the order `params` yields them.
///
/// Callers sign a canonicalized set so the order is byte-wise by key.
pub fn generate_signature<I, K, V>(security_key: &str, params: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: ToString,
{
    let mut hasher = Md5::new();
    hasher.update(security_key.as_bytes());

    for (key, value) in params {
        let key = key.as_ref();
        if IGNORED_PARAMS.contains(&key) {
            continue;
        }
        hasher.update(key.as_bytes());
        hasher.update(value.to_string().as_bytes());
    }

    hex::encode(hasher.finalize())
}
