// File: src/hope.rs
//
// The persisted hash log (spec.md §3 "Persisted hash log", §4.2.4
// "Cross-run memoization") and the fuzz-value generator used when a
// hope block specifies `fuzzing N` (spec.md §4.3 "Fuzzing").

use md5::{Digest, Md5};
use rand::Rng;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

use crate::value::Value;

pub const MEMOIZATION_FILE: &str = "testedFunctions.json";

/// Digest of a function's canonical textual form (spec.md §4.2.4).
pub fn digest_text(text: &str) -> [u8; 16] {
    let mut hasher = Md5::new();
    hasher.update(text.as_bytes());
    hasher.finalize().into()
}

fn to_hex(digest: &[u8; 16]) -> String {
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

fn from_hex(s: &str) -> Option<[u8; 16]> {
    if s.len() != 32 {
        return None;
    }
    let mut out = [0u8; 16];
    for i in 0..16 {
        out[i] = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16).ok()?;
    }
    Some(out)
}

/// Loads the persisted hash log. A missing or corrupt file is
/// non-fatal and treated as an empty map (spec.md §7).
pub fn load(dir: &Path) -> HashMap<String, [u8; 16]> {
    let path = dir.join(MEMOIZATION_FILE);
    let Ok(raw) = fs::read_to_string(&path) else {
        return HashMap::new();
    };
    let Ok(encoded): Result<HashMap<String, String>, _> = serde_json::from_str(&raw) else {
        return HashMap::new();
    };
    encoded
        .into_iter()
        .filter_map(|(name, hex)| from_hex(&hex).map(|digest| (name, digest)))
        .collect()
}

/// Writes the hash log back atomically: write to a temp file in the
/// same directory, then rename into place (spec.md §9 "Persistence
/// atomicity").
pub fn save(dir: &Path, log: &HashMap<String, [u8; 16]>) -> io::Result<()> {
    let encoded: HashMap<String, String> =
        log.iter().map(|(name, digest)| (name.clone(), to_hex(digest))).collect();
    let json = serde_json::to_string_pretty(&encoded)?;

    let final_path = dir.join(MEMOIZATION_FILE);
    let tmp_path = dir.join(format!("{MEMOIZATION_FILE}.tmp"));
    fs::write(&tmp_path, json)?;
    fs::rename(&tmp_path, &final_path)
}

/// Generates one random value per declared parameter type for a
/// `fuzzing N` case. Untyped parameters default to `int`.
pub fn random_value(param_type: Option<&str>) -> Value {
    let mut rng = rand::thread_rng();
    match param_type.unwrap_or("int") {
        "bool" => Value::Boolean(rng.gen_bool(0.5)),
        "string" => Value::string(random_string(&mut rng)),
        _ => {
            let magnitude: i64 = rng.gen_range(0..=i32::MAX as i64);
            if rng.gen_bool(0.5) {
                Value::Integer(-magnitude)
            } else {
                Value::Integer(magnitude)
            }
        }
    }
}

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789 ";

fn random_string(rng: &mut impl Rng) -> String {
    let len = rng.gen_range(0..=12);
    (0..len).map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char).collect()
}
