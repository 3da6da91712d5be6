use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const MAGIC: &[u8; 4] = b"KMEC";
const VERSION: u8 = 1;
const FLUSH_EVERY: usize = 1000;

/// On-disk content-hash embedding cache. A portable replacement for the
/// legacy pickle cache — see the pickle-cache redesign note in DESIGN.md.
/// Key is `sha256(model || "||" || text)`; corrupt or version-mismatched
/// entries are treated as cache misses, never as fatal errors.
pub struct EmbedCache {
    path: PathBuf,
    inner: Mutex<CacheState>,
}

struct CacheState {
    entries: HashMap<[u8; 32], Vec<f32>>,
    writes_since_flush: usize,
}

impl EmbedCache {
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = Self::load(&path).unwrap_or_default();
        Self {
            path,
            inner: Mutex::new(CacheState {
                entries,
                writes_since_flush: 0,
            }),
        }
    }

    fn key(model: &str, text: &str) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(model.as_bytes());
        hasher.update(b"||");
        hasher.update(text.as_bytes());
        hasher.finalize().into()
    }

    pub fn get(&self, model: &str, text: &str) -> Option<Vec<f32>> {
        let key = Self::key(model, text);
        self.inner.lock().unwrap().entries.get(&key).cloned()
    }

    pub fn set(&self, model: &str, text: &str, vector: Vec<f32>) {
        let key = Self::key(model, text);
        let mut state = self.inner.lock().unwrap();
        state.entries.insert(key, vector);
        state.writes_since_flush += 1;
        if state.writes_since_flush % FLUSH_EVERY == 0 {
            let _ = Self::flush_locked(&self.path, &state.entries);
        }
    }

    pub fn close(&self) {
        let state = self.inner.lock().unwrap();
        let _ = Self::flush_locked(&self.path, &state.entries);
    }

    fn load(path: &Path) -> Option<HashMap<[u8; 32], Vec<f32>>> {
        let mut file = std::fs::File::open(path).ok()?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf).ok()?;
        if buf.len() < 5 || &buf[0..4] != MAGIC || buf[4] != VERSION {
            return None;
        }
        let mut cursor = 5usize;
        let mut entries = HashMap::new();
        while cursor + 32 + 4 <= buf.len() {
            let mut key = [0u8; 32];
            key.copy_from_slice(&buf[cursor..cursor + 32]);
            cursor += 32;
            let dim = u32::from_le_bytes(buf[cursor..cursor + 4].try_into().ok()?) as usize;
            cursor += 4;
            let byte_len = dim * 4;
            if cursor + byte_len > buf.len() {
                break; // truncated tail — treat remaining entries as missing
            }
            let vector: Vec<f32> = buf[cursor..cursor + byte_len]
                .chunks_exact(4)
                .map(|c| f32::from_le_bytes(c.try_into().unwrap()))
                .collect();
            cursor += byte_len;
            entries.insert(key, vector);
        }
        Some(entries)
    }

    fn flush_locked(path: &Path, entries: &HashMap<[u8; 32], Vec<f32>>) -> std::io::Result<()> {
        let tmp_path = path.with_extension("tmp");
        {
            let file = std::fs::File::create(&tmp_path)?;
            let _lock = fs2::FileExt::lock_exclusive(&file);
            let mut writer = std::io::BufWriter::new(&file);
            writer.write_all(MAGIC)?;
            writer.write_all(&[VERSION])?;
            for (key, vector) in entries {
                writer.write_all(key)?;
                writer.write_all(&(vector.len() as u32).to_le_bytes())?;
                for f in vector {
                    writer.write_all(&f.to_le_bytes())?;
                }
            }
        }
        std::fs::rename(tmp_path, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn roundtrips_through_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.bin");

        {
            let cache = EmbedCache::open(&path);
            cache.set("text-embedding-3-small", "hello world", vec![0.1, 0.2, 0.3]);
            cache.close();
        }

        let cache = EmbedCache::open(&path);
        let vector = cache.get("text-embedding-3-small", "hello world").unwrap();
        assert_eq!(vector, vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn miss_for_unseen_text() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.bin");
        let cache = EmbedCache::open(&path);
        assert!(cache.get("model", "unseen").is_none());
    }

    #[test]
    fn corrupt_file_is_treated_as_empty_cache() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.bin");
        std::fs::write(&path, b"not a cache file").unwrap();
        let cache = EmbedCache::open(&path);
        assert!(cache.get("model", "anything").is_none());
    }
}
