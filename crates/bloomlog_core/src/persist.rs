//! Dump/load of a filter as two files:
//!
//!   {dir}/{name}.bitmap  raw BE u32 words (see `bitmap`)
//!   {dir}/{name}.meta    `maxElements:hashSize:bitSize:total`
//!
//! Publish order: both temps written and synced, then `.bitmap` renamed,
//! then `.meta`, then the directory synced. A crash between the two renames
//! leaves a new bitmap next to the previous meta; nothing ties the pair together.

use crate::bitmap::Bitmap;
use crate::consts::{EXT_BITMAP, EXT_META, EXT_TEMP};
use crate::errors::{BloomError, Result};
use crate::meta::Meta;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct FilePaths {
    pub bitmap: PathBuf,
    pub meta: PathBuf,
}

impl FilePaths {
    pub fn new(dir: &Path, name: &str) -> Self {
        Self {
            bitmap: dir.join(format!("{name}{EXT_BITMAP}")),
            meta: dir.join(format!("{name}{EXT_META}")),
        }
    }
}

pub fn temp_path(path: &Path) -> PathBuf {
    let mut s = OsString::from(path.as_os_str());
    s.push(EXT_TEMP);
    PathBuf::from(s)
}

#[cfg(unix)]
fn fsync_dir(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::OpenOptionsExt;
    let dir = match path.parent() {
        Some(d) if !d.as_os_str().is_empty() => d,
        _ => Path::new("."),
    };
    let f = fs::OpenOptions::new().read(true).custom_flags(libc::O_DIRECTORY).open(dir)?;
    f.sync_all()
}
#[cfg(not(unix))]
fn fsync_dir(_path: &Path) -> io::Result<()> { Ok(()) }

fn write_synced(
    path: &Path,
    body: impl FnOnce(&mut BufWriter<&File>) -> io::Result<()>,
) -> io::Result<()> {
    let f = File::create(path)?;
    let mut w = BufWriter::with_capacity(64 * 1024, &f);
    body(&mut w)?;
    w.flush()?;
    drop(w);
    f.sync_all()
}

/// Writes `bitmap` and `meta` under `paths` via `.temp` files and renames.
/// Leftover temps from a failed attempt are overwritten by the next one.
pub fn save(paths: &FilePaths, bitmap: &Bitmap, meta: &Meta) -> Result<()> {
    let bitmap_tmp = temp_path(&paths.bitmap);
    let meta_tmp = temp_path(&paths.meta);

    write_synced(&bitmap_tmp, |w| bitmap.dump(w))?;
    write_synced(&meta_tmp, |w| w.write_all(meta.to_string().as_bytes()))?;

    fs::rename(&bitmap_tmp, &paths.bitmap)?;
    fs::rename(&meta_tmp, &paths.meta)?;
    let _ = fsync_dir(&paths.meta);
    Ok(())
}

fn open_err(path: &Path, source: io::Error) -> BloomError {
    let path = path.to_path_buf();
    if source.kind() == io::ErrorKind::NotFound {
        BloomError::MissingFile { path, source }
    } else {
        BloomError::Unreadable { path, source }
    }
}

pub fn read_meta(path: &Path) -> Result<Meta> {
    let raw = fs::read_to_string(path).map_err(|e| open_err(path, e))?;
    raw.parse()
}

/// Loads the bitmap for `meta`; a file shorter than `bit_size` needs is truncated.
pub fn read_bitmap(path: &Path, meta: &Meta) -> Result<Bitmap> {
    let mut f = File::open(path).map_err(|e| open_err(path, e))?;
    let found = f.metadata().map_err(|e| open_err(path, e))?.len();
    let expected = Bitmap::byte_len_for(meta.bit_size);
    if found < expected {
        return Err(BloomError::Truncated { path: path.to_path_buf(), expected, found });
    }
    let bm = Bitmap::load(&mut f, found).map_err(|e| open_err(path, e))?;
    if bm.max_size() < meta.bit_size {
        // file shrank between stat and read
        return Err(BloomError::Truncated {
            path: path.to_path_buf(),
            expected,
            found: bm.byte_len(),
        });
    }
    Ok(bm)
}
