use futures::{AsyncWrite, AsyncWriteExt};
use std::{fmt, io, path::Path};

const DIRECTORY_SIZE: u64 = 4096;
const LINK_COUNT: u32 = 2;
const OWNER: &str = "2003";
const GROUP: &str = "2003";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileListing {
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
}

impl FileListing {
    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: true,
            size: DIRECTORY_SIZE,
        }
    }

    pub fn file(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
            size,
        }
    }
}

// owner, group and permissions are fixed; clients only get names, kinds and file sizes
impl fmt::Display for FileListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let perms = if self.is_dir {
            "drwxr-xr-x"
        } else {
            "-rw-r--r--"
        };

        write!(
            f,
            "{perms} {links} {owner} {group} {size:>8} {name}",
            links = LINK_COUNT,
            owner = OWNER,
            group = GROUP,
            size = self.size,
            name = self.name,
        )
    }
}

/// Immediate children of `dir`: subdirectories first, then files, each group in
/// filesystem enumeration order. Entries whose metadata can't be read (dangling
/// symlinks, races with deletion) are skipped.
pub async fn read_listing(dir: &Path) -> io::Result<Vec<FileListing>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut dirs = Vec::new();
    let mut files = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        let metadata = match tokio::fs::metadata(entry.path()).await {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(name = %name, err = %e, "skipping unreadable directory entry");
                continue;
            }
        };

        if metadata.is_dir() {
            dirs.push(FileListing::directory(name));
        } else if metadata.is_file() {
            files.push(FileListing::file(name, metadata.len()));
        }
    }

    dirs.append(&mut files);
    Ok(dirs)
}

/// Writes one CRLF-terminated line per entry, flushing each so a client sees the lines
/// already sent even if a later write fails.
pub async fn write_listing<W>(listing: &[FileListing], writer: &mut W) -> io::Result<u64>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut total = 0u64;
    for entry in listing {
        let line = format!("{entry}\r\n");
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
        total += line.len() as u64;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::io::Cursor;
    use tempfile::TempDir;

    #[test]
    fn directory_line_uses_fixed_fields() {
        assert_eq!(
            FileListing::directory("docs").to_string(),
            "drwxr-xr-x 2 2003 2003     4096 docs"
        );
    }

    #[test]
    fn file_line_carries_exact_size() {
        assert_eq!(
            FileListing::file("notes.txt", 123_456_789_012).to_string(),
            "-rw-r--r-- 2 2003 2003 123456789012 notes.txt"
        );
        assert_eq!(
            FileListing::file("empty", 0).to_string(),
            "-rw-r--r-- 2 2003 2003        0 empty"
        );
    }

    #[tokio::test]
    async fn directories_are_listed_before_files() {
        let dir = TempDir::new().unwrap();
        tokio::fs::write(dir.path().join("a.txt"), b"hello").await.unwrap();
        tokio::fs::create_dir(dir.path().join("z_dir")).await.unwrap();
        tokio::fs::write(dir.path().join("b.bin"), b"").await.unwrap();
        tokio::fs::create_dir(dir.path().join("m_dir")).await.unwrap();

        let listing = read_listing(dir.path()).await.unwrap();

        assert_eq!(listing.len(), 4);
        assert!(listing[..2].iter().all(|e| e.is_dir));
        assert!(listing[2..].iter().all(|e| !e.is_dir));
        let a = listing.iter().find(|e| e.name == "a.txt").unwrap();
        assert_eq!(a.size, 5);
    }

    #[tokio::test]
    async fn missing_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(read_listing(&dir.path().join("nope")).await.is_err());
    }

    #[tokio::test]
    async fn lines_are_crlf_terminated() {
        let listing = vec![FileListing::directory("d"), FileListing::file("f", 3)];
        let mut out = Cursor::new(Vec::new());

        let n = write_listing(&listing, &mut out).await.unwrap();
        let text = String::from_utf8(out.into_inner()).unwrap();

        assert_eq!(
            text,
            "drwxr-xr-x 2 2003 2003     4096 d\r\n-rw-r--r-- 2 2003 2003        3 f\r\n"
        );
        assert_eq!(n, text.len() as u64);
    }
}
