//! Archive extraction.
//!
//! Archives are extracted verbatim into the destination directory; the
//! caller decides which top-level entry is the source tree.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;
use tar::Archive;
use tracing::{debug, info};

use crate::source::SourceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
  TarGz,
  TarBz2,
  TarZst,
  Tar,
  Zip,
}

impl ArchiveFormat {
  /// Detect the archive format from the file name.
  pub fn detect(path: &Path) -> Option<Self> {
    let name = path.file_name()?.to_str()?.to_ascii_lowercase();

    if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
      Some(Self::TarGz)
    } else if name.ends_with(".tar.bz2") || name.ends_with(".tbz2") {
      Some(Self::TarBz2)
    } else if name.ends_with(".tar.zst") || name.ends_with(".tzst") {
      Some(Self::TarZst)
    } else if name.ends_with(".tar") {
      Some(Self::Tar)
    } else if name.ends_with(".zip") {
      Some(Self::Zip)
    } else {
      None
    }
  }
}

/// Extract `archive_path` into `dest`.
pub fn extract(archive_path: &Path, dest: &Path) -> Result<(), SourceError> {
  let format = ArchiveFormat::detect(archive_path)
    .ok_or_else(|| SourceError::UnsupportedArchive(archive_path.to_path_buf()))?;

  debug!(archive = %archive_path.display(), ?format, "extracting");

  let extract_err = |e: std::io::Error| SourceError::Extract {
    archive: archive_path.to_path_buf(),
    message: e.to_string(),
  };

  let file = File::open(archive_path).map_err(extract_err)?;
  let reader = BufReader::new(file);

  match format {
    ArchiveFormat::TarGz => unpack_tar(GzDecoder::new(reader), dest).map_err(extract_err)?,
    ArchiveFormat::TarBz2 => unpack_tar(bzip2::read::BzDecoder::new(reader), dest).map_err(extract_err)?,
    ArchiveFormat::TarZst => {
      let decoder = zstd::stream::read::Decoder::new(reader).map_err(extract_err)?;
      unpack_tar(decoder, dest).map_err(extract_err)?
    }
    ArchiveFormat::Tar => unpack_tar(reader, dest).map_err(extract_err)?,
    ArchiveFormat::Zip => {
      let mut archive = zip::ZipArchive::new(reader).map_err(|e| SourceError::Extract {
        archive: archive_path.to_path_buf(),
        message: e.to_string(),
      })?;
      archive.extract(dest).map_err(|e| SourceError::Extract {
        archive: archive_path.to_path_buf(),
        message: e.to_string(),
      })?;
    }
  }

  info!(archive = %archive_path.display(), dest = %dest.display(), "unpacked");
  Ok(())
}

fn unpack_tar<R: Read>(reader: R, dest: &Path) -> std::io::Result<()> {
  let mut archive = Archive::new(reader);
  archive.set_preserve_permissions(true);
  archive.unpack(dest)
}
