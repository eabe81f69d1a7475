use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use indicatif::{ProgressBar, ProgressStyle};

use crate::error::{ExportError, Result};

/// Downloads `url` into memory, reporting progress under `message`.
pub fn download_file_as_bytes(url: &str, message: &str) -> Result<Vec<u8>> {
    let download_error = |source| ExportError::Download {
        url: url.to_string(),
        source,
    };

    let response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(download_error)?;

    let pb = ProgressBar::new(response.content_length().unwrap_or(0));
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
            .expect("progress bar template is valid")
            .progress_chars("=> "),
    );
    pb.set_message(message.to_string());

    let mut bytes = Vec::new();
    pb.wrap_read(response).read_to_end(&mut bytes)?;
    pb.finish_and_clear();

    Ok(bytes)
}

/// Decompresses gzip `bytes` into `dest`, replacing any previous file.
pub fn decompress_to(bytes: &[u8], dest: &Path) -> Result<()> {
    // A file at `dest` is always complete: it is only ever produced by the rename.
    let partial = dest.with_extension("partial");
    {
        let mut output = File::create(&partial)?;
        let mut gz = GzDecoder::new(bytes);
        io::copy(&mut gz, &mut output)?;
    }
    fs::rename(&partial, dest)?;
    Ok(())
}

/// Makes sure `<dest_dir>/<name>` exists, fetching `<base_url><name>.gz` when it does not.
pub fn fetch_cached(base_url: &str, name: &str, dest_dir: &Path) -> Result<PathBuf> {
    let file_name = dest_dir.join(name);

    if file_name.exists() {
        log::debug!("using cached {}", file_name.display());
        return Ok(file_name);
    }

    fs::create_dir_all(dest_dir)?;
    let url = format!("{base_url}{name}.gz");
    log::info!("downloading {url}");
    let bytes = download_file_as_bytes(&url, name)?;
    decompress_to(&bytes, &file_name)?;
    log::info!("saved {}", file_name.display());

    Ok(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    #[test]
    fn decompresses_gzip_payload() {
        let dir = tempfile::tempdir().unwrap();
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"idx payload").unwrap();
        let gz = encoder.finish().unwrap();

        let dest = dir.path().join("train-labels-idx1-ubyte");
        decompress_to(&gz, &dest).unwrap();

        assert_eq!(fs::read(&dest).unwrap(), b"idx payload");
        assert!(!dest.with_extension("partial").exists());
    }

    #[test]
    fn invalid_gzip_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out");
        assert!(decompress_to(b"not gzip", &dest).is_err());
        assert!(!dest.exists());
    }

    #[test]
    fn cached_file_skips_the_network() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("t10k-labels-idx1-ubyte"), b"cached").unwrap();

        // Unroutable URL: any network access would fail the test.
        let path = fetch_cached("http://127.0.0.1:9/", "t10k-labels-idx1-ubyte", dir.path())
            .unwrap();
        assert_eq!(fs::read(path).unwrap(), b"cached");
    }
}
