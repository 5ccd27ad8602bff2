use std::fs;
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, error};

use crate::domain::DownloadTask;
use crate::error::BirdcallError;
use crate::http::{HttpClient, get_success};
use crate::sanitize::sanitize_filename;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    pub written: bool,
    pub path: Utf8PathBuf,
}

/// Retrieves single media files into the download tree.
pub struct FileFetcher<'a, H: HttpClient + ?Sized> {
    http: &'a H,
}

impl<'a, H: HttpClient + ?Sized> FileFetcher<'a, H> {
    pub fn new(http: &'a H) -> Self {
        Self { http }
    }

    pub fn fetch_task(&self, task: &DownloadTask, overwrite: bool) -> FetchOutcome {
        self.fetch(&task.directory, &task.filename, &task.url, overwrite)
    }

    /// Downloads `url` into `directory/sanitize(raw_filename)`.
    ///
    /// An existing file is left alone (and no request is made) unless
    /// `overwrite` is set. Failures are logged and reported as not written.
    pub fn fetch(
        &self,
        directory: &Utf8Path,
        raw_filename: &str,
        url: &str,
        overwrite: bool,
    ) -> FetchOutcome {
        let path = directory.join(sanitize_filename(raw_filename));

        if let Err(err) = fs::create_dir_all(directory.as_std_path()) {
            error!("failed to create {directory}: {err}");
            return FetchOutcome {
                written: false,
                path,
            };
        }

        if !overwrite && path.as_std_path().exists() {
            debug!("skipping download: {path} (already exists)");
            return FetchOutcome {
                written: false,
                path,
            };
        }

        match self.download(url, &path) {
            Ok(()) => {
                debug!("downloaded: {path}");
                FetchOutcome {
                    written: true,
                    path,
                }
            }
            Err(err) => {
                error!("failed to download {}: {err}", path.file_name().unwrap_or(""));
                FetchOutcome {
                    written: false,
                    path,
                }
            }
        }
    }

    fn download(&self, url: &str, path: &Utf8Path) -> Result<(), BirdcallError> {
        let response = get_success(self.http, "media", url, None).map_err(|err| {
            BirdcallError::AssetFetchFailed {
                url: url.to_string(),
                message: err.to_string(),
            }
        })?;
        write_atomic(path, &response.body)
    }
}

/// Writes through a temp file in the same directory so the final path only
/// ever holds a complete body.
fn write_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), BirdcallError> {
    let parent = path
        .parent()
        .ok_or_else(|| BirdcallError::Filesystem(format!("no parent directory for {path}")))?;
    let mut temp = tempfile::Builder::new()
        .prefix(".birdcall-part")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| BirdcallError::Filesystem(err.to_string()))?;
    temp.write_all(content)
        .map_err(|err| BirdcallError::Filesystem(err.to_string()))?;
    if path.as_std_path().exists() {
        fs::remove_file(path.as_std_path())
            .map_err(|err| BirdcallError::Filesystem(err.to_string()))?;
    }
    temp.persist(path.as_std_path())
        .map_err(|err| BirdcallError::Filesystem(err.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::http::HttpResponse;

    struct CountingHttp {
        status: u16,
        calls: Mutex<usize>,
    }

    impl CountingHttp {
        fn new(status: u16) -> Self {
            Self {
                status,
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    impl HttpClient for CountingHttp {
        fn get(&self, _url: &str, _timeout: Option<Duration>) -> Result<HttpResponse, BirdcallError> {
            *self.calls.lock().unwrap() += 1;
            Ok(HttpResponse {
                status: self.status,
                body: b"audio".to_vec(),
            })
        }
    }

    fn scratch() -> (tempfile::TempDir, Utf8PathBuf) {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        (temp, root)
    }

    #[test]
    fn creates_directory_and_writes_body() {
        let (_temp, root) = scratch();
        let http = CountingHttp::new(200);
        let dir = root.join("XC").join("Common Loon");

        let outcome = FileFetcher::new(&http).fetch(&dir, "a/b?.mp3", "https://x/1", false);

        assert!(outcome.written);
        assert_eq!(outcome.path, dir.join("a-b.mp3"));
        assert_eq!(std::fs::read(outcome.path.as_std_path()).unwrap(), b"audio");
    }

    #[test]
    fn existing_file_is_skipped_without_request() {
        let (_temp, root) = scratch();
        let http = CountingHttp::new(200);
        std::fs::write(root.join("call.mp3").as_std_path(), b"old").unwrap();

        let outcome = FileFetcher::new(&http).fetch(&root, "call.mp3", "https://x/1", false);

        assert!(!outcome.written);
        assert_eq!(http.calls(), 0);
        assert_eq!(std::fs::read(root.join("call.mp3").as_std_path()).unwrap(), b"old");
    }

    #[test]
    fn overwrite_replaces_existing_file() {
        let (_temp, root) = scratch();
        let http = CountingHttp::new(200);
        std::fs::write(root.join("call.mp3").as_std_path(), b"old").unwrap();

        let outcome = FileFetcher::new(&http).fetch(&root, "call.mp3", "https://x/1", true);

        assert!(outcome.written);
        assert_eq!(http.calls(), 1);
        assert_eq!(std::fs::read(root.join("call.mp3").as_std_path()).unwrap(), b"audio");
    }

    #[test]
    fn failed_status_leaves_no_file() {
        let (_temp, root) = scratch();
        let http = CountingHttp::new(503);

        let outcome = FileFetcher::new(&http).fetch(&root, "call.mp3", "https://x/1", false);

        assert!(!outcome.written);
        assert!(!root.join("call.mp3").as_std_path().exists());
        let leftovers = std::fs::read_dir(root.as_std_path()).unwrap().count();
        assert_eq!(leftovers, 0);
    }
}
