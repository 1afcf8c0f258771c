use crate::errors::{AppError, Result};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Streams `url` into `destination`. Any non-success status is an error and
/// leaves `destination` untouched.
pub fn fetch_to_path(url: &str, destination: &Path, progress: bool) -> Result<u64> {
    info!(url = %url, "downloading");
    let response = reqwest::blocking::get(url)?;
    let status = response.status();
    if !status.is_success() {
        return Err(AppError::HttpStatus {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    let bar = download_progress_bar(progress, response.content_length());
    let mut reader = bar.wrap_read(response);
    let mut writer = BufWriter::new(File::create(destination)?);
    let written = std::io::copy(&mut reader, &mut writer)?;
    writer.flush()?;
    bar.finish_and_clear();

    info!(
        path = %destination.display(),
        megabytes = %format_args!("{:.2}", written as f64 / 1e6),
        "download completed"
    );
    Ok(written)
}

fn download_progress_bar(enabled: bool, length: Option<u64>) -> ProgressBar {
    if !enabled {
        return ProgressBar::with_draw_target(length, ProgressDrawTarget::hidden());
    }
    let bar = ProgressBar::with_draw_target(length, ProgressDrawTarget::stderr_with_hz(4));
    let style = if length.is_some() {
        ProgressStyle::with_template(
            "{spinner:.green} {elapsed_precise} {bytes}/{total_bytes} ({bytes_per_sec}, eta {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
    } else {
        ProgressStyle::with_template("{spinner:.green} {elapsed_precise} {bytes} ({bytes_per_sec})")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    };
    bar.set_style(style);
    bar
}

#[cfg(test)]
pub(crate) mod test_server {
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread;

    pub(crate) const NOT_FOUND: &str =
        "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";

    /// Answers one request on a loopback port with `response` and returns
    /// the base URL.
    pub(crate) fn respond_once(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").expect("expected loopback listener");
        let address = listener.local_addr().expect("expected listener address");
        thread::spawn(move || {
            let Ok((stream, _)) = listener.accept() else {
                return;
            };
            let mut reader = BufReader::new(stream);
            let mut line = String::new();
            while reader.read_line(&mut line).is_ok_and(|read| read > 0) {
                if line == "\r\n" {
                    break;
                }
                line.clear();
            }
            let _ = reader.get_mut().write_all(response.as_bytes());
        });
        format!("http://{address}")
    }
}

#[cfg(test)]
mod tests {
    use super::fetch_to_path;
    use super::test_server::{NOT_FOUND, respond_once};
    use crate::errors::AppError;

    #[test]
    fn unreachable_host_is_an_error() {
        let dir = tempfile::tempdir().expect("expected tempdir");
        let destination = dir.path().join("never.txt");
        let result = fetch_to_path("http://127.0.0.1:9/never.txt", &destination, false);
        assert!(matches!(
            result,
            Err(AppError::Http(_) | AppError::HttpStatus { .. })
        ));
        assert!(!destination.exists());
    }

    #[test]
    fn non_success_status_is_reported_with_url() {
        let dir = tempfile::tempdir().expect("expected tempdir");
        let destination = dir.path().join("chromosome.fa.gz");
        let base = respond_once(NOT_FOUND);
        let url = format!("{base}/homo_sapiens/dna/chromosome.fa.gz");

        let result = fetch_to_path(&url, &destination, false);

        assert!(matches!(
            result,
            Err(AppError::HttpStatus { status: 404, url: echoed }) if echoed == url
        ));
        assert!(!destination.exists());
    }
}
