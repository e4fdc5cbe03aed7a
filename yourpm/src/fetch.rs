use crate::error::FetchError;
use reqwest::blocking::Client;
use reqwest::header::USER_AGENT;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Downloads artifacts into the local cache.
pub trait Fetcher {
    /// Fetch `url` into `dest`. Does nothing when `dest` already exists.
    fn download(&self, url: &str, dest: &Path) -> Result<(), FetchError>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn fetch_into(&self, url: &str, partial: &Path) -> Result<(), FetchError> {
        let network = |err: reqwest::Error| FetchError::Network {
            url: url.to_string(),
            message: err.to_string(),
        };
        let io_err = |source| FetchError::Io {
            path: partial.to_path_buf(),
            source,
        };

        let mut response = self
            .client
            .get(url)
            .header(USER_AGENT, "yourpm")
            .send()
            .map_err(network)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let mut writer = BufWriter::new(File::create(partial).map_err(io_err)?);
        response.copy_to(&mut writer).map_err(network)?;
        writer.flush().map_err(io_err)?;
        Ok(())
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetcher for HttpFetcher {
    fn download(&self, url: &str, dest: &Path) -> Result<(), FetchError> {
        if dest.exists() {
            tracing::debug!(dest = %dest.display(), "already downloaded");
            return Ok(());
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|source| FetchError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let partial = partial_path(dest);
        tracing::info!(url, dest = %dest.display(), "downloading");
        if let Err(err) = self.fetch_into(url, &partial) {
            let _ = fs::remove_file(&partial);
            return Err(err);
        }

        fs::rename(&partial, dest).map_err(|source| {
            let _ = fs::remove_file(&partial);
            FetchError::Io {
                path: dest.to_path_buf(),
                source,
            }
        })
    }
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}
