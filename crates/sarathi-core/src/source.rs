//! Where a JSON document comes from: a local file or an http(s) URL.

use std::convert::Infallible;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Url(Url),
    Path(PathBuf),
}

impl Source {
    /// Anything that is not an http(s) URL is treated as a file path.
    pub fn parse(s: &str) -> Self {
        match Url::parse(s) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Source::Url(url),
            _ => Source::Path(PathBuf::from(s)),
        }
    }

    pub async fn fetch_json<T: DeserializeOwned>(&self, client: &Client) -> Result<T> {
        match self {
            Source::Url(url) => {
                let response = client.get(url.clone()).send().await?;

                if !response.status().is_success() {
                    return Err(anyhow!("GET {} failed with status: {}", url, response.status()));
                }

                let value = response
                    .json::<T>()
                    .await
                    .with_context(|| format!("decoding JSON from {}", url))?;
                Ok(value)
            }
            Source::Path(path) => {
                let content = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("reading {}", path.display()))?;
                let value = serde_json::from_str(&content)
                    .with_context(|| format!("decoding JSON from {}", path.display()))?;
                Ok(value)
            }
        }
    }
}

impl FromStr for Source {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Source::parse(s))
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Url(url) => write!(f, "{}", url),
            Source::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_and_https_are_urls() {
        assert!(matches!(Source::parse("http://localhost:5000/env.json"), Source::Url(_)));
        assert!(matches!(Source::parse("https://example.org/verses.json"), Source::Url(_)));
    }

    #[test]
    fn everything_else_is_a_path() {
        assert_eq!(Source::parse("verses.json"), Source::Path(PathBuf::from("verses.json")));
        assert_eq!(Source::parse("./env.json"), Source::Path(PathBuf::from("./env.json")));
        // A drive letter parses as a URL scheme but is still a file.
        assert!(matches!(Source::parse("C:\\data\\verses.json"), Source::Path(_)));
        assert!(matches!(Source::parse("file:///tmp/env.json"), Source::Path(_)));
    }

    #[tokio::test]
    async fn reads_json_from_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        std::fs::write(&path, r#"{"a": 1}"#).unwrap();

        let source = Source::Path(path);
        let value: serde_json::Value = source.fetch_json(&Client::new()).await.unwrap();
        assert_eq!(value["a"], 1);
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = Source::Path(dir.path().join("nope.json"));
        let result: Result<serde_json::Value> = source.fetch_json(&Client::new()).await;
        assert!(result.is_err());
    }
}
