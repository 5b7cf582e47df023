//! Remote trip file sources

use async_trait::async_trait;
use bytes::Bytes;

use super::month::TripMonth;
use crate::config::SourceSection;
use crate::error::FetchError;

/// Render the download URL for a month
///
/// Substitutes `{year}` and `{month:02}` / `{month}`. The month is always
/// rendered with two digits.
pub fn download_url(template: &str, month: TripMonth) -> String {
    let two_digit = format!("{:02}", month.month());
    template
        .replace("{year}", &month.year().to_string())
        .replace("{month:02}", &two_digit)
        .replace("{month}", &two_digit)
}

/// Where monthly trip files come from
#[async_trait(?Send)]
pub trait TripSource {
    /// Location of the file for `month`
    fn url(&self, month: TripMonth) -> String;

    /// Fetch the whole file for `month` into memory
    async fn fetch(&self, month: TripMonth) -> Result<Bytes, FetchError>;
}

/// HTTP(S) trip file source
pub struct HttpTripSource {
    client: reqwest::Client,
    url_template: String,
}

impl HttpTripSource {
    /// Create a source from the `[source]` configuration section
    pub fn new(section: &SourceSection) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = section.timeout() {
            builder = builder.timeout(timeout);
        }

        let client = builder.build().map_err(|e| FetchError::Request {
            url: section.url_template.clone(),
            message: format!("Failed to build HTTP client: {}", e),
        })?;

        Ok(Self {
            client,
            url_template: section.url_template.clone(),
        })
    }
}

#[async_trait(?Send)]
impl TripSource for HttpTripSource {
    fn url(&self, month: TripMonth) -> String {
        download_url(&self.url_template, month)
    }

    async fn fetch(&self, month: TripMonth) -> Result<Bytes, FetchError> {
        let url = self.url(month);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| request_error(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
            });
        }

        response.bytes().await.map_err(|e| request_error(&url, e))
    }
}

fn request_error(url: &str, e: reqwest::Error) -> FetchError {
    FetchError::Request {
        url: url.to_string(),
        message: e.to_string(),
    }
}
