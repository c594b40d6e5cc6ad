//! Client of the lens score HTTP API
//!
//! The four operations of the service are gathered in the [`LensApi`] trait,
//! [`ApiClient`] implements them over HTTP.

use crate::lens::{lenient_f64, Aperture, Lens, LensId, Region, Sample};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Environment variable holding the API base URL
pub const API_ENV: &str = "LENS_SCORE_API";
pub const DEFAULT_API: &str = "http://localhost:5000/api";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request to {url} failed")]
    Http {
        url: String,
        #[source]
        source: Box<ureq::Error>,
    },
    #[error("failed to read the response of {url}")]
    Io {
        url: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode the response of {url}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("unexpected response from {url}: {reason}")]
    Unexpected { url: String, reason: String },
}

/// Measurement record of a lens as returned by the pre-check
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
pub struct PreRecord {
    #[serde(deserialize_with = "lenient_f64")]
    pub focal: f64,
    /// F-number
    #[serde(deserialize_with = "lenient_f64")]
    pub f: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub center: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub edge: f64,
}
impl PreRecord {
    pub fn score(&self, region: Region) -> f64 {
        match region {
            Region::Center => self.center,
            Region::Edge => self.edge,
        }
    }
}

/// Outcome of the pre-check of a lens id
#[derive(Debug, Clone, PartialEq)]
pub enum PreCheck {
    /// the lens is unknown to the measurement source
    NotFound,
    Text {
        title: String,
        records: Vec<PreRecord>,
    },
    Image {
        title: String,
        url: String,
    },
}

#[derive(Deserialize)]
struct PreResponse {
    result: String,
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    data: Value,
}

/// Body of a lens registration
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Submission {
    pub device: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<PreRecord>>,
}

/// The lens score service
pub trait LensApi: Send + Sync {
    /// Lists the lenses
    fn lenses(&self) -> Result<Vec<Lens>, ApiError>;
    /// Returns the (focal, score) samples of a lens for a region and an aperture
    fn samples(
        &self,
        lens_id: LensId,
        region: Region,
        aperture: Aperture,
    ) -> Result<Vec<Sample>, ApiError>;
    fn pre_check(&self, lens_id: LensId) -> Result<PreCheck, ApiError>;
    /// Registers or updates a lens
    fn submit(&self, lens_id: LensId, submission: &Submission) -> Result<(), ApiError>;
}

/// HTTP client of the lens score API
pub struct ApiClient {
    base_url: String,
    timeout: Duration,
    agent: ureq::Agent,
}
impl Default for ApiClient {
    fn default() -> Self {
        let base_url = std::env::var(API_ENV).unwrap_or_else(|_| DEFAULT_API.to_string());
        Self::new(base_url)
    }
}
impl ApiClient {
    pub fn new<S: Into<String>>(base_url: S) -> Self {
        let timeout = Duration::from_secs(10);
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }
    /// Sets the requests timeout
    pub fn timeout(self, timeout: Duration) -> Self {
        Self {
            timeout,
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            ..self
        }
    }
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
    fn get_text(&self, url: &str) -> Result<String, ApiError> {
        log::debug!("GET {} (timeout: {:?})", url, self.timeout);
        let response = self.agent.get(url).call().map_err(|e| ApiError::Http {
            url: url.to_string(),
            source: Box::new(e),
        })?;
        response.into_string().map_err(|e| ApiError::Io {
            url: url.to_string(),
            source: e,
        })
    }
    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        let body = self.get_text(url)?;
        serde_json::from_str(&body).map_err(|e| ApiError::Decode {
            url: url.to_string(),
            source: e,
        })
    }
}
impl LensApi for ApiClient {
    fn lenses(&self) -> Result<Vec<Lens>, ApiError> {
        self.get_json(&self.url("lenses"))
    }
    fn samples(
        &self,
        lens_id: LensId,
        region: Region,
        aperture: Aperture,
    ) -> Result<Vec<Sample>, ApiError> {
        self.get_json(&self.url(&format!("lenses/{}/{}/{}", lens_id, region, aperture)))
    }
    fn pre_check(&self, lens_id: LensId) -> Result<PreCheck, ApiError> {
        let url = self.url(&format!("lenses/{}/pre", lens_id));
        let response: PreResponse = self.get_json(&url)?;
        decode_pre_check(&url, response)
    }
    fn submit(&self, lens_id: LensId, submission: &Submission) -> Result<(), ApiError> {
        let url = self.url(&format!("lenses/{}", lens_id));
        let body = serde_json::to_string(submission).map_err(|e| ApiError::Decode {
            url: url.clone(),
            source: e,
        })?;
        log::debug!("POST {}", url);
        self.agent
            .post(&url)
            .set("Content-Type", "application/json")
            .send_string(&body)
            .map_err(|e| ApiError::Http {
                url: url.clone(),
                source: Box::new(e),
            })?;
        Ok(())
    }
}

fn decode_pre_check(url: &str, response: PreResponse) -> Result<PreCheck, ApiError> {
    if response.result != "ok" {
        return Ok(PreCheck::NotFound);
    }
    match response.kind.as_deref() {
        Some("text") => {
            let records = if response.data.is_null() {
                vec![]
            } else {
                serde_json::from_value(response.data).map_err(|e| ApiError::Decode {
                    url: url.to_string(),
                    source: e,
                })?
            };
            Ok(PreCheck::Text {
                title: response.title,
                records,
            })
        }
        Some("image") => match response.data {
            Value::String(image_url) => Ok(PreCheck::Image {
                title: response.title,
                url: image_url,
            }),
            _ => Err(ApiError::Unexpected {
                url: url.to_string(),
                reason: "image reference is not a string".to_string(),
            }),
        },
        kind => Err(ApiError::Unexpected {
            url: url.to_string(),
            reason: format!("unknown pre-check type {:?}", kind),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pre(body: &str) -> Result<PreCheck, ApiError> {
        decode_pre_check("test", serde_json::from_str(body).unwrap())
    }

    #[test]
    fn pre_check_not_found() {
        assert_eq!(pre(r#"{"result": "ng"}"#).unwrap(), PreCheck::NotFound);
    }

    #[test]
    fn pre_check_text() {
        let check = pre(r#"{"result": "ok", "type": "text", "title": "12-40mm",
            "data": [{"focal": "12", "f": "2.8", "center": 2800, "edge": 2300},
                     {"focal": "40", "f": "4", "center": 2600, "edge": 2200}]}"#)
        .unwrap();
        match check {
            PreCheck::Text { title, records } => {
                assert_eq!(title, "12-40mm");
                assert_eq!(records.len(), 2);
                assert_eq!(records[0].focal, 12.);
                assert_eq!(records[1].f, 4.);
                assert_eq!(records[1].score(Region::Edge), 2200.);
            }
            other => panic!("expected text records, got {:?}", other),
        }
    }

    #[test]
    fn pre_check_image() {
        let check = pre(
            r#"{"result": "ok", "type": "image", "data": "https://example.com/mtf.png"}"#,
        )
        .unwrap();
        assert_eq!(
            check,
            PreCheck::Image {
                title: String::new(),
                url: "https://example.com/mtf.png".to_string()
            }
        );
        assert!(pre(r#"{"result": "ok", "type": "video", "data": 1}"#).is_err());
    }

    #[test]
    fn submission_body() {
        let body = serde_json::to_value(Submission {
            device: "m43".to_string(),
            data: None,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"device": "m43"}));
    }

    #[test]
    fn urls() {
        let client = ApiClient::new("http://localhost:5000/api/");
        assert_eq!(client.base_url(), "http://localhost:5000/api");
        assert_eq!(client.url("lenses"), "http://localhost:5000/api/lenses");
    }
}
