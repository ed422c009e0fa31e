use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::AppError;
use crate::traits::ExternalFact;

pub(crate) const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
pub(crate) const DEFAULT_WEATHER_URL: &str = "http://api.weatherapi.com";

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Weather {
    pub(crate) city: String,
    pub(crate) temperature_c: f64,
    pub(crate) description: String,
}

impl Weather {
    pub(crate) fn format_message(&self) -> String {
        format!(
            "Погода в городе {}:\nТемпература: {:.1}°C\nПогода: {}",
            self.city, self.temperature_c, self.description
        )
    }
}

#[derive(Deserialize)]
struct CurrentResponse {
    location: Location,
    current: Current,
}

#[derive(Deserialize)]
struct Location {
    name: String,
}

#[derive(Deserialize)]
struct Current {
    temp_c: f64,
    condition: Condition,
}

#[derive(Deserialize)]
struct Condition {
    text: String,
}

/// weatherapi.com `current.json` client.
pub(crate) struct WeatherApi {
    pub(crate) http: Client,
    pub(crate) base_url: String,
    pub(crate) api_key: Option<String>,
    pub(crate) lang: String,
    pub(crate) timeout: Duration,
}

#[async_trait]
impl ExternalFact for WeatherApi {
    async fn fetch(&self, query: &str) -> Result<Weather, AppError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::ExternalFact("weather API key not configured".to_string()))?;
        let url = format!("{}/v1/current.json", self.base_url.trim_end_matches('/'));

        let resp = self
            .http
            .get(&url)
            .query(&[("key", key), ("q", query), ("lang", self.lang.as_str())])
            .header(reqwest::header::ACCEPT, "application/json")
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| AppError::ExternalFact(format!("request failed: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| AppError::ExternalFact(format!("reading body failed: {e}")))?;
        if !status.is_success() {
            return Err(AppError::ExternalFact(format!(
                "API returned {status}: {}",
                crate::helpers::truncate(&body, 200)
            )));
        }

        let parsed: CurrentResponse = serde_json::from_str(&body)
            .map_err(|e| AppError::ExternalFact(format!("bad response JSON: {e}")))?;
        debug!(city = %parsed.location.name, temp_c = parsed.current.temp_c, "Weather fetched");
        Ok(Weather {
            city: parsed.location.name,
            temperature_c: parsed.current.temp_c,
            description: parsed.current.condition.text,
        })
    }
}
