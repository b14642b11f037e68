//! Service and location directory of the booking site.
//!
//! The site is the only authority on service names and locations; nothing is
//! persisted here. Directory failures resolve to empty lists, which simply
//! skips the affected service groups for the tick.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use slotwatch_core::{Service, Topic};

use crate::error::{EngineError, EngineResult};
use crate::probe::HttpProber;

/// Upstream wire shape of one service entry.
#[derive(Debug, Deserialize)]
struct ServiceEntry {
    id_servicio: String,
    nombre: String,
}

/// Upstream wire shape of the locations response: one wrapper object with
/// the locations of the requested service.
#[derive(Debug, Deserialize)]
struct LocationsWrapper {
    #[serde(default)]
    centros: Vec<LocationEntry>,
}

#[derive(Debug, Deserialize)]
struct LocationEntry {
    id_centro: String,
    nombre: String,
}

/// A bookable location of a service, with its currently open slot dates.
#[derive(Debug, Clone)]
pub struct LocationAvailability {
    pub id: String,
    pub name: String,
    pub appointments: Vec<String>,
}

/// Read-only client for the booking site's service and location listings.
pub struct ServiceDirectory {
    client: Client,
    services_url: String,
    locations_url_template: String,
}

impl ServiceDirectory {
    /// Creates a directory client. `locations_url_template` carries a
    /// `{service}` placeholder.
    pub fn new(
        services_url: impl Into<String>,
        locations_url_template: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            services_url: services_url.into(),
            locations_url_template: locations_url_template.into(),
        }
    }

    /// Lists the bookable services. Any failure yields an empty list.
    pub async fn list_services(&self) -> Vec<Service> {
        let response = match self.client.get(&self.services_url).send().await {
            Ok(resp) if resp.status().is_success() => resp,
            Ok(resp) => {
                tracing::warn!(
                    status = resp.status().as_u16(),
                    "Service listing returned non-success status"
                );
                return Vec::new();
            }
            Err(e) => {
                tracing::warn!(error = %e, "Service listing request failed");
                return Vec::new();
            }
        };

        match response.json::<Vec<ServiceEntry>>().await {
            Ok(entries) => entries
                .into_iter()
                .map(|entry| Service::new(entry.id_servicio, entry.nombre))
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "Service listing undecodable");
                Vec::new()
            }
        }
    }

    /// Lists a service's locations together with their open slot dates.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Upstream` when the locations listing itself
    /// cannot be fetched; per-location calendar failures degrade to an
    /// empty date list for that location.
    pub async fn service_locations(
        &self,
        service_id: &str,
        prober: &HttpProber,
    ) -> EngineResult<Vec<LocationAvailability>> {
        let url = self
            .locations_url_template
            .replace("{service}", service_id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| EngineError::upstream(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EngineError::upstream(format!(
                "locations listing returned HTTP {}",
                response.status().as_u16()
            )));
        }

        let wrappers: Vec<LocationsWrapper> = response
            .json()
            .await
            .map_err(|e| EngineError::upstream(e.to_string()))?;

        let entries = wrappers
            .into_iter()
            .next()
            .map(|w| w.centros)
            .unwrap_or_default();

        let mut locations = Vec::with_capacity(entries.len());
        for entry in entries {
            let appointments = match Topic::new(service_id, &entry.id_centro) {
                Ok(topic) => prober.slot_dates(&topic).await,
                Err(e) => {
                    tracing::warn!(location = entry.id_centro, error = %e, "Skipping location");
                    Vec::new()
                }
            };
            locations.push(LocationAvailability {
                id: entry.id_centro,
                name: entry.nombre,
                appointments,
            });
        }

        Ok(locations)
    }
}
