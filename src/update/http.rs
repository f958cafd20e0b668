use crate::update::error::{UpdateError, UpdateResult};
use crate::update::traits::{HttpResponse, Transport};
use std::sync::Arc;
use ureq::{Agent, AgentBuilder, native_tls};

const USER_AGENT: &str = concat!("relaunch/", env!("CARGO_PKG_VERSION"));

pub struct HttpClient {
    agent: Agent,
}

impl HttpClient {
    pub fn new(allow_insecure: bool) -> UpdateResult<Self> {
        if allow_insecure {
            let mut builder = native_tls::TlsConnector::builder();
            builder.danger_accept_invalid_certs(true);
            builder.danger_accept_invalid_hostnames(true);
            let connector = builder
                .build()
                .map_err(|error| UpdateError::TlsConfig(error.to_string()))?;
            Ok(Self {
                agent: AgentBuilder::new()
                    .tls_connector(Arc::new(connector))
                    .build(),
            })
        } else {
            Ok(Self {
                agent: AgentBuilder::new().build(),
            })
        }
    }
}

impl Transport for HttpClient {
    fn get(&self, url: &str, accept: &str) -> UpdateResult<HttpResponse> {
        let result = self
            .agent
            .get(url)
            .set("User-Agent", USER_AGENT)
            .set("Accept", accept)
            .call();
        // ureq reports 4xx/5xx as errors; hand them back as plain responses.
        let response = match result {
            Ok(response) => response,
            Err(ureq::Error::Status(_, response)) => response,
            Err(error) => return Err(error.into()),
        };
        Ok(HttpResponse {
            status: response.status(),
            reason: response.status_text().to_string(),
            body: response.into_reader(),
        })
    }
}
