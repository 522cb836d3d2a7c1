// Tratos
// Copyright 2026 The Tratos Authors
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! REST service that keeps track of the feed given to livestock batches.

// Keep these in sync with other top-level files.
#![warn(anonymous_parameters, bad_style, clippy::missing_docs_in_private_items, missing_docs)]
#![warn(unused, unused_extern_crates, unused_import_braces, unused_qualifications)]
#![warn(unsafe_code)]

use log::{info, warn};
use std::error::Error;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tratos_core::clocks::Clock;
use tratos_core::db::Db;
use tratos_core::env::{get_optional_var, get_required_var};

pub mod db;
mod driver;
use driver::Driver;
pub mod model;
mod rest;
use rest::app;

/// Default value for the `DESCRIPTION` setting when not specified.
const DEFAULT_API_DESCRIPTION: &str = "Feeding event tracking API";

/// Descriptive metadata of the service.
#[derive(Clone, Debug)]
#[cfg_attr(test, derive(PartialEq))]
pub struct ApiOptions {
    /// Title of the API.
    pub title: String,

    /// Version of the API.
    pub version: String,

    /// Free-form description of the API.
    pub description: String,
}

impl ApiOptions {
    /// Creates a new set of options from environment variables whose name is prefixed by `prefix`.
    pub fn from_env(prefix: &str) -> Result<Self, String> {
        Ok(Self {
            title: get_required_var::<String>(prefix, "TITLE")?,
            version: get_required_var::<String>(prefix, "VERSION")?,
            description: get_optional_var::<String>(prefix, "DESCRIPTION")?
                .unwrap_or_else(|| DEFAULT_API_DESCRIPTION.to_owned()),
        })
    }
}

/// Network settings of the service.
#[derive(Clone, Debug)]
#[cfg_attr(test, derive(PartialEq))]
pub struct ServerOptions {
    /// Address to listen on.
    pub host: IpAddr,

    /// Port to listen on.
    pub port: u16,

    /// Whether to enable verbose logging, including the SQL statements sent to the database.
    pub debug: bool,
}

impl ServerOptions {
    /// Creates a new set of options from environment variables whose name is prefixed by `prefix`.
    pub fn from_env(prefix: &str) -> Result<Self, String> {
        Ok(Self {
            host: get_required_var::<IpAddr>(prefix, "HOST")?,
            port: get_required_var::<u16>(prefix, "PORT")?,
            debug: get_required_var::<bool>(prefix, "DEBUG")?,
        })
    }

    /// Returns the socket address to bind to.
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Waits until the process is asked to terminate.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutting down"),
        Err(e) => warn!("Unable to listen for shutdown signal: {}", e),
    }
}

/// Instantiates all resources to serve the application on `bind_addr` until interrupted.
///
/// The `db` must have its schema initialized.  It is not closed on return: the caller owns it and
/// must close it once this returns, whether successfully or not.
///
/// While it'd be nice to push this responsibility to `main`, doing so would force us to expose many
/// crate-internal types to the public, which in turn would make dead code detection harder.
pub async fn serve(
    bind_addr: impl Into<SocketAddr>,
    db: Arc<dyn Db + Send + Sync>,
    clock: Arc<dyn Clock + Send + Sync>,
) -> Result<(), Box<dyn Error>> {
    let driver = Driver::new(db, clock);
    let app = app(driver);

    let listener = tokio::net::TcpListener::bind(bind_addr.into()).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_api_options_from_env_all_present() {
        let overrides = [
            ("API_TITLE", Some("Tratos")),
            ("API_VERSION", Some("1.0.0")),
            ("API_DESCRIPTION", Some("Custom")),
        ];
        temp_env::with_vars(overrides, || {
            let opts = ApiOptions::from_env("API").unwrap();
            assert_eq!(
                ApiOptions {
                    title: "Tratos".to_owned(),
                    version: "1.0.0".to_owned(),
                    description: "Custom".to_owned(),
                },
                opts
            );
        });
    }

    #[test]
    fn test_api_options_from_env_default_description() {
        let overrides = [
            ("API_TITLE", Some("Tratos")),
            ("API_VERSION", Some("1.0.0")),
            ("API_DESCRIPTION", None),
        ];
        temp_env::with_vars(overrides, || {
            let opts = ApiOptions::from_env("API").unwrap();
            assert_eq!(DEFAULT_API_DESCRIPTION, opts.description);
        });
    }

    #[test]
    fn test_api_options_from_env_missing() {
        let overrides = [("API_TITLE", Some("Tratos")), ("API_VERSION", None::<&str>)];
        temp_env::with_vars(overrides, || {
            let err = ApiOptions::from_env("API").unwrap_err();
            assert!(err.contains("API_VERSION not present"));
        });
    }

    #[test]
    fn test_server_options_from_env_ok() {
        let overrides = [
            ("SERVER_HOST", Some("127.0.0.1")),
            ("SERVER_PORT", Some("8000")),
            ("SERVER_DEBUG", Some("true")),
        ];
        temp_env::with_vars(overrides, || {
            let opts = ServerOptions::from_env("SERVER").unwrap();
            assert_eq!(
                ServerOptions { host: IpAddr::V4(Ipv4Addr::LOCALHOST), port: 8000, debug: true },
                opts
            );
            assert_eq!(SocketAddr::from((Ipv4Addr::LOCALHOST, 8000)), opts.bind_addr());
        });
    }

    #[test]
    fn test_server_options_from_env_bad_types() {
        let overrides = [
            ("SERVER_HOST", Some("0.0.0.0")),
            ("SERVER_PORT", Some("not-a-port")),
            ("SERVER_DEBUG", Some("false")),
        ];
        temp_env::with_vars(overrides, || {
            let err = ServerOptions::from_env("SERVER").unwrap_err();
            assert!(err.contains("SERVER_PORT"));
        });

        let overrides = [
            ("SERVER_HOST", Some("0.0.0.0")),
            ("SERVER_PORT", Some("8000")),
            ("SERVER_DEBUG", Some("maybe")),
        ];
        temp_env::with_vars(overrides, || {
            let err = ServerOptions::from_env("SERVER").unwrap_err();
            assert!(err.contains("SERVER_DEBUG"));
        });
    }
}
