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

//! Entry point to the feeding event service.

// Keep these in sync with other top-level files.
#![warn(anonymous_parameters, bad_style, clippy::missing_docs_in_private_items, missing_docs)]
#![warn(unused, unused_extern_crates, unused_import_braces, unused_qualifications)]
#![warn(unsafe_code)]

use log::{error, info};
use std::error::Error;
use std::process;
use std::sync::Arc;
use tratos::db::init_schema;
use tratos::{ApiOptions, ServerOptions, serve};
use tratos_core::clocks::SystemClock;
use tratos_core::db::Db;
use tratos_core::db::postgres::{PostgresDb, PostgresOptions};
use tratos_core::env::load_env_file;

/// Unwraps a configuration `result` or terminates the process with a description of the problem.
fn config_or_exit<T>(result: Result<T, String>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            process::exit(2);
        }
    }
}

/// Initializes the database schema and serves requests until interrupted.
async fn run(db: Arc<PostgresDb>, server_opts: &ServerOptions) -> Result<(), Box<dyn Error>> {
    init_schema(&mut db.ex().await?).await?;
    info!("Database schema ready");

    serve(server_opts.bind_addr(), db, Arc::from(SystemClock::default())).await
}

#[tokio::main]
async fn main() {
    config_or_exit(load_env_file(".env"));

    let server_opts = config_or_exit(ServerOptions::from_env("SERVER"));
    let default_filter = if server_opts.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let api_opts = config_or_exit(ApiOptions::from_env("API"));
    let mut db_opts = config_or_exit(PostgresOptions::from_env("DB"));
    db_opts.log_statements = server_opts.debug;
    info!("Starting {} {}: {}", api_opts.title, api_opts.version, api_opts.description);

    let db = match PostgresDb::connect(db_opts) {
        Ok(db) => Arc::from(db),
        Err(e) => {
            error!("Cannot configure database connection: {}", e);
            process::exit(1);
        }
    };

    let result = run(db.clone(), &server_opts).await;
    db.close().await;
    if let Err(e) = result {
        error!("{}", e);
        process::exit(1);
    }
}
