// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use anyhow::Result;
use clap::Parser;
use perftest_digest::{PerftestDigestApp, PerftestDigestArgs, TracingReporter, exit_code};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    let args = PerftestDigestArgs::parse();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(env_filter)
        .try_init()?;

    info!("Starting perftest-digest with args: {:?}", args);

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(exit_code(&e));
    }

    let app = match PerftestDigestApp::new(args) {
        Ok(app) => app,
        Err(e) => {
            error!("Configuration error: {:#}", e);
            std::process::exit(exit_code(&e));
        }
    };

    match app.run(&TracingReporter) {
        Ok(tally) => {
            info!("Digest result: {:?}", tally);
            Ok(())
        }
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(exit_code(&e));
        }
    }
}
