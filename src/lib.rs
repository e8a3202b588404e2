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

pub mod allocation;
pub mod app;
pub mod args;
pub mod config;
pub mod corpus;
pub mod error;
pub mod os_logs;
pub mod progress_log;
pub mod promoter;
pub mod reader;
pub mod reporter;
pub mod stats;
pub mod summarizer;
pub mod table;
pub mod test_name;
pub mod validator;

pub use app::{BatchTally, PerftestDigestApp, exit_code};
pub use args::PerftestDigestArgs;
pub use config::DigestConfig;
pub use error::{DigestError, Result};
pub use reporter::{MemoryReporter, Reporter, Stage, TracingReporter};
