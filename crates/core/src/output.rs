// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessOutputSource {
    Debug,
    StdOut,
    StdErr,
}

crate::simple_display! {
    ProcessOutputSource {
        Debug => "debug",
        StdOut => "stdout",
        StdErr => "stderr",
    }
}

/// One line of output captured from a running script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessOutput {
    pub source: ProcessOutputSource,
    pub text: String,
    pub occurred: DateTime<Utc>,
}

impl ProcessOutput {
    pub fn new(source: ProcessOutputSource, text: impl Into<String>, occurred: DateTime<Utc>) -> Self {
        Self { source, text: text.into(), occurred }
    }
}
