// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Payload shapes for every script service version.
//!
//! Status requests and responses have the same fields in every version and
//! share one struct; the envelope's `$type` carries the version. Start
//! commands differ per version.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tend_core::isolation::{duration_ms, opt_duration_ms};
use tend_core::{ProcessOutput, ProcessState, ScriptFile, ScriptIsolationLevel, ScriptTicket, ScriptType};

/// v1: the agent allocates the ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartScriptCommand {
    pub script_body: String,
    pub isolation: ScriptIsolationLevel,
    #[serde(with = "duration_ms")]
    pub mutex_timeout: Duration,
    #[serde(default)]
    pub isolation_mutex_name: Option<String>,
    #[serde(default)]
    pub arguments: Vec<String>,
    pub task_id: String,
    #[serde(default)]
    pub scripts: BTreeMap<ScriptType, String>,
    #[serde(default)]
    pub files: Vec<ScriptFile>,
}

/// v2: the caller supplies the ticket, which makes start idempotent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartScriptCommandV2 {
    pub script_body: String,
    pub isolation: ScriptIsolationLevel,
    #[serde(with = "duration_ms")]
    pub mutex_timeout: Duration,
    #[serde(default)]
    pub isolation_mutex_name: Option<String>,
    #[serde(default)]
    pub arguments: Vec<String>,
    pub task_id: String,
    pub script_ticket: ScriptTicket,
    #[serde(default, with = "opt_duration_ms")]
    pub duration_to_wait_for_script_to_finish: Option<Duration>,
    #[serde(default)]
    pub execution_properties: BTreeMap<String, String>,
    #[serde(default)]
    pub scripts: BTreeMap<ScriptType, String>,
    #[serde(default)]
    pub files: Vec<ScriptFile>,
}

/// Where a v3-alpha script runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ExecutionContext {
    LocalShell,
    KubernetesJob {
        #[serde(default)]
        container_image: Option<String>,
        #[serde(default)]
        service_account_name: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartScriptCommandV3Alpha {
    pub script_body: String,
    pub isolation: ScriptIsolationLevel,
    #[serde(with = "duration_ms")]
    pub mutex_timeout: Duration,
    #[serde(default)]
    pub isolation_mutex_name: Option<String>,
    #[serde(default)]
    pub arguments: Vec<String>,
    pub task_id: String,
    pub script_ticket: ScriptTicket,
    #[serde(default, with = "opt_duration_ms")]
    pub duration_to_wait_for_script_to_finish: Option<Duration>,
    pub execution_context: ExecutionContext,
    #[serde(default)]
    pub scripts: BTreeMap<ScriptType, String>,
    #[serde(default)]
    pub files: Vec<ScriptFile>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodImageConfiguration {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub feed_url: Option<String>,
    #[serde(default)]
    pub feed_username: Option<String>,
    #[serde(default)]
    pub feed_password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartKubernetesScriptCommandV1Alpha {
    pub script_ticket: ScriptTicket,
    pub task_id: String,
    pub script_body: String,
    #[serde(default)]
    pub arguments: Vec<String>,
    pub isolation: ScriptIsolationLevel,
    #[serde(with = "duration_ms")]
    pub mutex_timeout: Duration,
    #[serde(default)]
    pub isolation_mutex_name: Option<String>,
    #[serde(default)]
    pub pod_image_configuration: Option<PodImageConfiguration>,
    #[serde(default)]
    pub service_account_name: Option<String>,
    #[serde(default)]
    pub scripts: BTreeMap<ScriptType, String>,
    #[serde(default)]
    pub files: Vec<ScriptFile>,
}

/// Same as v1-alpha, but the mutex name is always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartKubernetesScriptCommandV1 {
    pub script_ticket: ScriptTicket,
    pub task_id: String,
    pub script_body: String,
    #[serde(default)]
    pub arguments: Vec<String>,
    pub isolation: ScriptIsolationLevel,
    #[serde(with = "duration_ms")]
    pub mutex_timeout: Duration,
    pub isolation_mutex_name: String,
    #[serde(default)]
    pub pod_image_configuration: Option<PodImageConfiguration>,
    #[serde(default)]
    pub service_account_name: Option<String>,
    #[serde(default)]
    pub scripts: BTreeMap<ScriptType, String>,
    #[serde(default)]
    pub files: Vec<ScriptFile>,
}

/// GetStatus / CancelScript / CompleteScript input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptStatusRequest {
    pub ticket: ScriptTicket,
    pub last_log_sequence: i64,
}

impl ScriptStatusRequest {
    pub fn new(ticket: ScriptTicket, last_log_sequence: i64) -> Self {
        Self { ticket, last_log_sequence }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptStatusResponse {
    pub ticket: ScriptTicket,
    pub state: ProcessState,
    pub exit_code: i32,
    pub logs: Vec<ProcessOutput>,
    pub next_log_sequence: i64,
}

/// v1 StartScript result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketResponse {
    pub ticket: ScriptTicket,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteErrorKind {
    /// The agent does not host the requested service
    ServiceNotFound,
    /// The request was understood but could not be carried out
    Failure,
}

tend_core::simple_display! {
    RemoteErrorKind {
        ServiceNotFound => "service not found",
        Failure => "failure",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub kind: RemoteErrorKind,
    pub message: String,
}
