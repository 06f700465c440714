// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Total conversions between adjacent command shapes.
//!
//! Fields present in both shapes are copied unchanged. Fields missing from
//! the source get a fixed default: a missing mutex name becomes
//! [`DEFAULT_MUTEX_NAME`], a missing ticket or context is supplied by the caller.

use tend_core::{IsolationConfiguration, ScriptTicket, DEFAULT_MUTEX_NAME};

use crate::contracts::{
    ExecutionContext, PodImageConfiguration, StartKubernetesScriptCommandV1, StartKubernetesScriptCommandV1Alpha,
    StartScriptCommand, StartScriptCommandV2, StartScriptCommandV3Alpha,
};

impl StartKubernetesScriptCommandV1Alpha {
    pub fn to_v1(&self) -> StartKubernetesScriptCommandV1 {
        StartKubernetesScriptCommandV1 {
            script_ticket: self.script_ticket.clone(),
            task_id: self.task_id.clone(),
            script_body: self.script_body.clone(),
            arguments: self.arguments.clone(),
            isolation: self.isolation,
            mutex_timeout: self.mutex_timeout,
            isolation_mutex_name: self
                .isolation_mutex_name
                .clone()
                .unwrap_or_else(|| DEFAULT_MUTEX_NAME.to_string()),
            pod_image_configuration: self.pod_image_configuration.clone(),
            service_account_name: self.service_account_name.clone(),
            scripts: self.scripts.clone(),
            files: self.files.clone(),
        }
    }
}

impl StartKubernetesScriptCommandV1 {
    pub fn to_v1_alpha(&self) -> StartKubernetesScriptCommandV1Alpha {
        StartKubernetesScriptCommandV1Alpha {
            script_ticket: self.script_ticket.clone(),
            task_id: self.task_id.clone(),
            script_body: self.script_body.clone(),
            arguments: self.arguments.clone(),
            isolation: self.isolation,
            mutex_timeout: self.mutex_timeout,
            isolation_mutex_name: Some(self.isolation_mutex_name.clone()),
            pod_image_configuration: self.pod_image_configuration.clone(),
            service_account_name: self.service_account_name.clone(),
            scripts: self.scripts.clone(),
            files: self.files.clone(),
        }
    }

    pub fn isolation_configuration(&self) -> IsolationConfiguration {
        IsolationConfiguration::new(self.isolation, Some(&self.isolation_mutex_name), self.mutex_timeout)
    }
}

impl StartScriptCommand {
    /// Attach a caller-chosen ticket, producing the v2 shape.
    pub fn to_v2(&self, script_ticket: ScriptTicket) -> StartScriptCommandV2 {
        StartScriptCommandV2 {
            script_body: self.script_body.clone(),
            isolation: self.isolation,
            mutex_timeout: self.mutex_timeout,
            isolation_mutex_name: self.isolation_mutex_name.clone(),
            arguments: self.arguments.clone(),
            task_id: self.task_id.clone(),
            script_ticket,
            duration_to_wait_for_script_to_finish: None,
            execution_properties: Default::default(),
            scripts: self.scripts.clone(),
            files: self.files.clone(),
        }
    }

    pub fn isolation_configuration(&self) -> IsolationConfiguration {
        IsolationConfiguration::new(self.isolation, self.isolation_mutex_name.as_deref(), self.mutex_timeout)
    }
}

impl StartScriptCommandV2 {
    /// Drop the ticket and wait duration; v1 agents allocate their own ticket.
    pub fn to_v1(&self) -> StartScriptCommand {
        StartScriptCommand {
            script_body: self.script_body.clone(),
            isolation: self.isolation,
            mutex_timeout: self.mutex_timeout,
            isolation_mutex_name: self.isolation_mutex_name.clone(),
            arguments: self.arguments.clone(),
            task_id: self.task_id.clone(),
            scripts: self.scripts.clone(),
            files: self.files.clone(),
        }
    }

    pub fn to_v3_alpha(&self, execution_context: ExecutionContext) -> StartScriptCommandV3Alpha {
        StartScriptCommandV3Alpha {
            script_body: self.script_body.clone(),
            isolation: self.isolation,
            mutex_timeout: self.mutex_timeout,
            isolation_mutex_name: self.isolation_mutex_name.clone(),
            arguments: self.arguments.clone(),
            task_id: self.task_id.clone(),
            script_ticket: self.script_ticket.clone(),
            duration_to_wait_for_script_to_finish: self.duration_to_wait_for_script_to_finish,
            execution_context,
            scripts: self.scripts.clone(),
            files: self.files.clone(),
        }
    }

    pub fn to_kubernetes_v1(
        &self,
        pod_image_configuration: Option<PodImageConfiguration>,
        service_account_name: Option<String>,
    ) -> StartKubernetesScriptCommandV1 {
        StartKubernetesScriptCommandV1 {
            script_ticket: self.script_ticket.clone(),
            task_id: self.task_id.clone(),
            script_body: self.script_body.clone(),
            arguments: self.arguments.clone(),
            isolation: self.isolation,
            mutex_timeout: self.mutex_timeout,
            isolation_mutex_name: self
                .isolation_mutex_name
                .clone()
                .unwrap_or_else(|| DEFAULT_MUTEX_NAME.to_string()),
            pod_image_configuration,
            service_account_name,
            scripts: self.scripts.clone(),
            files: self.files.clone(),
        }
    }

    pub fn isolation_configuration(&self) -> IsolationConfiguration {
        IsolationConfiguration::new(self.isolation, self.isolation_mutex_name.as_deref(), self.mutex_timeout)
    }
}

impl StartScriptCommandV3Alpha {
    /// Drop the execution context. Only meaningful for [`ExecutionContext::LocalShell`].
    pub fn to_v2(&self) -> StartScriptCommandV2 {
        StartScriptCommandV2 {
            script_body: self.script_body.clone(),
            isolation: self.isolation,
            mutex_timeout: self.mutex_timeout,
            isolation_mutex_name: self.isolation_mutex_name.clone(),
            arguments: self.arguments.clone(),
            task_id: self.task_id.clone(),
            script_ticket: self.script_ticket.clone(),
            duration_to_wait_for_script_to_finish: self.duration_to_wait_for_script_to_finish,
            execution_properties: Default::default(),
            scripts: self.scripts.clone(),
            files: self.files.clone(),
        }
    }
}

#[cfg(test)]
#[path = "convert_tests.rs"]
mod tests;
