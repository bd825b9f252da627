//! Named subagent roles: fixed, narrower tool subsets of the full catalog,
//! each pinned to a model tier appropriate to its job.
//!
//! A role is a policy object, not a running thing — [`Role::tool_names`]
//! is what the driver consults when deciding which catalog entries to hand
//! an LLM turn for that role, and [`TOOL_NAMESPACE`]-prefixing happens at
//! the call site so this module stays agnostic of wire format.

use crate::hooks::TOOL_NAMESPACE;

/// A named subagent role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Reads project/issue state and classifies, but never mutates.
    Triager,
    /// Turns triage findings into new issues and decisions.
    Planner,
    /// Summarizes status for humans; can leave comments.
    Reporter,
    /// Pulls from the work queue and executes issues end to end.
    Worker,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Triager, Role::Planner, Role::Reporter, Role::Worker];

    pub fn name(&self) -> &'static str {
        match self {
            Role::Triager => "triager",
            Role::Planner => "planner",
            Role::Reporter => "reporter",
            Role::Worker => "worker",
        }
    }

    /// Bare (unprefixed) tool names this role may call.
    pub fn tool_names(&self) -> &'static [&'static str] {
        match self {
            Role::Triager => &[
                "list_projects",
                "get_project",
                "get_project_issues",
                "list_issues",
                "get_issue",
                "project_status_summary",
            ],
            Role::Planner => &[
                "list_projects",
                "get_project",
                "get_project_issues",
                "list_issues",
                "get_issue",
                "create_issue",
                "create_decision",
                "list_initiatives",
            ],
            Role::Reporter => &[
                "list_projects",
                "get_project",
                "get_project_issues",
                "project_status_summary",
                "list_issues",
                "get_issue",
                "add_comment",
            ],
            Role::Worker => &[
                "get_work_queue",
                "get_next_issue",
                "get_issue",
                "start_issue_work",
                "update_issue",
                "log_work",
            ],
        }
    }

    /// Namespaced tool names (`mcp__turbo__<name>`) as the driver presents
    /// them to the LLM's function-calling interface.
    pub fn namespaced_tool_names(&self) -> Vec<String> {
        self.tool_names()
            .iter()
            .map(|name| format!("{TOOL_NAMESPACE}{name}"))
            .collect()
    }

    /// Model tier this role runs under, honouring the smart/fast overrides.
    pub fn model(&self) -> String {
        match self {
            Role::Triager | Role::Planner | Role::Worker => crate::config::smart_model(),
            Role::Reporter => crate::config::fast_model(),
        }
    }

    /// `true` if every tool in this role's subset is read-only, i.e. none
    /// of the catalog's write operations are reachable.
    pub fn is_read_only(&self, write_tool_names: &[&str]) -> bool {
        self.tool_names()
            .iter()
            .all(|name| !write_tool_names.contains(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WRITE_TOOLS: &[&str] = &[
        "create_issue",
        "update_issue",
        "start_issue_work",
        "log_work",
        "create_decision",
        "add_comment",
    ];

    #[test]
    fn triager_is_strictly_read_only() {
        assert!(Role::Triager.is_read_only(WRITE_TOOLS));
    }

    #[test]
    fn planner_reporter_worker_include_at_least_one_write_tool() {
        assert!(!Role::Planner.is_read_only(WRITE_TOOLS));
        assert!(!Role::Reporter.is_read_only(WRITE_TOOLS));
        assert!(!Role::Worker.is_read_only(WRITE_TOOLS));
    }

    #[test]
    fn every_role_tool_is_namespaced_consistently() {
        for role in Role::ALL {
            for name in role.namespaced_tool_names() {
                assert!(name.starts_with(TOOL_NAMESPACE));
            }
        }
    }

    #[test]
    fn reporter_uses_fast_model_others_use_smart_model() {
        assert_eq!(Role::Reporter.model(), crate::config::fast_model());
        assert_eq!(Role::Triager.model(), crate::config::smart_model());
        assert_eq!(Role::Planner.model(), crate::config::smart_model());
        assert_eq!(Role::Worker.model(), crate::config::smart_model());
    }

    #[test]
    fn role_name_round_trips_for_every_variant() {
        let names: Vec<&str> = Role::ALL.iter().map(Role::name).collect();
        assert_eq!(names, vec!["triager", "planner", "reporter", "worker"]);
    }
}
