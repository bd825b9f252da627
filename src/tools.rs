//! The fixed catalog of typed operations the agent driver exposes to the
//! LLM over the backing service.
//!
//! Each [`Tool`] is self-describing (name, description, JSON schema) and
//! self-validating: malformed input produces an error-flagged [`ToolResult`]
//! without any network I/O. The `Tool`/`ToolBuilder`/schema-conversion
//! machinery below is unchanged in shape from the SDK's general-purpose
//! function-calling layer; [`catalog`] is what turns it into the sixteen
//! Turbo-specific operations.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::domain::{BoundedText, IssueType, ListLimit, NonEmptyId, NonNegativeHours, Priority};
use crate::error::{Error, Result};
use crate::http::HttpClient;

/// Type alias for tool handler functions: JSON in, JSON (or error) out.
pub type ToolHandler =
    Arc<dyn Fn(Value) -> Pin<Box<dyn Future<Output = Result<Value>> + Send>> + Send + Sync>;

/// A single catalog entry: identity, schema, read/write classification, and
/// the async handler that executes against the backing service.
#[derive(Clone)]
pub struct Tool {
    name: String,
    description: String,
    input_schema: Value,
    is_write: bool,
    handler: ToolHandler,
}

impl Tool {
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        is_write: bool,
        handler: F,
    ) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: convert_schema_to_openai(input_schema),
            is_write,
            handler: Arc::new(move |args| Box::pin(handler(args))),
        }
    }

    pub async fn execute(&self, arguments: Value) -> Result<Value> {
        (self.handler)(arguments).await
    }

    /// Convert this tool's metadata to the function-calling format the
    /// agent driver presents to the LLM.
    pub fn to_openai_format(&self) -> Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.input_schema
            }
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn input_schema(&self) -> &Value {
        &self.input_schema
    }

    /// `true` for tools that mutate backing-service state.
    pub fn is_write(&self) -> bool {
        self.is_write
    }
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("input_schema", &self.input_schema)
            .field("is_write", &self.is_write)
            .finish()
    }
}

/// Convert a schema given in simple type notation, extended property
/// notation, or full JSON Schema into the normalized JSON Schema form.
fn convert_schema_to_openai(schema: Value) -> Value {
    if schema.is_object() {
        let obj = schema.as_object().expect("checked by is_object above");
        if obj.contains_key("type") && obj.contains_key("properties") {
            return schema;
        }

        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();

        for (param_name, param_type) in obj {
            if let Some(type_str) = param_type.as_str() {
                properties.insert(param_name.clone(), type_to_json_schema(type_str));
                required.push(param_name.clone());
            } else if param_type.is_object() {
                let mut prop = param_type.clone();
                let prop_obj = prop.as_object_mut().expect("checked by is_object above");

                let is_optional = prop_obj
                    .remove("optional")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false);
                let is_required = prop_obj.remove("required").and_then(|v| v.as_bool());
                let has_default = prop_obj.contains_key("default");

                properties.insert(param_name.clone(), prop);

                if let Some(true) = is_required {
                    required.push(param_name.clone());
                } else if is_optional || is_required == Some(false) {
                    // explicitly optional
                } else if !has_default {
                    required.push(param_name.clone());
                }
            }
        }

        return serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required
        });
    }

    serde_json::json!({"type": "object", "properties": {}, "required": []})
}

fn type_to_json_schema(type_str: &str) -> Value {
    let json_type = match type_str {
        "string" | "str" => "string",
        "integer" | "int" | "i32" | "i64" | "u32" | "u64" => "integer",
        "number" | "float" | "f32" | "f64" => "number",
        "boolean" | "bool" => "boolean",
        "array" | "list" | "vec" => "array",
        "object" | "dict" | "map" => "object",
        _ => "string",
    };
    serde_json::json!({ "type": json_type })
}

/// Builder for catalog entries: fluent parameter declaration over
/// [`Tool::new`]'s schema conversion.
pub struct ToolBuilder {
    name: String,
    description: String,
    schema: Value,
    is_write: bool,
}

impl ToolBuilder {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            schema: serde_json::json!({}),
            is_write: false,
        }
    }

    pub fn schema(mut self, schema: Value) -> Self {
        self.schema = schema;
        self
    }

    pub fn write(mut self) -> Self {
        self.is_write = true;
        self
    }

    pub fn build<F, Fut>(self, handler: F) -> Tool
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        Tool::new(self.name, self.description, self.schema, self.is_write, handler)
    }
}

pub fn tool(name: impl Into<String>, description: impl Into<String>) -> ToolBuilder {
    ToolBuilder::new(name, description)
}

/// MCP-style text content block.
#[derive(Debug, Clone, Serialize)]
pub struct TextContent {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
}

/// The result envelope every tool call resolves to: a text-content array,
/// plus an error flag on failure.
#[derive(Debug, Clone, Serialize)]
pub struct ToolResult {
    pub content: Vec<TextContent>,
    #[serde(rename = "isError", skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ToolResult {
    fn ok(value: Value) -> Self {
        let text = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
        ToolResult {
            content: vec![TextContent { kind: "text", text }],
            is_error: false,
        }
    }

    fn err(message: String) -> Self {
        ToolResult {
            content: vec![TextContent {
                kind: "text",
                text: message,
            }],
            is_error: true,
        }
    }
}

/// Render a handler's `Result<Value>` into the agent-facing envelope.
pub fn render_result(result: Result<Value>) -> ToolResult {
    match result {
        Ok(value) => ToolResult::ok(value),
        Err(e) => ToolResult::err(e.agent_message()),
    }
}

fn str_param(args: &Value, field: &str) -> Option<String> {
    args.get(field).and_then(Value::as_str).map(str::to_string)
}

fn u32_param(args: &Value, field: &str) -> Option<u32> {
    args.get(field).and_then(Value::as_u64).map(|v| v as u32)
}

fn f64_param(args: &Value, field: &str) -> Option<f64> {
    args.get(field).and_then(Value::as_f64)
}

fn push_if_some(params: &mut Vec<(String, String)>, key: &str, value: Option<String>) {
    if let Some(v) = value {
        params.push((key.to_string(), v));
    }
}

/// Build the sixteen Turbo tools, each bound to the shared HTTP client.
pub fn catalog(http: Arc<HttpClient>) -> Vec<Tool> {
    vec![
        list_projects(http.clone()),
        get_project(http.clone()),
        get_project_issues(http.clone()),
        list_issues(http.clone()),
        get_issue(http.clone()),
        create_issue(http.clone()),
        update_issue(http.clone()),
        start_issue_work(http.clone()),
        get_work_queue(http.clone()),
        get_next_issue(http.clone()),
        log_work(http.clone()),
        list_initiatives(http.clone()),
        list_decisions(http.clone()),
        create_decision(http.clone()),
        add_comment(http.clone()),
        project_status_summary(http),
    ]
}

fn list_projects(http: Arc<HttpClient>) -> Tool {
    tool(
        "list_projects",
        "List all projects in Turbo with their status and issue counts",
    )
    .schema(serde_json::json!({
        "status": {"type": "string", "optional": true, "description": "Filter by project status"},
        "limit": {"type": "integer", "optional": true, "description": "Max results (1-100)"},
    }))
    .build(move |args| {
        let http = http.clone();
        async move {
            let mut params = Vec::new();
            push_if_some(&mut params, "status", str_param(&args, "status"));
            if let Some(limit) = u32_param(&args, "limit") {
                let limit = ListLimit::new(limit)?;
                params.push(("limit".to_string(), limit.value().to_string()));
            }
            http.get("/projects", Some(&params)).await
        }
    })
}

fn get_project(http: Arc<HttpClient>) -> Tool {
    tool("get_project", "Get detailed information about a specific project")
        .schema(serde_json::json!({
            "project_id": {"type": "string", "description": "UUID of the project"},
        }))
        .build(move |args| {
            let http = http.clone();
            async move {
                let raw = str_param(&args, "project_id").unwrap_or_default();
                let project_id = NonEmptyId::new("project_id", raw)?;
                http.get(&format!("/projects/{}", project_id.as_str()), None)
                    .await
            }
        })
}

fn get_project_issues(http: Arc<HttpClient>) -> Tool {
    tool(
        "get_project_issues",
        "List all issues for a project, optionally filtered by status",
    )
    .schema(serde_json::json!({
        "project_id": {"type": "string", "description": "UUID of the project"},
        "status": {"type": "string", "optional": true, "description": "Filter by issue status"},
    }))
    .build(move |args| {
        let http = http.clone();
        async move {
            let raw = str_param(&args, "project_id").unwrap_or_default();
            let project_id = NonEmptyId::new("project_id", raw)?;
            let mut params = Vec::new();
            push_if_some(&mut params, "status", str_param(&args, "status"));
            http.get(
                &format!("/projects/{}/issues", project_id.as_str()),
                Some(&params),
            )
            .await
        }
    })
}

fn list_issues(http: Arc<HttpClient>) -> Tool {
    tool("list_issues", "List issues across all projects with optional filtering")
        .schema(serde_json::json!({
            "status": {"type": "string", "optional": true},
            "priority": {"type": "string", "optional": true},
            "project_id": {"type": "string", "optional": true},
            "limit": {"type": "integer", "optional": true, "description": "Max results (1-100)"},
        }))
        .build(move |args| {
            let http = http.clone();
            async move {
                let mut params = Vec::new();
                push_if_some(&mut params, "status", str_param(&args, "status"));
                push_if_some(&mut params, "priority", str_param(&args, "priority"));
                push_if_some(&mut params, "project_id", str_param(&args, "project_id"));
                if let Some(limit) = u32_param(&args, "limit") {
                    let limit = ListLimit::new(limit)?;
                    params.push(("limit".to_string(), limit.value().to_string()));
                }
                http.get("/issues", Some(&params)).await
            }
        })
}

fn get_issue(http: Arc<HttpClient>) -> Tool {
    tool(
        "get_issue",
        "Get detailed information about a specific issue by ID or key (e.g. TURBO-1)",
    )
    .schema(serde_json::json!({
        "issue_id": {"type": "string", "description": "UUID or key of the issue"},
    }))
    .build(move |args| {
        let http = http.clone();
        async move {
            let raw = str_param(&args, "issue_id").unwrap_or_default();
            let issue_id = NonEmptyId::new("issue_id", raw)?;
            http.get(&format!("/issues/{}", issue_id.as_str()), None)
                .await
        }
    })
}

fn create_issue(http: Arc<HttpClient>) -> Tool {
    tool("create_issue", "Create a new issue in a project")
        .schema(serde_json::json!({
            "project_id": {"type": "string"},
            "title": {"type": "string", "description": "1-500 characters"},
            "description": {"type": "string", "optional": true},
            "type": {"type": "string", "optional": true, "enum": ["task", "bug", "feature", "improvement"]},
            "priority": {"type": "string", "optional": true, "enum": ["critical", "high", "medium", "low"]},
        }))
        .write()
        .build(move |args| {
            let http = http.clone();
            async move {
                let project_id =
                    NonEmptyId::new("project_id", str_param(&args, "project_id").unwrap_or_default())?;
                let title = BoundedText::new("title", str_param(&args, "title").unwrap_or_default(), 500)?;

                let mut body = serde_json::json!({
                    "project_id": project_id.as_str(),
                    "title": title.as_str(),
                });
                if let Some(description) = str_param(&args, "description") {
                    body["description"] = Value::String(description);
                }
                if let Some(raw) = str_param(&args, "type") {
                    body["type"] = Value::String(IssueType::parse(&raw)?.as_str().to_string());
                }
                if let Some(raw) = str_param(&args, "priority") {
                    body["priority"] = Value::String(Priority::parse(&raw)?.as_str().to_string());
                }

                http.post("/issues", &body).await
            }
        })
}

fn update_issue(http: Arc<HttpClient>) -> Tool {
    tool(
        "update_issue",
        "Update an existing issue's status, priority, title, or description",
    )
    .schema(serde_json::json!({
        "issue_id": {"type": "string"},
        "status": {"type": "string", "optional": true},
        "priority": {"type": "string", "optional": true, "enum": ["critical", "high", "medium", "low"]},
        "title": {"type": "string", "optional": true, "description": "max 500 characters"},
        "description": {"type": "string", "optional": true},
    }))
    .write()
    .build(move |args| {
        let http = http.clone();
        async move {
            let issue_id =
                NonEmptyId::new("issue_id", str_param(&args, "issue_id").unwrap_or_default())?;

            let mut body = serde_json::Map::new();
            if let Some(status) = str_param(&args, "status") {
                body.insert("status".to_string(), Value::String(status));
            }
            if let Some(raw) = str_param(&args, "priority") {
                body.insert(
                    "priority".to_string(),
                    Value::String(Priority::parse(&raw)?.as_str().to_string()),
                );
            }
            if let Some(title) = str_param(&args, "title") {
                let title = BoundedText::new("title", title, 500)?;
                body.insert("title".to_string(), Value::String(title.into_inner()));
            }
            if let Some(description) = str_param(&args, "description") {
                body.insert("description".to_string(), Value::String(description));
            }

            http.patch(&format!("/issues/{}", issue_id.as_str()), &Value::Object(body))
                .await
        }
    })
}

fn start_issue_work(http: Arc<HttpClient>) -> Tool {
    tool("start_issue_work", "Claim an issue and mark it as in_progress")
        .schema(serde_json::json!({"issue_id": {"type": "string"}}))
        .write()
        .build(move |args| {
            let http = http.clone();
            async move {
                let issue_id =
                    NonEmptyId::new("issue_id", str_param(&args, "issue_id").unwrap_or_default())?;
                http.post(
                    &format!("/issues/{}/work", issue_id.as_str()),
                    &serde_json::json!({}),
                )
                .await
            }
        })
}

fn get_work_queue(http: Arc<HttpClient>) -> Tool {
    tool("get_work_queue", "Get the prioritized work queue for a project")
        .schema(serde_json::json!({"project_id": {"type": "string", "optional": true}}))
        .build(move |args| {
            let http = http.clone();
            async move {
                let mut params = vec![("status".to_string(), "queued".to_string())];
                push_if_some(&mut params, "project_id", str_param(&args, "project_id"));
                http.get("/issues", Some(&params)).await
            }
        })
}

fn get_next_issue(http: Arc<HttpClient>) -> Tool {
    tool("get_next_issue", "Get the highest priority issue ready to work on")
        .schema(serde_json::json!({"project_id": {"type": "string", "optional": true}}))
        .build(move |args| {
            let http = http.clone();
            async move {
                let mut params = vec![
                    ("status".to_string(), "ready".to_string()),
                    ("limit".to_string(), "1".to_string()),
                ];
                push_if_some(&mut params, "project_id", str_param(&args, "project_id"));
                http.get("/issues", Some(&params)).await
            }
        })
}

fn log_work(http: Arc<HttpClient>) -> Tool {
    tool("log_work", "Log a work session or progress update on an issue")
        .schema(serde_json::json!({
            "issue_id": {"type": "string"},
            "summary": {"type": "string", "description": "Summary of work done"},
            "hours": {"type": "number", "optional": true, "description": "Hours spent, >= 0"},
        }))
        .write()
        .build(move |args| {
            let http = http.clone();
            async move {
                let issue_id =
                    NonEmptyId::new("issue_id", str_param(&args, "issue_id").unwrap_or_default())?;
                let summary_raw = str_param(&args, "summary").unwrap_or_default();
                if summary_raw.trim().is_empty() {
                    return Err(Error::validation("summary must not be empty"));
                }

                let mut body = serde_json::json!({"summary": summary_raw});
                if let Some(hours) = f64_param(&args, "hours") {
                    let hours = NonNegativeHours::new(hours)?;
                    body["hours"] = serde_json::json!(hours.value());
                }

                http.post(&format!("/issues/{}/work-logs", issue_id.as_str()), &body)
                    .await
            }
        })
}

fn list_initiatives(http: Arc<HttpClient>) -> Tool {
    tool("list_initiatives", "List all initiatives with their status and linked issues")
        .schema(serde_json::json!({"status": {"type": "string", "optional": true}}))
        .build(move |args| {
            let http = http.clone();
            async move {
                let mut params = Vec::new();
                push_if_some(&mut params, "status", str_param(&args, "status"));
                http.get("/initiatives", Some(&params)).await
            }
        })
}

fn list_decisions(http: Arc<HttpClient>) -> Tool {
    tool("list_decisions", "List strategic decisions")
        .schema(serde_json::json!({"status": {"type": "string", "optional": true}}))
        .build(move |args| {
            let http = http.clone();
            async move {
                let mut params = Vec::new();
                push_if_some(&mut params, "status", str_param(&args, "status"));
                http.get("/decisions", Some(&params)).await
            }
        })
}

fn create_decision(http: Arc<HttpClient>) -> Tool {
    tool("create_decision", "Record a strategic or tactical decision")
        .schema(serde_json::json!({
            "title": {"type": "string", "description": "1-500 characters"},
            "description": {"type": "string", "description": "What was decided"},
            "decision_type": {"type": "string", "optional": true, "enum": ["strategic", "tactical"]},
            "rationale": {"type": "string", "optional": true},
        }))
        .write()
        .build(move |args| {
            let http = http.clone();
            async move {
                let title = BoundedText::new("title", str_param(&args, "title").unwrap_or_default(), 500)?;
                let description_raw = str_param(&args, "description").unwrap_or_default();
                if description_raw.trim().is_empty() {
                    return Err(Error::validation("description must not be empty"));
                }

                let mut body = serde_json::json!({
                    "title": title.as_str(),
                    "description": description_raw,
                });
                if let Some(raw) = str_param(&args, "decision_type") {
                    if raw != "strategic" && raw != "tactical" {
                        return Err(Error::validation(format!(
                            "decision_type must be one of strategic, tactical (got '{raw}')"
                        )));
                    }
                    body["decision_type"] = Value::String(raw);
                }
                if let Some(rationale) = str_param(&args, "rationale") {
                    body["rationale"] = Value::String(rationale);
                }

                http.post("/decisions", &body).await
            }
        })
}

fn add_comment(http: Arc<HttpClient>) -> Tool {
    tool("add_comment", "Add a comment to an issue or other entity")
        .schema(serde_json::json!({
            "entity_type": {"type": "string", "enum": ["issue", "project", "initiative", "decision"]},
            "entity_id": {"type": "string"},
            "content": {"type": "string"},
        }))
        .write()
        .build(move |args| {
            let http = http.clone();
            async move {
                let entity_type = str_param(&args, "entity_type").unwrap_or_default();
                if !["issue", "project", "initiative", "decision"].contains(&entity_type.as_str()) {
                    return Err(Error::validation(format!(
                        "entity_type must be one of issue, project, initiative, decision (got '{entity_type}')"
                    )));
                }
                let entity_id =
                    NonEmptyId::new("entity_id", str_param(&args, "entity_id").unwrap_or_default())?;
                let content_raw = str_param(&args, "content").unwrap_or_default();
                if content_raw.trim().is_empty() {
                    return Err(Error::validation("content must not be empty"));
                }

                let body = serde_json::json!({
                    "entity_type": entity_type,
                    "entity_id": entity_id.as_str(),
                    "content": content_raw,
                });
                http.post("/comments", &body).await
            }
        })
}

fn project_status_summary(http: Arc<HttpClient>) -> Tool {
    tool(
        "project_status_summary",
        "Get a high-level status summary of a project: open issues, blockers, recent activity",
    )
    .schema(serde_json::json!({"project_id": {"type": "string"}}))
    .build(move |args| {
        let http = http.clone();
        async move {
            let project_id =
                NonEmptyId::new("project_id", str_param(&args, "project_id").unwrap_or_default())?;

            let project = http
                .get(&format!("/projects/{}", project_id.as_str()), None)
                .await?;
            let issues = http
                .get(
                    &format!("/projects/{}/issues", project_id.as_str()),
                    Some(&[("limit".to_string(), "100".to_string())]),
                )
                .await?;

            let issue_list: Vec<Value> = issues
                .as_array()
                .cloned()
                .or_else(|| issues.get("items").and_then(Value::as_array).cloned())
                .unwrap_or_default();

            let mut by_status = serde_json::Map::new();
            let mut high_priority_open = Vec::new();

            for issue in &issue_list {
                let status = issue.get("status").and_then(Value::as_str).unwrap_or("unknown");
                let count = by_status.get(status).and_then(Value::as_i64).unwrap_or(0);
                by_status.insert(status.to_string(), serde_json::json!(count + 1));

                let priority = issue.get("priority").and_then(Value::as_str).unwrap_or("");
                if (priority == "critical" || priority == "high")
                    && status != "closed"
                    && status != "done"
                {
                    let key = issue
                        .get("issue_key")
                        .or_else(|| issue.get("key"))
                        .cloned()
                        .unwrap_or(Value::Null);
                    high_priority_open.push(serde_json::json!({
                        "key": key,
                        "title": issue.get("title").cloned().unwrap_or(Value::Null),
                        "priority": priority,
                        "status": status,
                    }));
                }
            }

            Ok(serde_json::json!({
                "project": project.get("name").cloned().unwrap_or(Value::Null),
                "total_issues": issue_list.len(),
                "by_status": by_status,
                "high_priority_open": high_priority_open,
            }))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn convert_simple_schema_marks_all_required() {
        let schema = json!({"location": "string", "units": "string"});
        let result = convert_schema_to_openai(schema);
        assert_eq!(result["type"], "object");
        assert_eq!(result["properties"]["location"]["type"], "string");
        assert_eq!(result["required"], json!(["location", "units"]));
    }

    #[test]
    fn convert_full_schema_passes_through() {
        let schema = json!({"type": "object", "properties": {"name": {"type": "string"}}, "required": ["name"]});
        assert_eq!(convert_schema_to_openai(schema.clone()), schema);
    }

    #[test]
    fn extended_schema_honours_optional_flag() {
        let schema = json!({
            "query": {"type": "string"},
            "limit": {"type": "integer", "optional": true},
        });
        let result = convert_schema_to_openai(schema);
        let required = result["required"].as_array().unwrap();
        assert!(required.iter().any(|v| v == "query"));
        assert!(!required.iter().any(|v| v == "limit"));
    }

    #[tokio::test]
    async fn get_project_rejects_empty_project_id_without_network() {
        let http = Arc::new(HttpClient::new("http://127.0.0.1:1", None));
        let t = get_project(http);
        let result = t.execute(json!({"project_id": ""})).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
    }

    #[tokio::test]
    async fn create_issue_rejects_unknown_type() {
        let http = Arc::new(HttpClient::new("http://127.0.0.1:1", None));
        let t = create_issue(http);
        let result = t
            .execute(json!({"project_id": "P1", "title": "x", "type": "epic"}))
            .await;
        assert!(matches!(result, Err(Error::Validation { .. })));
    }

    #[tokio::test]
    async fn list_projects_round_trips_through_http() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/projects/"))
            .and(query_param("status", "active"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "P1"}])))
            .mount(&server)
            .await;

        let http = Arc::new(HttpClient::new(server.uri(), None));
        let t = list_projects(http);
        let result = t.execute(json!({"status": "active"})).await.unwrap();
        assert_eq!(result, json!([{"id": "P1"}]));
    }

    #[tokio::test]
    async fn project_status_summary_computes_high_priority_open() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/projects/P1/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "Turbo"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/projects/P1/issues/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"issue_key": "T-1", "title": "Fix it", "priority": "critical", "status": "open"},
                {"issue_key": "T-2", "title": "Done one", "priority": "high", "status": "done"},
                {"issue_key": "T-3", "title": "Low pri", "priority": "low", "status": "open"},
            ])))
            .mount(&server)
            .await;

        let http = Arc::new(HttpClient::new(server.uri(), None));
        let t = project_status_summary(http);
        let result = t.execute(json!({"project_id": "P1"})).await.unwrap();

        assert_eq!(result["project"], "Turbo");
        assert_eq!(result["total_issues"], 3);
        assert_eq!(result["high_priority_open"].as_array().unwrap().len(), 1);
        assert_eq!(result["high_priority_open"][0]["key"], "T-1");
    }

    #[test]
    fn render_result_flags_errors() {
        let ok = render_result(Ok(json!({"a": 1})));
        assert!(!ok.is_error);
        let err = render_result(Err(Error::validation("bad")));
        assert!(err.is_error);
        assert!(err.content[0].text.starts_with("Invalid input:"));
    }
}
