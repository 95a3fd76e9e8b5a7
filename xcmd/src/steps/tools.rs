//! The two tools offered to agentic steps: `shell` and `complete`.

use anyhow::Result;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::core::confirm::approves_tool_call;
use crate::core::template::TemplateValues;
use crate::io::console;
use crate::io::llm::{ContentBlock, ToolDefinition};
use crate::io::prompt::{complete_tool_description, shell_tool_description};
use crate::io::shell::{ShellExecutionError, ShellMode};
use crate::steps::Runtime;

pub const SHELL_TOOL: &str = "shell";
pub const COMPLETE_TOOL: &str = "complete";

/// Returned to the model after `complete`; the caller discards it.
pub const COMPLETED_RESULT: &str = "Workflow completed.";
pub const CANCELLED_RESULT: &str = "Command execution cancelled by user.";

pub fn agentic_tools(values: &TemplateValues) -> Result<Vec<ToolDefinition>> {
    Ok(vec![
        ToolDefinition {
            name: SHELL_TOOL.to_string(),
            description: shell_tool_description(values)?,
            input_schema: json!({
                "type": "object",
                "properties": {
                    "command": {
                        "type": "string",
                        "description": "The shell command to execute"
                    }
                },
                "required": ["command"]
            }),
        },
        ToolDefinition {
            name: COMPLETE_TOOL.to_string(),
            description: complete_tool_description()?,
            input_schema: json!({
                "type": "object",
                "properties": {
                    "output": {
                        "type": "string",
                        "description": "The final output or result of the task"
                    }
                },
                "required": ["output"]
            }),
        },
    ])
}

/// Content and error flag of one `tool_result` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolReply {
    pub content: String,
    pub is_error: bool,
}

impl ToolReply {
    pub fn ok(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }

    pub fn into_block(self, tool_use_id: &str) -> ContentBlock {
        ContentBlock::ToolResult {
            tool_use_id: tool_use_id.to_string(),
            content: self.content,
            is_error: self.is_error,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ShellInput {
    command: String,
}

/// Run (or, if declined, skip) a shell command requested by the model.
///
/// Declining is not an error for the model; a failing command is.
pub fn run_shell_tool(rt: &Runtime<'_>, input: &Value, auto_execute: bool) -> Result<ToolReply> {
    let params: ShellInput = match serde_json::from_value(input.clone()) {
        Ok(params) => params,
        Err(err) => return Ok(ToolReply::error(format!("Error parsing tool input: {err}"))),
    };

    if auto_execute {
        console::print_exec_command(&params.command);
    } else {
        console::print_command_for_confirm(&params.command);
        let answer = rt.prompter.ask("Run this command? [Y/n]: ")?;
        if !approves_tool_call(&answer) {
            return Ok(ToolReply::ok(CANCELLED_RESULT));
        }
        println!();
    }

    match rt.shell.run(&params.command, ShellMode::Silent) {
        Ok(output) => Ok(ToolReply::ok(output)),
        Err(err) => {
            let output = err
                .downcast_ref::<ShellExecutionError>()
                .map_or("", ShellExecutionError::output);
            Ok(ToolReply::error(format!("Error: {err}\nOutput: {output}")))
        }
    }
}

/// The `output` argument of a `complete` call; anything else reads as empty.
pub fn complete_output(input: &Value) -> String {
    input
        .get("output")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tools_declare_required_inputs() {
        let tools = agentic_tools(&TemplateValues::default()).expect("tools");
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec![SHELL_TOOL, COMPLETE_TOOL]);
        assert_eq!(tools[0].input_schema["required"], json!(["command"]));
        assert_eq!(tools[1].input_schema["required"], json!(["output"]));
    }

    #[test]
    fn complete_output_tolerates_bad_input() {
        assert_eq!(complete_output(&json!({"output": "done"})), "done");
        assert_eq!(complete_output(&json!({"output": 3})), "");
        assert_eq!(complete_output(&json!({})), "");
    }

    #[test]
    fn reply_becomes_tool_result_block() {
        let block = ToolReply::error("boom").into_block("tu_1");
        assert_eq!(
            block,
            ContentBlock::ToolResult {
                tool_use_id: "tu_1".to_string(),
                content: "boom".to_string(),
                is_error: true,
            }
        );
    }
}
