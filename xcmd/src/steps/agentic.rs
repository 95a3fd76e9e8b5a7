//! `agentic` steps: a bounded tool-use conversation.
//!
//! Each turn sends the whole conversation, renders text as it arrives, and
//! answers every tool call. The loop ends when the model calls `complete`,
//! when it stops without calling any tool, or when the turn limit is reached.
//! Only a failed model request is an error; the other two early exits return
//! the last text seen.

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::command::AgenticStep;
use crate::core::context::PipelineContext;
use crate::io::console;
use crate::io::llm::{ContentBlock, Message, MessagesRequest};
use crate::steps::Runtime;
use crate::steps::tools::{
    self, COMPLETE_TOOL, COMPLETED_RESULT, SHELL_TOOL, ToolReply, agentic_tools,
};

pub const DRY_RUN_OUTPUT: &str = "[dry run - no agentic execution]";

/// Why the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentStop {
    Completed,
    /// The model ended its turn without calling any tool.
    EndTurn,
    MaxIterations,
    DryRun,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentOutcome {
    pub output: String,
    pub stop: AgentStop,
    /// Model calls made.
    pub turns: u32,
}

pub fn run(rt: &Runtime<'_>, step: &AgenticStep, ctx: &PipelineContext) -> Result<AgentOutcome> {
    let system = rt
        .render(&step.system, ctx)
        .context("interpolate system prompt")?;
    let prompt = rt
        .render(&step.prompt, ctx)
        .context("interpolate user prompt")?;
    let max_iterations = if step.max_iterations == 0 {
        rt.options.default_max_iterations
    } else {
        step.max_iterations
    };

    rt.debug_block("System prompt:", &system);
    rt.debug_block("User prompt:", &prompt);
    rt.debug(&format!("Max iterations: {max_iterations}"));
    rt.debug(&format!("Auto execute: {}", step.auto_execute));

    if rt.options.dry_run {
        console::dry_run("Would start agentic loop with:");
        console::dry_run(format!("  System prompt length: {} bytes", system.len()));
        console::dry_run(format!("  User prompt length: {} bytes", prompt.len()));
        console::dry_run(format!("  Max iterations: {max_iterations}"));
        console::dry_run(format!("  Auto execute: {}", step.auto_execute));
        console::dry_run(format!("  Tools: {SHELL_TOOL}, {COMPLETE_TOOL}"));
        return Ok(AgentOutcome {
            output: DRY_RUN_OUTPUT.to_string(),
            stop: AgentStop::DryRun,
            turns: 0,
        });
    }

    let mut request = MessagesRequest {
        model: rt.options.model.clone(),
        max_tokens: rt.options.agentic_max_tokens,
        system: (!system.is_empty()).then_some(system),
        messages: vec![Message::user_text(&prompt)],
        tools: agentic_tools(&rt.values.sample())?,
    };
    let mut last_text = String::new();

    for turn in 1..=max_iterations {
        rt.debug(&format!("Agentic iteration {turn}/{max_iterations}"));
        let response = rt
            .send(&request)
            .with_context(|| format!("agentic turn {turn}"))?;

        let mut assistant_blocks = Vec::new();
        let mut tool_results = Vec::new();
        let mut completed: Option<String> = None;

        for block in &response.content {
            match block {
                ContentBlock::Text { text } => {
                    console::render_text(text);
                    last_text = text.clone();
                    assistant_blocks.push(block.clone());
                }
                ContentBlock::ToolUse { id, name, input } => {
                    rt.debug(&format!("Tool call: {name} (id={id})"));
                    rt.debug(&format!("Tool input: {input}"));
                    assistant_blocks.push(block.clone());
                    let reply = match name.as_str() {
                        SHELL_TOOL => tools::run_shell_tool(rt, input, step.auto_execute)?,
                        COMPLETE_TOOL => {
                            completed = Some(tools::complete_output(input));
                            ToolReply::ok(COMPLETED_RESULT)
                        }
                        other => ToolReply::error(format!("Unknown tool: {other}")),
                    };
                    tool_results.push(reply.into_block(id));
                }
                ContentBlock::ToolResult { .. } | ContentBlock::Unknown => {}
            }
        }

        if let Some(output) = completed {
            info!(turns = turn, "agent completed");
            return Ok(AgentOutcome {
                output,
                stop: AgentStop::Completed,
                turns: turn,
            });
        }

        if !tool_results.is_empty() {
            request.messages.push(Message::assistant(assistant_blocks));
            request.messages.push(Message::tool_results(tool_results));
            continue;
        }

        if response.is_end_turn() {
            console::warn("Agent finished without calling complete tool");
            return Ok(AgentOutcome {
                output: last_text,
                stop: AgentStop::EndTurn,
                turns: turn,
            });
        }
        debug!(stop_reason = ?response.stop_reason, "turn ended without tools; retrying");
    }

    console::warn(format!(
        "Agent reached max iterations ({max_iterations}) without completing"
    ));
    Ok(AgentOutcome {
        output: last_text,
        stop: AgentStop::MaxIterations,
        turns: max_iterations,
    })
}
