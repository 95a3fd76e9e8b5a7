//! `llm` steps: one request, text out.

use anyhow::{Context, Result};

use crate::command::LlmStep;
use crate::core::context::PipelineContext;
use crate::io::console;
use crate::io::llm::MessagesRequest;
use crate::steps::Runtime;

pub const DRY_RUN_OUTPUT: &str = "[dry run - no LLM response]";

pub fn run(rt: &Runtime<'_>, step: &LlmStep, ctx: &PipelineContext) -> Result<String> {
    let system = rt
        .render(&step.system, ctx)
        .context("interpolate system prompt")?;
    let prompt = rt
        .render(&step.prompt, ctx)
        .context("interpolate user prompt")?;

    rt.debug_block("System prompt:", &system);
    rt.debug_block("User prompt:", &prompt);

    if rt.options.dry_run {
        console::dry_run("Would call LLM with:");
        console::dry_run(format!("  System prompt length: {} bytes", system.len()));
        console::dry_run(format!("  User prompt length: {} bytes", prompt.len()));
        return Ok(DRY_RUN_OUTPUT.to_string());
    }

    let request = MessagesRequest::single_turn(
        &rt.options.model,
        rt.options.max_tokens,
        &system,
        &prompt,
    );
    let response = rt.send(&request).context("generate response")?;
    let text = response.text();

    if !step.silent {
        console::render_text(&text);
    }
    Ok(text)
}
