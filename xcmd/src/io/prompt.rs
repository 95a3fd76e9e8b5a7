//! Tool descriptions for agentic steps, rendered with minijinja.

use anyhow::Result;
use minijinja::{Environment, context};

use crate::core::template::TemplateValues;

const SHELL_TOOL_TEMPLATE: &str = include_str!("prompts/shell_tool.md");
const COMPLETE_TOOL_TEMPLATE: &str = include_str!("prompts/complete_tool.md");

/// Template engine wrapper around minijinja.
struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    fn new() -> Self {
        let mut env = Environment::new();
        env.add_template("shell_tool", SHELL_TOOL_TEMPLATE)
            .expect("shell_tool template should be valid");
        env.add_template("complete_tool", COMPLETE_TOOL_TEMPLATE)
            .expect("complete_tool template should be valid");
        Self { env }
    }

    fn render_shell_tool(&self, values: &TemplateValues) -> Result<String> {
        let template = self.env.get_template("shell_tool")?;
        let rendered = template.render(context! {
            env => values,
        })?;
        Ok(rendered.trim().to_string())
    }

    fn render_complete_tool(&self) -> Result<String> {
        let template = self.env.get_template("complete_tool")?;
        Ok(template.render(context! {})?.trim().to_string())
    }
}

/// Description of the `shell` tool, embedding the sampled environment.
pub fn shell_tool_description(values: &TemplateValues) -> Result<String> {
    PromptEngine::new().render_shell_tool(values)
}

/// Description of the `complete` tool.
pub fn complete_tool_description() -> Result<String> {
    PromptEngine::new().render_complete_tool()
}
