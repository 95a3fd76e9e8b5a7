//! Dynamic placeholder resolution against pipeline state.
//!
//! Recognized forms, resolved in this order:
//!
//! 1. `{{args.<name>}}`
//! 2. `{{steps.<id>.<field>}}` (`output` is the raw text, anything else is a JSON field)
//! 3. `{{output.<field>}}`
//! 4. `{{output}}`
//!
//! All placeholders are located in the input text up front and spliced in a
//! single pass, so substituted values are never rescanned. Resolution still
//! runs pass by pass, which fixes which failure is reported when several
//! placeholders are broken.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::Value;

use crate::core::context::{PipelineContext, is_dry_run_output};
use crate::core::errors::InterpolationError;

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"\{\{(?:",
        r"args\.(?P<arg>[A-Za-z_][A-Za-z0-9_]*)",
        r"|steps\.(?P<step>[A-Za-z_][A-Za-z0-9_-]*)\.(?P<field>[A-Za-z_][A-Za-z0-9_]*)",
        r"|output\.(?P<ofield>[A-Za-z_][A-Za-z0-9_]*)",
        r"|(?P<last>output)",
        r")\}\}",
    ))
    .unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Pass {
    Args,
    Steps,
    OutputField,
    Output,
}

struct Placeholder<'t> {
    start: usize,
    end: usize,
    pass: Pass,
    caps: Captures<'t>,
}

impl Placeholder<'_> {
    fn text(&self) -> &str {
        self.caps.get(0).map_or("", |m| m.as_str())
    }

    fn group(&self, name: &str) -> &str {
        self.caps.name(name).map_or("", |m| m.as_str())
    }

    /// `<dry run: steps.plan.command>` for `{{steps.plan.command}}`.
    fn dry_run_marker(&self) -> String {
        let inner = self
            .text()
            .trim_start_matches("{{")
            .trim_end_matches("}}");
        format!("<dry run: {inner}>")
    }

    fn field_of(
        &self,
        output: &str,
        field: &str,
        ctx: &PipelineContext,
    ) -> Result<Option<String>, InterpolationError> {
        if ctx.dry_run && is_dry_run_output(output) {
            return Ok(Some(self.dry_run_marker()));
        }
        extract_json_field(output, field)
            .map(Some)
            .map_err(|reason| InterpolationError {
                placeholder: self.text().to_string(),
                reason,
            })
    }
}

/// Replace every dynamic placeholder in `text` using `ctx`.
///
/// Unknown arguments and unknown step ids are left verbatim. A known step (or
/// the last output) whose body is not a JSON object containing the requested
/// field fails the whole string, except during a dry run, where a field of a
/// stand-in output renders as `<dry run: ...>`.
pub fn interpolate(text: &str, ctx: &PipelineContext) -> Result<String, InterpolationError> {
    let found: Vec<Placeholder<'_>> = PLACEHOLDER_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let pass = if caps.name("arg").is_some() {
                Pass::Args
            } else if caps.name("step").is_some() {
                Pass::Steps
            } else if caps.name("ofield").is_some() {
                Pass::OutputField
            } else {
                Pass::Output
            };
            Some(Placeholder {
                start: whole.start(),
                end: whole.end(),
                pass,
                caps,
            })
        })
        .collect();

    if found.is_empty() {
        return Ok(text.to_string());
    }

    // Resolve in pass order; `sort_by_key` is stable so positions stay ordered within a pass.
    let mut order: Vec<usize> = (0..found.len()).collect();
    order.sort_by_key(|&i| found[i].pass);

    let mut replacements: Vec<Option<String>> = vec![None; found.len()];
    for i in order {
        replacements[i] = resolve(&found[i], ctx)?;
    }

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0usize;
    for (placeholder, replacement) in found.iter().zip(replacements) {
        let Some(value) = replacement else {
            continue;
        };
        out.push_str(&text[cursor..placeholder.start]);
        out.push_str(&value);
        cursor = placeholder.end;
    }
    out.push_str(&text[cursor..]);
    Ok(out)
}

/// `Ok(None)` leaves the placeholder untouched.
fn resolve(
    placeholder: &Placeholder<'_>,
    ctx: &PipelineContext,
) -> Result<Option<String>, InterpolationError> {
    match placeholder.pass {
        Pass::Args => Ok(ctx.args.get(placeholder.group("arg")).cloned()),
        Pass::Steps => {
            let Some(output) = ctx.step_outputs.get(placeholder.group("step")) else {
                return Ok(None);
            };
            let field = placeholder.group("field");
            if field == "output" {
                return Ok(Some(output.clone()));
            }
            placeholder.field_of(output, field, ctx)
        }
        Pass::OutputField => {
            placeholder.field_of(&ctx.last_output, placeholder.group("ofield"), ctx)
        }
        Pass::Output => Ok(Some(ctx.last_output.clone())),
    }
}

/// Parse `raw` as a JSON object (after stripping a surrounding code fence) and
/// return `field` rendered as plain text.
///
/// Strings are returned unquoted, `null` becomes the empty string, objects and
/// arrays are re-serialized as compact JSON.
pub fn extract_json_field(raw: &str, field: &str) -> Result<String, String> {
    let body = strip_code_fence(raw);
    let value: Value =
        serde_json::from_str(body).map_err(|e| format!("output is not valid JSON: {e}"))?;
    let Value::Object(map) = value else {
        return Err("output is not a JSON object".to_string());
    };
    let Some(found) = map.get(field) else {
        return Err(format!("field {field:?} not found in JSON"));
    };
    Ok(json_to_text(found))
}

fn json_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_f64() {
            // `3.0` prints as `3`, like the integer it stands for.
            Some(f) if !n.is_i64() && !n.is_u64() && is_integral(f) => format!("{}", f as i64),
            _ => n.to_string(),
        },
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

fn is_integral(f: f64) -> bool {
    f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64
}

/// Remove a Markdown code fence opened at the start of the text.
///
/// The body runs from the end of the opening fence line to the last closing
/// fence, so prose after the fence is dropped. Text that does not start with a
/// fence, or whose fence is never closed, is only trimmed.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }
    let Some(body_start) = trimmed.find('\n') else {
        return trimmed;
    };
    match trimmed.rfind("```") {
        Some(body_end) if body_end > body_start => trimmed[body_start + 1..body_end].trim(),
        _ => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn ctx_with_step(id: &str, output: &str) -> PipelineContext {
        let mut ctx = PipelineContext::default();
        ctx.record(Some(id), output.to_string());
        ctx
    }

    #[test]
    fn args_resolve_and_unknown_args_stay_verbatim() {
        let mut args = BTreeMap::new();
        args.insert("name".to_string(), "World".to_string());
        let ctx = PipelineContext::new(args);

        let out = interpolate("Hello {{args.name}} and {{args.other}}", &ctx).expect("ok");
        assert_eq!(out, "Hello World and {{args.other}}");
    }

    #[test]
    fn step_output_is_inserted_byte_for_byte() {
        let raw = "line one\n{{args.name}} {{output}} {{steps.a.output}}\n";
        let ctx = ctx_with_step("a", raw);

        let out = interpolate("[{{steps.a.output}}]", &ctx).expect("ok");
        assert_eq!(out, format!("[{raw}]"));
    }

    #[test]
    fn step_json_fields_render_as_text() {
        let ctx = ctx_with_step("a", r#"{"field": "value", "n": 3, "ok": true, "none": null}"#);

        assert_eq!(interpolate("{{steps.a.field}}", &ctx).expect("ok"), "value");
        assert_eq!(interpolate("{{steps.a.n}}", &ctx).expect("ok"), "3");
        assert_eq!(interpolate("{{steps.a.ok}}", &ctx).expect("ok"), "true");
        assert_eq!(interpolate("<{{steps.a.none}}>", &ctx).expect("ok"), "<>");
    }

    #[test]
    fn composite_json_fields_are_reserialized() {
        let ctx = ctx_with_step("a", r#"{"list": [1, 2], "obj": {"k": "v"}}"#);
        assert_eq!(interpolate("{{steps.a.list}}", &ctx).expect("ok"), "[1,2]");
        assert_eq!(interpolate("{{steps.a.obj}}", &ctx).expect("ok"), r#"{"k":"v"}"#);
    }

    #[test]
    fn step_field_on_non_json_output_fails() {
        let ctx = ctx_with_step("a", "plain text");
        let err = interpolate("x {{steps.a.field}} y", &ctx).expect_err("not json");
        assert_eq!(err.placeholder, "{{steps.a.field}}");
        assert!(err.reason.starts_with("output is not valid JSON"));
    }

    #[test]
    fn missing_field_fails_with_field_name() {
        let ctx = ctx_with_step("a", r#"{"other": 1}"#);
        let err = interpolate("{{steps.a.field}}", &ctx).expect_err("missing field");
        assert_eq!(err.reason, "field \"field\" not found in JSON");
    }

    #[test]
    fn non_object_json_fails() {
        let ctx = ctx_with_step("a", "[1, 2, 3]");
        let err = interpolate("{{steps.a.field}}", &ctx).expect_err("array");
        assert_eq!(err.reason, "output is not a JSON object");
    }

    #[test]
    fn unknown_step_stays_verbatim() {
        let ctx = PipelineContext::default();
        let out = interpolate("{{steps.nope.field}} {{steps.nope.output}}", &ctx).expect("ok");
        assert_eq!(out, "{{steps.nope.field}} {{steps.nope.output}}");
    }

    #[test]
    fn output_field_before_any_step_fails() {
        let ctx = PipelineContext::default();
        let err = interpolate("{{output.path}}", &ctx).expect_err("empty output");
        assert_eq!(err.placeholder, "{{output.path}}");
    }

    #[test]
    fn output_field_and_raw_output_coexist() {
        let mut ctx = PipelineContext::default();
        ctx.record(None, "```json\n{\"path\": \"/tmp/a\"}\n```".to_string());

        let out = interpolate("{{output.path}} from {{output}}", &ctx).expect("ok");
        assert_eq!(out, "/tmp/a from ```json\n{\"path\": \"/tmp/a\"}\n```");
    }

    #[test]
    fn earlier_pass_error_wins() {
        let mut ctx = ctx_with_step("a", "not json");
        ctx.last_output = "also not json".to_string();

        let err = interpolate("{{output.x}} {{steps.a.y}}", &ctx).expect_err("fails");
        assert_eq!(err.placeholder, "{{steps.a.y}}");
    }

    #[test]
    fn strip_code_fence_handles_plain_and_fenced() {
        assert_eq!(strip_code_fence("  {\"a\":1}  "), "{\"a\":1}");
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{\"a\":1}\n```"), "{\"a\":1}");
    }

    /// Verifies prose after the closing fence is dropped and an unclosed fence is kept.
    #[test]
    fn strip_code_fence_cuts_at_last_fence() {
        let raw = "```json\n{\"a\": 1}\n```\nThis runs the listing.";
        assert_eq!(strip_code_fence(raw), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```json\n{\"a\": 1}"), "```json\n{\"a\": 1}");

        let ctx = ctx_with_step("a", raw);
        assert_eq!(interpolate("{{steps.a.a}}", &ctx).expect("ok"), "1");
    }

    /// Verifies integral floats render without a fractional part.
    #[test]
    fn integral_floats_render_as_integers() {
        let ctx = ctx_with_step("a", r#"{"whole": 3.0, "half": 2.5, "big": 1e300, "neg": -4.0}"#);
        assert_eq!(interpolate("{{steps.a.whole}}", &ctx).expect("ok"), "3");
        assert_eq!(interpolate("{{steps.a.half}}", &ctx).expect("ok"), "2.5");
        assert_eq!(interpolate("{{steps.a.neg}}", &ctx).expect("ok"), "-4");
        assert_eq!(interpolate("{{steps.a.big}}", &ctx).expect("ok"), "1e300");
    }

    /// Verifies dry runs render field references into stand-in outputs as markers.
    #[test]
    fn dry_run_field_references_render_markers() {
        let mut ctx = PipelineContext::default().with_dry_run(true);
        ctx.record(Some("plan"), "[dry run - no LLM response]".to_string());

        let out = interpolate("run {{steps.plan.command}} after {{output.path}}", &ctx)
            .expect("dry run");
        assert_eq!(
            out,
            "run <dry run: steps.plan.command> after <dry run: output.path>"
        );

        ctx.dry_run = false;
        assert!(interpolate("{{steps.plan.command}}", &ctx).is_err());
    }

    /// Verifies dry runs still report broken references into real outputs.
    #[test]
    fn dry_run_still_checks_real_outputs() {
        let ctx = ctx_with_step("a", "plain text").with_dry_run(true);
        assert!(interpolate("{{steps.a.field}}", &ctx).is_err());
    }
}
