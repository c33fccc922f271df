pub const INITIAL_PROMPT_TEMPLATE: &str = r#"You turn plain-language process descriptions into flowchart graphs encoded as JSON.
Reply with exactly one JSON object. No prose, no markdown fences, no comments.

The object must have this shape:
{
  "nodes": [
    {"id": "string", "label": "string", "group": "string", "shape": "string"}
  ],
  "edges": [
    {"source": "string", "target": "string", "label": "string"}
  ],
  "layout": {"direction": "string"}
}

Rules:
1. nodes[].id is a short identifier that no other node uses, such as "A", "B" or "C1".
2. nodes[].label is concise, ideally six words or fewer.
3. nodes[].shape is one of "box", "ellipse", "diamond", "circle". Decisions and questions use "diamond".
4. edges[].source and edges[].target hold node ids.
5. layout.direction is "TB" (top to bottom) or "LR" (left to right), whichever suits the flow.
6. Keep to at most 40 nodes unless the description clearly needs more.
7. Emit no keys other than the ones shown above.

Process description:
---
{user_text}
---

Produce the graph JSON now."#;

pub const REPAIR_PROMPT_TEMPLATE: &str = r#"The JSON you produced for the request below was rejected and must be fixed.
Reply with exactly one JSON object. No prose, no markdown fences, no comments.

Original request:
---
{user_text}
---

Your rejected output:
---
{invalid_json}
---

Why it was rejected:
---
{error_message}
---

Address every problem listed above and produce a corrected graph JSON for the original request."#;

pub const NOT_JSON_MESSAGE: &str =
    "The response was not valid JSON. Please provide only a single, well-formed JSON object.";

pub fn initial_prompt(user_text: &str) -> String {
    render(INITIAL_PROMPT_TEMPLATE, &[("user_text", user_text)])
}

pub fn repair_prompt(user_text: &str, invalid_json: &str, error_message: &str) -> String {
    render(
        REPAIR_PROMPT_TEMPLATE,
        &[
            ("user_text", user_text),
            ("invalid_json", invalid_json),
            ("error_message", error_message),
        ],
    )
}

/// Single-pass placeholder substitution; substituted values are never rescanned.
fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        rendered.push_str(&rest[..start]);
        let tail = &rest[start..];
        let matched = values.iter().find_map(|(key, value)| {
            let placeholder = format!("{{{key}}}");
            tail.starts_with(&placeholder).then_some((placeholder.len(), *value))
        });
        match matched {
            Some((len, value)) => {
                rendered.push_str(value);
                rest = &tail[len..];
            }
            None => {
                rendered.push('{');
                rest = &tail[1..];
            }
        }
    }
    rendered.push_str(rest);
    rendered
}
