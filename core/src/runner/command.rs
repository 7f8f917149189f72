use std::path::Path;

use super::types::InvokeRequest;

/// Final prompt handed to cursor-agent via `-f`.
pub fn compose_prompt(system_prompt: &str, context: &str, task: &str) -> String {
    let mut prompt = String::with_capacity(system_prompt.len() + context.len() + task.len() + 32);
    prompt.push_str(system_prompt);
    if !context.is_empty() {
        prompt.push_str("\n\n## CONTEXT\n\n");
        prompt.push_str(context);
    }
    prompt.push_str("\n\n## TASK\n\n");
    prompt.push_str(task);
    prompt
}

pub fn build_args(req: &InvokeRequest) -> Vec<String> {
    let workspace: &Path = req.workspace.as_deref().unwrap_or(&req.cwd);
    vec![
        "--print".to_string(),
        "--output-format".to_string(),
        "stream-json".to_string(),
        "--model".to_string(),
        req.model.clone(),
        "--workspace".to_string(),
        workspace.to_string_lossy().into_owned(),
        "-f".to_string(),
        compose_prompt(&req.system_prompt, &req.context, &req.task),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn prompt_without_context() {
        assert_eq!(compose_prompt("SYS", "", "do it"), "SYS\n\n## TASK\n\ndo it");
    }

    #[test]
    fn prompt_with_context() {
        assert_eq!(
            compose_prompt("SYS", "files: a.rs", "do it"),
            "SYS\n\n## CONTEXT\n\nfiles: a.rs\n\n## TASK\n\ndo it"
        );
    }

    #[test]
    fn workspace_defaults_to_cwd() {
        let req = InvokeRequest::new("SYS", "task", "auto", "/work");
        let args = build_args(&req);
        assert_eq!(
            &args[..7],
            &[
                "--print",
                "--output-format",
                "stream-json",
                "--model",
                "auto",
                "--workspace",
                "/work",
            ]
        );
        assert_eq!(args[7], "-f");
        assert_eq!(args[8], "SYS\n\n## TASK\n\ntask");

        let req = req.with_workspace("/repo");
        assert_eq!(build_args(&req)[6], "/repo");
    }
}
