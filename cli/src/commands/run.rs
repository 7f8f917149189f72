use std::sync::Arc;

use serde::Serialize;
use subagent_core::api::{AppContext, CliError};

use crate::commands::cli::InvokeArgs;
use crate::mcp::tools::{InvokeParams, Tools};

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(value).map_err(|e| CliError::Command(e.to_string()))?;
    println!("{text}");
    Ok(())
}

pub async fn serve(ctx: AppContext) -> Result<i32, CliError> {
    crate::mcp::serve_stdio(Arc::new(Tools::new(ctx))).await?;
    Ok(0)
}

pub async fn invoke(ctx: AppContext, args: InvokeArgs) -> Result<i32, CliError> {
    let tools = Tools::new(ctx);
    let cwd = if args.cwd.is_absolute() {
        args.cwd
    } else {
        std::env::current_dir()?.join(&args.cwd)
    };
    let resp = tools
        .invoke_subagent(InvokeParams {
            agent_role: args.role,
            task: args.task,
            cwd,
            context: args.context,
            model: args.model,
            timeout: args.timeout,
        })
        .await;
    print_json(&resp)?;
    Ok(if resp.success { 0 } else { 1 })
}

pub fn status(ctx: AppContext) -> Result<i32, CliError> {
    let status = Tools::new(ctx).check_status();
    print_json(&status)?;
    Ok(0)
}

pub async fn setup(ctx: AppContext) -> Result<i32, CliError> {
    let result = Tools::new(ctx).setup_cursor_cli().await;
    print_json(&result)?;
    Ok(if result["success"].as_bool().unwrap_or(false) {
        0
    } else {
        1
    })
}
