//! MCP server and command handlers behind the `cursor-subagent` binary.

pub mod commands;
pub mod mcp;
