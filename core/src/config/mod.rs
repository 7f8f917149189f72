mod agents;
mod load;
mod types;

pub use agents::{
    find_agents_file, AgentConfig, AgentDocument, AgentRegistry, AgentsFile, AGENTS_FILE_NAME,
};
pub use load::{get_data_dir, load_default, load_from_path};
pub use types::{AppConfig, InstallConfig, LoggingConfig, RunnerConfig};
