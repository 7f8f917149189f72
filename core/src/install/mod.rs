mod installer;
mod shell;

pub use installer::{
    ensure_path_export, filter_installer_output, Installer, PathPatch, PATH_EXPORT_LINE,
};
pub use shell::{
    detect_shell, detect_shell_in, shell_config_file, shell_config_file_for, Shell,
};
