//! Turning a descriptor's command into a program and argument list.

use crate::descriptor::{CommandSpec, ProcessDescriptor};
use crate::error::{SupervisorError, SupervisorResult};
use launch_config_and_utils::ProcessEnvironment;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Colon-separated list of install prefixes searched for package executables.
pub const AMENT_PREFIX_PATH: &str = "AMENT_PREFIX_PATH";

/// Program and arguments handed to the OS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

/// Locate `<prefix>/lib/<package>/<executable>` in the prefixes of `environment`.
///
/// Returns the searched candidates on failure.
pub fn find_package_executable(
    environment: &ProcessEnvironment,
    package: &str,
    executable: &str,
) -> Result<PathBuf, Vec<PathBuf>> {
    let candidates: Vec<PathBuf> = environment
        .get_os(AMENT_PREFIX_PATH)
        .map(|prefixes| std::env::split_paths(prefixes).collect::<Vec<_>>())
        .unwrap_or_default()
        .into_iter()
        .filter(|prefix| !prefix.as_os_str().is_empty())
        .map(|prefix| prefix.join("lib").join(package).join(executable))
        .collect();

    match candidates.iter().find(|c| is_executable_file(c)) {
        Some(found) => Ok(found.clone()),
        None => Err(candidates),
    }
}

fn is_executable_file(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

/// Join arguments into one `sh -c` command line, quoting where needed.
pub fn shell_join(argv: &[String]) -> String {
    argv.iter()
        .map(|arg| shell_quote(arg))
        .collect::<Vec<_>>()
        .join(" ")
}

fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_@%+=:,./-".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

pub(crate) fn invocation(descriptor: &ProcessDescriptor) -> SupervisorResult<Invocation> {
    let argv = match &descriptor.command {
        CommandSpec::Literal(argv) => {
            if argv.is_empty() {
                return Err(SupervisorError::Configuration(format!(
                    "process '{}' has an empty command",
                    descriptor.name
                )));
            }
            argv.clone()
        }
        CommandSpec::PackageExecutable {
            package,
            executable,
            arguments,
        } => {
            let path = find_package_executable(&descriptor.environment, package, executable)
                .map_err(|searched| SupervisorError::ExecutableNotFound {
                    name: descriptor.name.clone(),
                    package: package.clone(),
                    executable: executable.clone(),
                    searched: if searched.is_empty() {
                        format!("{} is empty", AMENT_PREFIX_PATH)
                    } else {
                        searched
                            .iter()
                            .map(|p| p.display().to_string())
                            .collect::<Vec<_>>()
                            .join(", ")
                    },
                })?;
            let mut argv = vec![path.display().to_string()];
            argv.extend(arguments.iter().cloned());
            argv
        }
    };

    if descriptor.shell {
        return Ok(Invocation {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), shell_join(&argv)],
        });
    }

    let mut argv = argv.into_iter();
    let program = argv.next().unwrap_or_default();
    Ok(Invocation {
        program,
        args: argv.collect(),
    })
}
