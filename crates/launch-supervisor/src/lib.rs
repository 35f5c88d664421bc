//! Launch supervisor: runs the processes of a launch test and records how they end.
//!
//! A [`LaunchSession`] starts every [`ProcessDescriptor`] as a child in its
//! own process group, watches each child on a dedicated task, and publishes
//! state changes through `watch` channels so waiting never polls.
//!
//! ```text
//!  descriptors ──► LaunchSession::launch ──► watcher task per child
//!                        │                         │ Child::wait
//!                        │                         ▼
//!                        │                 watch<ProcessState>
//!                        ▼                         │
//!        wait_for_exit(target, timeout) ◄──────────┘
//!                        │
//!                        ▼
//!        shutdown: SIGINT ─► SIGTERM ─► SIGKILL ─► Vec<ProcessInfo>
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let mut session = LaunchSession::launch(&descriptors, ShutdownPolicy::default()).await?;
//! let event = session.wait_for_exit("dut_process", Duration::from_secs(600)).await?;
//! let infos = session.shutdown(ShutdownMode::Graceful).await;
//! ```

mod descriptor;
mod error;
mod output;
mod process;
mod resolve;
mod session;
mod state;

pub use descriptor::{CommandSpec, ExpectedExit, OutputCapture, ProcessDescriptor};
pub use error::{SupervisorError, SupervisorResult};
pub use resolve::{find_package_executable, shell_join, AMENT_PREFIX_PATH};
pub use session::{ExitEvent, LaunchSession, ShutdownMode, ShutdownPolicy, KEEP_ALIVE_NAME};
pub use state::{signal_name, ProcessInfo, ProcessState};
