//! FlowLab E2E Test Framework
//!
//! This crate drives end-to-end conversion testing against the FlowBots
//! service:
//! - Converts source packages through the conversion API and records results
//! - Runs the tier x direction matrix through an agent or the API
//! - Checkpoints every test and raises SMS alerts on failure streaks
//! - Probes API endpoints and explores the web app with Playwright
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    E2E Test Runner (Rust)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner                                                 │
//! │    ├── run_all() -> [TierSummary]                           │
//! │    ├── run_tier(tier) -> TierSummary                        │
//! │    └── executor: dyn TestExecutor                           │
//! │          ├── AgentExecutor  (claude -p, per-tier model)     │
//! │          └── ApiExecutor    (ConversionSession)             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ConversionSession                                          │
//! │    └── health -> convert -> poll -> download -> record      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Scenario (YAML) -> Explorer -> node + Playwright           │
//! │    steps: navigate | fill | click | wait | sleep            │
//! │           screenshot | discover | log                       │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod conversion;
pub mod error;
pub mod executor;
pub mod explorer;
pub mod probe;
pub mod runner;
pub mod scenario;

pub use conversion::{ConversionRecord, ConversionSession, ConversionStatus, SessionSummary};
pub use error::{E2eError, E2eResult};
pub use executor::{AgentExecutor, ApiExecutor, ExecutionReport, TestExecutor, TestRequest};
pub use explorer::{ExplorationReport, Explorer};
pub use probe::{run_probe, ProbeReport};
pub use runner::{RunOptions, TestRunner, TierSummary};
pub use scenario::{Scenario, ScenarioStep};
