#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Quantum tasker: generates tasks against perceived threats, scores every task/asset
//! pairing, allocates assets and manages the resulting assignments across cycles.

/// Allocation algorithms.
#[path = "../allocator/main.rs"]
pub mod allocator;

/// Tasker configuration.
#[path = "../config.rs"]
pub mod config;

/// Setup error taxonomy.
#[path = "../error.rs"]
pub mod error;

/// Task/asset scoring strategies.
#[path = "../evaluator/main.rs"]
pub mod evaluator;

/// Task generation strategies.
#[path = "../generator/main.rs"]
pub mod generator;

/// Value and profit matrix.
#[path = "../matrix/main.rs"]
pub mod matrix;

/// Assets, tasks, resources and tracks.
#[path = "../model/main.rs"]
pub mod model;

/// Per-cycle orchestrator and assignment handling.
#[path = "../orchestrator/main.rs"]
pub mod orchestrator;

/// Strategy registry.
#[path = "../registry.rs"]
pub mod registry;

/// Script function bridge.
#[path = "../script.rs"]
pub mod script;

/// In-memory scenario world.
#[path = "../sim.rs"]
pub mod sim;

/// Telemetry helpers.
#[path = "../telemetry.rs"]
pub mod telemetry;

/// Runtime entrypoints.
#[path = "../main.rs"]
pub mod orchestration_entry;

pub use allocator::{Allocation, AllocationBook, Allocator};
pub use config::{AllocatorConfig, AllocatorPass, TaskerConfig};
pub use error::TaskerError;
pub use evaluator::Evaluator;
pub use generator::Generator;
pub use matrix::{Matrix, MatrixSnapshot};
pub use model::{
    Asset, AssetKey, AssetRepresentation, AssetSystem, Iff, PlatformIndex, ResourceDetail,
    ResourceKind, SimTime, Task, TaskId, TaskResource, TaskStatus, TrackSnapshot, Vec3,
};
pub use orchestration_entry::{RunSummary, RuntimeOptions, TaskerRuntime};
pub use orchestrator::{
    collaborators::{
        AssignmentMessage, Collaborators, Messenger, PerceptionProvider, Scheduler, StatusMessage,
        TimerEvent, TrackProvider,
    },
    maker::QuantumTaskerBuilder,
    reallocation::{ReallocationPolicy, ReallocationStrategy},
    Commitment, CycleReport, QuantumTasker,
};
pub use registry::{StrategyRegistry, StrategySelection};
pub use script::{ScriptFunction, ScriptScope, ScriptSignature};
pub use sim::{AssigneeBehavior, Outbound, ScenarioDocument, ScenarioWorld};
pub use telemetry::{TaskerTelemetry, TaskerTelemetryBuilder};
