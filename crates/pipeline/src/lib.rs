//! The "NL prompt → deployed URL" pipeline: resolve tenant, generate code,
//! extract it, deploy it, report the URL. Every stage has an explicit
//! failure path that ends in a short user-facing message; nothing here
//! returns an error to the webhook handler.

pub mod extract;
mod run;

pub use run::{
    GenerateAndDeployPipeline, MSG_AUTH_REQUIRED, MSG_DEPLOYER_DOWN, MSG_GENERATOR_DOWN,
    MSG_NO_CODE, PipelineRun, Stage,
};
